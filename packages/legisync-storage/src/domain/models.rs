//! Domain vocabulary shared by the data layer, the queue and the sync path
//!
//! - `Model` / `DataAction`: everything the data-access layer can be asked to do
//! - `WatchedKind` / `MutationAction`: the closed allow-lists that trigger
//!   propagation to the search index
//! - `WriteOperation`: one intercepted data-access call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StorageError;

// ═══════════════════════════════════════════════════════════════════════════
// Models & Actions
// ═══════════════════════════════════════════════════════════════════════════

/// Every record type known to the data-access layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Model {
    Legislator,
    Note,
    Interaction,
    Staffer,
    LegislativeSession,
    Organization,
    Tag,
    PageVisit,
}

/// How new primary identifiers are minted for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// Random UUID v4 string
    Uuid,
    /// Per-model integer sequence starting at 1
    Sequence,
}

impl Model {
    pub const ALL: [Model; 8] = [
        Model::Legislator,
        Model::Note,
        Model::Interaction,
        Model::Staffer,
        Model::LegislativeSession,
        Model::Organization,
        Model::Tag,
        Model::PageVisit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Legislator => "Legislator",
            Model::Note => "Note",
            Model::Interaction => "Interaction",
            Model::Staffer => "Staffer",
            Model::LegislativeSession => "LegislativeSession",
            Model::Organization => "Organization",
            Model::Tag => "Tag",
            Model::PageVisit => "PageVisit",
        }
    }

    pub fn id_strategy(&self) -> IdStrategy {
        match self {
            Model::Note => IdStrategy::Sequence,
            _ => IdStrategy::Uuid,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Model {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| StorageError::unknown_name("model", s))
    }
}

/// Data-access actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataAction {
    FindUnique,
    FindMany,
    Create,
    CreateMany,
    Update,
    UpdateMany,
    Upsert,
    Delete,
    DeleteMany,
}

impl DataAction {
    pub const ALL: [DataAction; 9] = [
        DataAction::FindUnique,
        DataAction::FindMany,
        DataAction::Create,
        DataAction::CreateMany,
        DataAction::Update,
        DataAction::UpdateMany,
        DataAction::Upsert,
        DataAction::Delete,
        DataAction::DeleteMany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataAction::FindUnique => "findUnique",
            DataAction::FindMany => "findMany",
            DataAction::Create => "create",
            DataAction::CreateMany => "createMany",
            DataAction::Update => "update",
            DataAction::UpdateMany => "updateMany",
            DataAction::Upsert => "upsert",
            DataAction::Delete => "delete",
            DataAction::DeleteMany => "deleteMany",
        }
    }

    /// Reads never change the primary store
    pub fn is_read(&self) -> bool {
        matches!(self, DataAction::FindUnique | DataAction::FindMany)
    }
}

impl fmt::Display for DataAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataAction {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| StorageError::unknown_name("action", s))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Watched allow-lists
// ═══════════════════════════════════════════════════════════════════════════

/// Entity kinds whose writes are propagated to the search index.
///
/// The search collection for a kind carries the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WatchedKind {
    Legislator,
    Note,
}

impl WatchedKind {
    pub const ALL: [WatchedKind; 2] = [WatchedKind::Legislator, WatchedKind::Note];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchedKind::Legislator => "Legislator",
            WatchedKind::Note => "Note",
        }
    }

    /// Search collection name (identical to the kind name)
    pub fn collection(&self) -> &'static str {
        self.as_str()
    }

    pub fn model(&self) -> Model {
        match self {
            WatchedKind::Legislator => Model::Legislator,
            WatchedKind::Note => Model::Note,
        }
    }

    pub fn from_model(model: Model) -> Option<Self> {
        match model {
            Model::Legislator => Some(WatchedKind::Legislator),
            Model::Note => Some(WatchedKind::Note),
            Model::Interaction
            | Model::Staffer
            | Model::LegislativeSession
            | Model::Organization
            | Model::Tag
            | Model::PageVisit => None,
        }
    }
}

impl fmt::Display for WatchedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WatchedKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WatchedKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StorageError::unknown_name("watched kind", s))
    }
}

/// Write actions that are captured in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationAction {
    Create,
    CreateMany,
    Update,
    UpdateMany,
    Delete,
    DeleteMany,
}

impl MutationAction {
    pub const ALL: [MutationAction; 6] = [
        MutationAction::Create,
        MutationAction::CreateMany,
        MutationAction::Update,
        MutationAction::UpdateMany,
        MutationAction::Delete,
        MutationAction::DeleteMany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationAction::Create => "create",
            MutationAction::CreateMany => "createMany",
            MutationAction::Update => "update",
            MutationAction::UpdateMany => "updateMany",
            MutationAction::Delete => "delete",
            MutationAction::DeleteMany => "deleteMany",
        }
    }

    /// `upsert` is a write but is not on the allow-list
    pub fn from_action(action: DataAction) -> Option<Self> {
        match action {
            DataAction::Create => Some(MutationAction::Create),
            DataAction::CreateMany => Some(MutationAction::CreateMany),
            DataAction::Update => Some(MutationAction::Update),
            DataAction::UpdateMany => Some(MutationAction::UpdateMany),
            DataAction::Delete => Some(MutationAction::Delete),
            DataAction::DeleteMany => Some(MutationAction::DeleteMany),
            DataAction::FindUnique | DataAction::FindMany | DataAction::Upsert => None,
        }
    }
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MutationAction {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MutationAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| StorageError::unknown_name("mutation action", s))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Write Operation
// ═══════════════════════════════════════════════════════════════════════════

/// One data-access call as seen by the interceptor
///
/// `args` follows the data layer's argument shape:
/// `{"data": ..}`, `{"where": {..}, "data": ..}`, `{"where": {..}, "create": .., "update": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOperation {
    pub model: Model,
    pub action: DataAction,
    #[serde(default)]
    pub args: serde_json::Value,
}

impl WriteOperation {
    pub fn new(model: Model, action: DataAction, args: serde_json::Value) -> Self {
        Self {
            model,
            action,
            args,
        }
    }

    pub fn create(model: Model, data: serde_json::Value) -> Self {
        Self::new(model, DataAction::Create, serde_json::json!({ "data": data }))
    }

    pub fn create_many(model: Model, data: Vec<serde_json::Value>) -> Self {
        Self::new(
            model,
            DataAction::CreateMany,
            serde_json::json!({ "data": data }),
        )
    }

    pub fn update(model: Model, id: serde_json::Value, data: serde_json::Value) -> Self {
        Self::new(
            model,
            DataAction::Update,
            serde_json::json!({ "where": { "id": id }, "data": data }),
        )
    }

    pub fn update_many(model: Model, filter: serde_json::Value, data: serde_json::Value) -> Self {
        Self::new(
            model,
            DataAction::UpdateMany,
            serde_json::json!({ "where": filter, "data": data }),
        )
    }

    pub fn upsert(
        model: Model,
        id: serde_json::Value,
        create: serde_json::Value,
        update: serde_json::Value,
    ) -> Self {
        Self::new(
            model,
            DataAction::Upsert,
            serde_json::json!({ "where": { "id": id }, "create": create, "update": update }),
        )
    }

    pub fn delete(model: Model, id: serde_json::Value) -> Self {
        Self::new(
            model,
            DataAction::Delete,
            serde_json::json!({ "where": { "id": id } }),
        )
    }

    pub fn delete_many(model: Model, filter: serde_json::Value) -> Self {
        Self::new(
            model,
            DataAction::DeleteMany,
            serde_json::json!({ "where": filter }),
        )
    }

    pub fn find_unique(model: Model, id: serde_json::Value) -> Self {
        Self::new(
            model,
            DataAction::FindUnique,
            serde_json::json!({ "where": { "id": id } }),
        )
    }

    pub fn find_many(model: Model) -> Self {
        Self::new(model, DataAction::FindMany, serde_json::json!({}))
    }

    /// The watched `(kind, action)` pair, if this operation must be propagated
    pub fn watched(&self) -> Option<(WatchedKind, MutationAction)> {
        let kind = WatchedKind::from_model(self.model)?;
        let action = MutationAction::from_action(self.action)?;
        Some((kind, action))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Queue Entry
// ═══════════════════════════════════════════════════════════════════════════

/// A captured mutation waiting in the durable queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Insertion-ordered identifier
    pub id: i64,
    pub action: MutationAction,
    pub entity_kind: WatchedKind,
    /// Post-mutation record snapshot (or whatever the write returned)
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Set once the replay worker has consumed this entry
    pub consumed_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Identifier of the captured record, if the payload carries one
    pub fn document_id(&self) -> Option<String> {
        document_id(&self.payload)
    }
}

/// A queue entry before it has been persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQueueEntry {
    pub action: MutationAction,
    pub entity_kind: WatchedKind,
    pub payload: serde_json::Value,
}

impl NewQueueEntry {
    pub fn new(action: MutationAction, entity_kind: WatchedKind, payload: serde_json::Value) -> Self {
        Self {
            action,
            entity_kind,
            payload,
        }
    }
}

/// Ordering used by every queue adapter: kind ascending, then insertion order
pub fn queue_order(a: &QueueEntry, b: &QueueEntry) -> std::cmp::Ordering {
    a.entity_kind
        .as_str()
        .cmp(b.entity_kind.as_str())
        .then(a.id.cmp(&b.id))
}

/// Extract a record identifier (`id`) as a string.
///
/// Integer identifiers are rendered in decimal; anything else has no identifier.
pub fn document_id(payload: &serde_json::Value) -> Option<String> {
    match payload.get("id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
