//! Search index port and adapters
//!
//! - `TypesenseClient`: HTTP adapter for the Typesense collections API
//! - `InMemorySearchIndex`: test substitute with an upsert log

mod memory;
mod typesense;

pub use memory::{InMemorySearchIndex, UpsertRecord};
pub use typesense::TypesenseClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Search Index Port
///
/// Implementations must be idempotent per document id: upserting the same
/// document twice leaves one document in the collection.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or replace `document` in `collection`, keyed by its `id`
    async fn upsert(
        &self,
        collection: &str,
        document: &serde_json::Value,
    ) -> Result<UpsertResult, IndexError>;

    /// Create the collection if it does not exist yet
    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), IndexError>;
}

/// Acknowledged upsert
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertResult {
    pub collection: String,
    pub id: String,
    /// Document as stored by the service
    pub document: serde_json::Value,
}

/// Typesense collection schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub facet: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            facet: false,
            optional: false,
        }
    }

    /// Wildcard field that lets the service infer types
    pub fn auto() -> Self {
        Self::new(".*", "auto")
    }

    pub fn facet(mut self) -> Self {
        self.facet = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Identifier a document is keyed by; checked before any network call
pub(crate) fn require_document_id(
    collection: &str,
    document: &serde_json::Value,
) -> Result<String, IndexError> {
    legisync_storage::document_id(document).ok_or_else(|| IndexError::MissingIdentifier {
        collection: collection.to_string(),
    })
}
