//! Per-kind projection from record payload to index document

use chrono::DateTime;
use legisync_storage::WatchedKind;
use serde_json::{Map, Value};

use crate::error::ProjectionError;
use crate::search::{CollectionSchema, FieldSchema};

/// Scope identifier stamped on every indexed Note unless configured otherwise
pub const DEFAULT_ORGANIZATION_ID: &str = "clgn330dm000008jvcg5x05k4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projector {
    organization_id: String,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(DEFAULT_ORGANIZATION_ID)
    }
}

impl Projector {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
        }
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    /// Build the index document for `payload`. The payload is not modified.
    pub fn project(&self, kind: WatchedKind, payload: &Value) -> Result<Value, ProjectionError> {
        let Value::Object(fields) = payload else {
            return Err(ProjectionError::NotAnObject { kind });
        };

        match kind {
            WatchedKind::Legislator => Ok(payload.clone()),
            WatchedKind::Note => self.project_note(fields.clone()).map(Value::Object),
        }
    }

    fn project_note(&self, mut fields: Map<String, Value>) -> Result<Map<String, Value>, ProjectionError> {
        if let Some(created_at) = fields.get("createdAt") {
            let secs = epoch_seconds(created_at).map_err(|message| ProjectionError::InvalidField {
                kind: WatchedKind::Note,
                field: "createdAt",
                message,
            })?;
            fields.insert("createdAt".to_string(), Value::String(secs.to_string()));
        }

        if let Some(id) = fields.get("id") {
            let id = match id {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(ProjectionError::InvalidField {
                        kind: WatchedKind::Note,
                        field: "id",
                        message: format!("expected string or integer, got {}", other),
                    })
                }
            };
            fields.insert("id".to_string(), Value::String(id));
        }

        fields.insert(
            "organizationId".to_string(),
            Value::String(self.organization_id.clone()),
        );
        Ok(fields)
    }
}

/// Floor of the Unix epoch seconds for an RFC 3339 string or epoch milliseconds
fn epoch_seconds(value: &Value) -> Result<i64, String> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp())
            .map_err(|e| format!("invalid timestamp '{}': {}", s, e)),
        Value::Number(n) => n
            .as_i64()
            .map(|millis| millis.div_euclid(1000))
            .ok_or_else(|| format!("expected integer epoch milliseconds, got {}", n)),
        other => Err(format!("expected timestamp, got {}", other)),
    }
}

/// Collection schema for a watched kind
pub fn collection_schema(kind: WatchedKind) -> CollectionSchema {
    let fields = match kind {
        WatchedKind::Legislator => vec![FieldSchema::auto()],
        WatchedKind::Note => vec![
            FieldSchema::new("organizationId", "string").facet(),
            FieldSchema::new("createdAt", "string").optional(),
            FieldSchema::auto(),
        ],
    };

    CollectionSchema {
        name: kind.collection().to_string(),
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_note_projection() {
        let projector = Projector::default();
        let payload = json!({
            "id": 42,
            "content": "Met with staff",
            "createdAt": "2023-04-10T12:00:00.789Z"
        });

        let doc = projector.project(WatchedKind::Note, &payload).unwrap();
        assert_eq!(
            doc,
            json!({
                "id": "42",
                "content": "Met with staff",
                "createdAt": "1681128000",
                "organizationId": DEFAULT_ORGANIZATION_ID
            })
        );
        // Input untouched
        assert_eq!(payload["id"], 42);
    }

    #[test]
    fn test_note_epoch_millis() {
        let doc = Projector::default()
            .project(WatchedKind::Note, &json!({"id": 1, "createdAt": 1681128000999i64}))
            .unwrap();
        assert_eq!(doc["createdAt"], "1681128000");
    }

    #[test]
    fn test_note_offset_timestamp() {
        let doc = Projector::default()
            .project(WatchedKind::Note, &json!({"id": 1, "createdAt": "2023-04-10T14:00:00+02:00"}))
            .unwrap();
        assert_eq!(doc["createdAt"], "1681128000");
    }

    #[test]
    fn test_note_custom_organization() {
        let doc = Projector::new("org-7")
            .project(WatchedKind::Note, &json!({"id": "3"}))
            .unwrap();
        assert_eq!(doc["organizationId"], "org-7");
        assert_eq!(doc["id"], "3");
    }

    #[test]
    fn test_note_without_id_keeps_shape() {
        let doc = Projector::default()
            .project(WatchedKind::Note, &json!({"count": 2}))
            .unwrap();
        assert_eq!(doc, json!({"count": 2, "organizationId": DEFAULT_ORGANIZATION_ID}));
    }

    #[test]
    fn test_legislator_identity() {
        let payload = json!({"id": "abc", "firstName": "Jane", "district": 7});
        let doc = Projector::default()
            .project(WatchedKind::Legislator, &payload)
            .unwrap();
        assert_eq!(doc, payload);
    }

    #[test]
    fn test_projection_errors() {
        let projector = Projector::default();

        assert_eq!(
            projector.project(WatchedKind::Legislator, &json!([1, 2])),
            Err(ProjectionError::NotAnObject {
                kind: WatchedKind::Legislator
            })
        );
        assert!(matches!(
            projector.project(WatchedKind::Note, &json!({"id": 1, "createdAt": "yesterday"})),
            Err(ProjectionError::InvalidField { field: "createdAt", .. })
        ));
        assert!(matches!(
            projector.project(WatchedKind::Note, &json!({"id": true})),
            Err(ProjectionError::InvalidField { field: "id", .. })
        ));
    }

    #[test]
    fn test_collection_schema() {
        let schema = collection_schema(WatchedKind::Note);
        assert_eq!(schema.name, "Note");
        assert!(schema
            .fields
            .iter()
            .any(|f| f.name == "organizationId" && f.facet && f.field_type == "string"));

        let schema = collection_schema(WatchedKind::Legislator);
        assert_eq!(schema.name, "Legislator");
        assert_eq!(schema.fields, vec![FieldSchema::auto()]);
    }

    proptest! {
        #[test]
        fn prop_note_projection_deterministic(
            id in 1u32..,
            millis in -62_000_000_000_000i64..253_000_000_000_000i64,
            content in ".*",
        ) {
            let projector = Projector::default();
            let payload = json!({"id": id, "createdAt": millis, "content": content});

            let first = projector.project(WatchedKind::Note, &payload).unwrap();
            let second = projector.project(WatchedKind::Note, &payload).unwrap();
            prop_assert_eq!(&first, &second);

            prop_assert_eq!(&first["id"], &json!(id.to_string()));
            prop_assert_eq!(&first["createdAt"], &json!(millis.div_euclid(1000).to_string()));
            prop_assert_eq!(&first["organizationId"], &json!(DEFAULT_ORGANIZATION_ID));
            prop_assert_eq!(&first["content"], &payload["content"]);
        }

        #[test]
        fn prop_rfc3339_floor(secs in 0i64..4_000_000_000i64, millis in 0u32..1000) {
            let dt = DateTime::from_timestamp(secs, millis * 1_000_000).unwrap();
            let payload = json!({"id": 1, "createdAt": dt.to_rfc3339()});

            let doc = Projector::default().project(WatchedKind::Note, &payload).unwrap();
            prop_assert_eq!(&doc["createdAt"], &json!(secs.to_string()));
        }
    }
}
