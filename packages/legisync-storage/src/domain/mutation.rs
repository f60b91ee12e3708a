//! Data-access semantics on top of the `RecordStore` primitives
//!
//! | action       | arguments                          | returns              |
//! |--------------|------------------------------------|----------------------|
//! | `create`     | `{data}`                           | created record       |
//! | `createMany` | `{data: [..]}`                     | `{"count": n}`       |
//! | `update`     | `{where: {id}, data}`              | updated record       |
//! | `updateMany` | `{where: {..}, data}`              | `{"count": n}`       |
//! | `upsert`     | `{where: {id}, create, update}`    | resulting record     |
//! | `delete`     | `{where: {id}}`                    | removed record       |
//! | `deleteMany` | `{where: {..}}`                    | `{"count": n}`       |
//! | `findUnique` | `{where: {id}}`                    | record or `null`     |
//! | `findMany`   | `{where?: {..}}`                   | array of records     |

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use super::models::{document_id, DataAction, Model, WriteOperation};
use super::ports::RecordStore;
use crate::{Result, StorageError};

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

pub(crate) async fn apply<S: RecordStore + ?Sized>(store: &S, op: &WriteOperation) -> Result<Value> {
    let model = op.model;
    let args = &op.args;

    match op.action {
        DataAction::Create => {
            let data = object_arg(args, "data")?;
            create(store, model, data).await
        }
        DataAction::CreateMany => {
            let rows = args
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| StorageError::invalid_arguments("`data` must be an array"))?;

            let mut count = 0usize;
            for row in rows {
                let data = row.as_object().ok_or_else(|| {
                    StorageError::invalid_arguments("`data` entries must be objects")
                })?;
                create(store, model, data).await?;
                count += 1;
            }
            Ok(json!({ "count": count }))
        }
        DataAction::Update => {
            let id = where_id(args)?;
            let data = object_arg(args, "data")?;
            match update(store, model, &id, data).await? {
                Some(record) => Ok(record),
                None => Err(StorageError::record_not_found(model, id)),
            }
        }
        DataAction::UpdateMany => {
            let filter = where_filter(args)?;
            let data = object_arg(args, "data")?;

            let mut count = 0usize;
            for record in store.list(model).await? {
                if !matches_filter(&record, &filter) {
                    continue;
                }
                if let Some(id) = document_id(&record) {
                    if update(store, model, &id, data).await?.is_some() {
                        count += 1;
                    }
                }
            }
            Ok(json!({ "count": count }))
        }
        DataAction::Upsert => {
            let id = where_id(args)?;
            let changes = object_arg(args, "update")?;
            if let Some(record) = update(store, model, &id, changes).await? {
                return Ok(record);
            }

            let mut data = object_arg(args, "create")?.clone();
            if !data.contains_key("id") {
                data.insert("id".to_string(), where_id_value(args)?);
            }
            create(store, model, &data).await
        }
        DataAction::Delete => {
            let id = where_id(args)?;
            store
                .remove(model, &id)
                .await?
                .ok_or_else(|| StorageError::record_not_found(model, id))
        }
        DataAction::DeleteMany => {
            let filter = where_filter(args)?;

            let mut count = 0usize;
            for record in store.list(model).await? {
                if !matches_filter(&record, &filter) {
                    continue;
                }
                if let Some(id) = document_id(&record) {
                    if store.remove(model, &id).await?.is_some() {
                        count += 1;
                    }
                }
            }
            Ok(json!({ "count": count }))
        }
        DataAction::FindUnique => {
            let id = where_id(args)?;
            Ok(store.get(model, &id).await?.unwrap_or(Value::Null))
        }
        DataAction::FindMany => {
            let filter = where_filter(args)?;
            let records = store
                .list(model)
                .await?
                .into_iter()
                .filter(|r| matches_filter(r, &filter))
                .collect();
            Ok(Value::Array(records))
        }
    }
}

async fn create<S: RecordStore + ?Sized>(
    store: &S,
    model: Model,
    data: &Map<String, Value>,
) -> Result<Value> {
    let mut record = data.clone();

    let id = match record.get("id") {
        Some(id) => id.clone(),
        None => store.mint_id(model).await?,
    };
    record.insert("id".to_string(), id);

    let key = document_id(&Value::Object(record.clone()))
        .ok_or_else(|| StorageError::invalid_arguments("`id` must be a string or an integer"))?;

    let now = timestamp();
    record
        .entry(CREATED_AT.to_string())
        .or_insert_with(|| Value::String(now.clone()));
    record.insert(UPDATED_AT.to_string(), Value::String(now));

    let record = Value::Object(record);
    store.insert(model, &key, &record).await?;
    Ok(record)
}

async fn update<S: RecordStore + ?Sized>(
    store: &S,
    model: Model,
    id: &str,
    changes: &Map<String, Value>,
) -> Result<Option<Value>> {
    let stamp = Value::String(timestamp());
    let merge = |record: &mut Value| {
        let Value::Object(record) = record else {
            return;
        };
        for (field, value) in changes {
            // Primary identifiers are immutable
            if field == "id" {
                continue;
            }
            record.insert(field.clone(), value.clone());
        }
        record.insert(UPDATED_AT.to_string(), stamp.clone());
    };

    store.modify(model, id, &merge).await
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn object_arg<'a>(args: &'a Value, name: &str) -> Result<&'a Map<String, Value>> {
    args.get(name)
        .and_then(Value::as_object)
        .ok_or_else(|| StorageError::invalid_arguments(format!("`{}` must be an object", name)))
}

fn where_id_value(args: &Value) -> Result<Value> {
    args.get("where")
        .and_then(|w| w.get("id"))
        .cloned()
        .ok_or_else(|| StorageError::invalid_arguments("`where.id` is required"))
}

fn where_id(args: &Value) -> Result<String> {
    let filter = args
        .get("where")
        .ok_or_else(|| StorageError::invalid_arguments("`where.id` is required"))?;
    document_id(filter)
        .ok_or_else(|| StorageError::invalid_arguments("`where.id` must be a string or an integer"))
}

fn where_filter(args: &Value) -> Result<Map<String, Value>> {
    match args.get("where") {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(filter)) => Ok(filter.clone()),
        Some(_) => Err(StorageError::invalid_arguments("`where` must be an object")),
    }
}

/// Field-equality conjunction; an empty filter matches everything
fn matches_filter(record: &Value, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_filter() {
        let record = json!({"id": 1, "state": "TX", "party": "R"});

        assert!(matches_filter(&record, &Map::new()));

        let filter = json!({"state": "TX"});
        assert!(matches_filter(&record, filter.as_object().unwrap()));

        let filter = json!({"state": "TX", "party": "D"});
        assert!(!matches_filter(&record, filter.as_object().unwrap()));

        let filter = json!({"missing": null});
        assert!(!matches_filter(&record, filter.as_object().unwrap()));
    }

    #[test]
    fn test_where_id() {
        assert_eq!(where_id(&json!({"where": {"id": "abc"}})).unwrap(), "abc");
        assert_eq!(where_id(&json!({"where": {"id": 9}})).unwrap(), "9");
        assert!(where_id(&json!({"where": {}})).is_err());
        assert!(where_id(&json!({})).is_err());
    }

    #[test]
    fn test_where_filter() {
        assert!(where_filter(&json!({})).unwrap().is_empty());
        assert!(where_filter(&json!({"where": null})).unwrap().is_empty());
        assert_eq!(where_filter(&json!({"where": {"a": 1}})).unwrap().len(), 1);
        assert!(where_filter(&json!({"where": [1]})).is_err());
    }

    #[test]
    fn test_timestamp_is_rfc3339_utc() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
