//! Wire envelope shapes for the REST API
//!
//! Collection-type entities are serialized as `{id, attributes}` inside a
//! `data` field; populated relations nest the same shape. Errors use the
//! `{data: null, error: {status, name, message}}` body that clients surface
//! as a form-level message.

use serde_json::{json, Map, Value};

/// Wrap an entity as `{id, attributes}`.
pub fn entity(id: i64, attributes: Value) -> Value {
    json!({ "id": id, "attributes": attributes })
}

/// Wrap a single result as `{data: ...}`.
pub fn data(value: Value) -> Value {
    json!({ "data": value })
}

/// Wrap a to-one relation as `{data: entity-or-null}`.
pub fn relation(value: Option<Value>) -> Value {
    json!({ "data": value.unwrap_or(Value::Null) })
}

/// Wrap a to-many relation as `{data: [entities]}`.
pub fn relation_many(values: Vec<Value>) -> Value {
    json!({ "data": values })
}

/// Wrap a page of results as `{data: [...], meta: {pagination}}`.
pub fn collection(entries: Vec<Value>, start: u64, limit: i64, total: u64) -> Value {
    json!({
        "data": entries,
        "meta": {
            "pagination": {
                "start": start,
                "limit": limit,
                "total": total,
            }
        }
    })
}

/// Error body in the CMS shape clients expect.
pub fn error_body(status: u16, name: &str, message: &str) -> Value {
    json!({
        "data": Value::Null,
        "error": {
            "status": status,
            "name": name,
            "message": message,
        }
    })
}

/// Insert populated relations into an entity's attributes.
pub fn with_relations(attributes: Value, relations: Vec<(&str, Value)>) -> Value {
    let mut map = match attributes {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    for (key, value) in relations {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

/// RFC 3339 rendering of an optional BSON timestamp.
pub fn datetime_iso(dt: Option<bson::DateTime>) -> Value {
    match dt {
        Some(dt) => Value::String(dt.to_chrono().to_rfc3339()),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_envelope_shape() {
        let value = entity(7, json!({"name": "rust"}));
        assert_eq!(value, json!({"id": 7, "attributes": {"name": "rust"}}));
    }

    #[test]
    fn populated_relation_nests_envelope() {
        let author = entity(3, json!({"username": "ada"}));
        let attrs = with_relations(json!({"title": "t"}), vec![("author", relation(Some(author)))]);
        let value = entity(1, attrs);
        assert_eq!(
            value,
            json!({
                "id": 1,
                "attributes": {
                    "title": "t",
                    "author": {"data": {"id": 3, "attributes": {"username": "ada"}}},
                }
            })
        );
    }

    #[test]
    fn empty_relation_is_null_data() {
        assert_eq!(relation(None), json!({"data": null}));
    }

    #[test]
    fn collection_carries_pagination_meta() {
        let value = collection(vec![json!({"id": 1})], 0, 25, 1);
        assert_eq!(value["meta"]["pagination"]["limit"], json!(25));
        assert_eq!(value["data"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn error_body_shape() {
        let value = error_body(400, "ValidationError", "title is required");
        assert_eq!(value["data"], Value::Null);
        assert_eq!(value["error"]["status"], json!(400));
        assert_eq!(value["error"]["message"], json!("title is required"));
    }
}
