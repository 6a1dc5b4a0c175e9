//! Envelope normalization
//!
//! The API wraps entities as `{id, attributes}` and single/collection
//! results inside a `data` field. These functions convert that shape into
//! flat values (`{id, ...attributes}` with relations flattened in place,
//! recursively) so callers never touch the envelope.
//!
//! Flattening is idempotent: already-flat input passes through unchanged,
//! so values can safely be re-normalized at any layer. Relation arrays are
//! written back into the parent after mapping.

use serde_json::Value;

/// Recursively flatten an API value.
///
/// - `null` passes through
/// - arrays map element-wise
/// - `{data: ...}` unwraps when the payload is null, an array, or an object
///   carrying an `id` (an entity envelope)
/// - an object with both `id` and `attributes` becomes `{id, ...attributes}`
/// - every remaining property is flattened in place
/// - scalars pass through
pub fn flatten(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Array(items) => Value::Array(items.into_iter().map(flatten).collect()),
        Value::Object(mut map) => {
            if let Some(data) = map.get("data") {
                let unwrap = match data {
                    Value::Null | Value::Array(_) => true,
                    Value::Object(inner) => inner.contains_key("id"),
                    _ => false,
                };
                if unwrap {
                    return flatten(map.remove("data").expect("checked above"));
                }
            }

            let mut result = if map.contains_key("id") && map.contains_key("attributes") {
                let mut flat = serde_json::Map::new();
                flat.insert("id".to_string(), map.remove("id").expect("checked above"));
                match map.remove("attributes").expect("checked above") {
                    Value::Object(attrs) => flat.extend(attrs),
                    other => {
                        flat.insert("attributes".to_string(), other);
                    }
                }
                flat
            } else {
                map
            };

            for (_, entry) in result.iter_mut() {
                *entry = flatten(std::mem::take(entry));
            }

            Value::Object(result)
        }
        scalar => scalar,
    }
}

/// Flatten a collection result.
///
/// Tolerant of a bare array or the `{data: [...]}` form; null/missing
/// elements are dropped after flattening, and `null` input yields the empty
/// collection. A single entity comes back as a one-element collection.
pub fn flatten_collection(value: Value) -> Vec<Value> {
    match flatten(value) {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().filter(|v| !v.is_null()).collect(),
        single => vec![single],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_passes_through() {
        assert_eq!(flatten(Value::Null), Value::Null);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(flatten(json!(42)), json!(42));
        assert_eq!(flatten(json!("text")), json!("text"));
        assert_eq!(flatten(json!(true)), json!(true));
    }

    #[test]
    fn single_envelope_flattens() {
        let input = json!({"id": 1, "attributes": {"title": "t", "upvotes": 3}});
        assert_eq!(flatten(input), json!({"id": 1, "title": "t", "upvotes": 3}));
    }

    #[test]
    fn collection_envelope_flattens() {
        let input = json!({"data": [
            {"id": 1, "attributes": {"name": "a"}},
            {"id": 2, "attributes": {"name": "b"}},
        ]});
        assert_eq!(
            flatten_collection(input),
            vec![json!({"id": 1, "name": "a"}), json!({"id": 2, "name": "b"})]
        );
    }

    #[test]
    fn nested_relations_flatten_in_place() {
        let input = json!({
            "id": 1,
            "attributes": {
                "title": "t",
                "author": {"data": {"id": 3, "attributes": {"username": "ada"}}},
            }
        });
        assert_eq!(
            flatten(input),
            json!({"id": 1, "title": "t", "author": {"id": 3, "username": "ada"}})
        );
    }

    #[test]
    fn relation_arrays_are_written_back() {
        // Mapped relation arrays must land in the parent, not be discarded
        let input = json!({
            "id": 1,
            "attributes": {
                "tags": {"data": [
                    {"id": 5, "attributes": {"name": "rust"}},
                    {"id": 6, "attributes": {"name": "sql"}},
                ]},
            }
        });
        assert_eq!(
            flatten(input),
            json!({"id": 1, "tags": [
                {"id": 5, "name": "rust"},
                {"id": 6, "name": "sql"},
            ]})
        );
    }

    #[test]
    fn empty_relation_becomes_null() {
        let input = json!({"id": 1, "attributes": {"author": {"data": null}}});
        assert_eq!(flatten(input), json!({"id": 1, "author": null}));
    }

    #[test]
    fn deep_nesting_flattens_transitively() {
        // answer activity: response carries its own parent challenge
        let input = json!({
            "id": 9,
            "attributes": {
                "type": "answer",
                "response": {"data": {
                    "id": 20,
                    "attributes": {
                        "content": "c",
                        "challenge": {"data": {"id": 10, "attributes": {"title": "T"}}},
                    }
                }},
            }
        });
        assert_eq!(
            flatten(input),
            json!({
                "id": 9,
                "type": "answer",
                "response": {"id": 20, "content": "c", "challenge": {"id": 10, "title": "T"}},
            })
        );
    }

    #[test]
    fn flattening_is_idempotent() {
        let inputs = vec![
            json!(null),
            json!([1, 2, 3]),
            json!({"id": 1, "attributes": {"a": {"data": {"id": 2, "attributes": {"b": 1}}}}}),
            json!({"data": [{"id": 1, "attributes": {"x": [1, 2]}}]}),
            json!({"id": 4, "name": "already-flat", "tags": [{"id": 1, "name": "t"}]}),
        ];
        for input in inputs {
            let once = flatten(input);
            assert_eq!(flatten(once.clone()), once);
        }
    }

    #[test]
    fn collection_drops_null_elements() {
        let input = json!({"data": [{"id": 1, "attributes": {}}, null]});
        assert_eq!(flatten_collection(input), vec![json!({"id": 1})]);
    }

    #[test]
    fn collection_of_null_is_empty() {
        assert_eq!(flatten_collection(Value::Null), Vec::<Value>::new());
    }

    #[test]
    fn bare_array_is_tolerated() {
        let input = json!([{"id": 1, "attributes": {"name": "a"}}]);
        assert_eq!(flatten_collection(input), vec![json!({"id": 1, "name": "a"})]);
    }

    #[test]
    fn flat_users_are_untouched() {
        // The users endpoints return flat objects already
        let input = json!({"id": 7, "username": "ada", "skillCoins": 120});
        assert_eq!(flatten(input.clone()), input);
    }

    #[test]
    fn data_attribute_with_scalar_value_is_not_unwrapped() {
        // An ordinary property named "data" holding a scalar stays in place
        let input = json!({"data": "raw", "other": 1});
        assert_eq!(flatten(input.clone()), input);
    }
}
