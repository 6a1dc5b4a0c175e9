//! Client-side query-string encoding
//!
//! Serializes nested parameter objects into the bracketed form the server
//! decodes: `{filters: {user: {id: {"$eq": 3}}}}` becomes
//! `filters[user][id][$eq]=3` (URL-escaped). Arrays use numeric indices.
//! Null values are skipped.

use serde_json::Value;

/// Encode a parameter object as a query string (no leading `?`).
///
/// Non-object input yields the empty string; there is no meaningful
/// top-level key for a bare scalar or array.
pub fn to_query_string(params: &Value) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Value::Object(map) = params {
        for (key, value) in map {
            build_params(value, key, &mut parts);
        }
    }

    parts.join("&")
}

fn build_params(data: &Value, prefix: &str, parts: &mut Vec<String>) {
    match data {
        Value::Null => {}
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                build_params(value, &format!("{}[{}]", prefix, index), parts);
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                build_params(value, &format!("{}[{}]", prefix, key), parts);
            }
        }
        scalar => {
            let rendered = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            parts.push(format!(
                "{}={}",
                urlencoding::encode(prefix),
                urlencoding::encode(&rendered)
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_params_encode_directly() {
        let params = json!({"sort": "createdAt:desc"});
        assert_eq!(to_query_string(&params), "sort=createdAt%3Adesc");
    }

    #[test]
    fn nested_filters_use_brackets() {
        let params = json!({"filters": {"user": {"id": {"$eq": 3}}}});
        assert_eq!(
            to_query_string(&params),
            "filters%5Buser%5D%5Bid%5D%5B%24eq%5D=3"
        );
    }

    #[test]
    fn arrays_use_numeric_indices() {
        let params = json!({"populate": ["author", "tags"]});
        assert_eq!(
            to_query_string(&params),
            "populate%5B0%5D=author&populate%5B1%5D=tags"
        );
    }

    #[test]
    fn null_values_are_skipped() {
        let params = json!({"a": null, "b": 1});
        assert_eq!(to_query_string(&params), "b=1");
    }

    #[test]
    fn pagination_keys_encode() {
        let params = json!({"pagination": {"limit": 10}, "sort": "rank:asc"});
        let qs = to_query_string(&params);
        assert!(qs.contains("pagination%5Blimit%5D=10"));
        assert!(qs.contains("sort=rank%3Aasc"));
    }

    #[test]
    fn round_trips_through_the_server_decoder() {
        let params = json!({
            "filters": {"user": {"id": {"$eq": 3}}},
            "pagination": {"limit": 10},
            "sort": "createdAt:desc",
        });
        let qs = to_query_string(&params);

        let decoded = crate::query::parse_query(Some(&qs), 100).unwrap();
        assert_eq!(decoded.pagination.limit, 10);
        assert_eq!(decoded.sort[0].field, "createdAt");
        assert!(decoded.sort[0].descending);
        assert!(decoded.filters.is_some());
    }
}
