//! List-query decoding
//!
//! The client serializes nested query objects with bracketed keys
//! (`filters[user][id][$eq]=3`, `pagination[limit]=10`, `sort=createdAt:desc`,
//! `populate=*`). This module decodes that form into typed list options and
//! converts filter trees into MongoDB filter documents through an explicit
//! per-entity field map, so only mapped paths ever reach the database.

use bson::{Bson, Document};
use std::collections::BTreeMap;

use crate::types::{ForgeError, Result};

/// Operators accepted inside filter trees
const FILTER_OPERATORS: &[&str] = &["$eq", "$ne", "$in", "$lt", "$lte", "$gt", "$gte"];

/// Default page size when the query does not specify one
pub const DEFAULT_PAGE_SIZE: i64 = 25;

/// A decoded query-string value: either a scalar or a nested map.
/// Arrays arrive as maps with numeric keys (`populate[0]=author`).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTree {
    Leaf(String),
    Map(BTreeMap<String, QueryTree>),
}

impl QueryTree {
    fn empty() -> Self {
        QueryTree::Map(BTreeMap::new())
    }

    /// Insert a value at a bracket path, creating intermediate maps.
    fn insert(&mut self, path: &[String], value: String) {
        let QueryTree::Map(map) = self else {
            // A scalar was already stored under this key; later nested
            // writes win, matching lenient query-string semantics.
            *self = QueryTree::empty();
            return self.insert(path, value);
        };

        match path {
            [] => {}
            [last] => {
                map.insert(last.clone(), QueryTree::Leaf(value));
            }
            [head, rest @ ..] => {
                map.entry(head.clone())
                    .or_insert_with(QueryTree::empty)
                    .insert(rest, value);
            }
        }
    }

    fn get(&self, key: &str) -> Option<&QueryTree> {
        match self {
            QueryTree::Map(map) => map.get(key),
            QueryTree::Leaf(_) => None,
        }
    }

    fn as_leaf(&self) -> Option<&str> {
        match self {
            QueryTree::Leaf(s) => Some(s),
            QueryTree::Map(_) => None,
        }
    }

    /// Values of a numeric-keyed map, in index order; a leaf yields itself.
    fn as_list(&self) -> Vec<&QueryTree> {
        match self {
            QueryTree::Leaf(_) => vec![self],
            QueryTree::Map(map) => {
                let mut entries: Vec<(usize, &QueryTree)> = map
                    .iter()
                    .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                    .collect();
                entries.sort_by_key(|(i, _)| *i);
                entries.into_iter().map(|(_, v)| v).collect()
            }
        }
    }
}

/// Sort key decoded from `sort=field:dir`
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Page window decoded from `pagination[start]` / `pagination[limit]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub start: u64,
    pub limit: i64,
}

/// Relation population request
#[derive(Debug, Clone, PartialEq)]
pub enum Populate {
    None,
    All,
    Fields(Vec<String>),
}

impl Populate {
    /// Whether a relation field should be populated
    pub fn wants(&self, field: &str) -> bool {
        match self {
            Populate::None => false,
            Populate::All => true,
            Populate::Fields(fields) => fields.iter().any(|f| f == field || f.starts_with(&format!("{field}."))),
        }
    }
}

/// Decoded list options for a collection endpoint
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filters: Option<QueryTree>,
    pub sort: Vec<SortKey>,
    pub pagination: Pagination,
    pub populate: Populate,
}

/// Decode a raw query string into list options.
pub fn parse_query(raw: Option<&str>, max_page_size: i64) -> Result<ListQuery> {
    let mut root = QueryTree::empty();

    for pair in raw.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(key)
            .map_err(|e| ForgeError::Validation(format!("Malformed query key: {}", e)))?;
        let value = urlencoding::decode(value)
            .map_err(|e| ForgeError::Validation(format!("Malformed query value: {}", e)))?;

        let path = parse_bracket_path(&key);
        root.insert(&path, value.into_owned());
    }

    let filters = root.get("filters").cloned();
    let sort = parse_sort(root.get("sort"))?;
    let pagination = parse_pagination(root.get("pagination"), max_page_size)?;
    let populate = parse_populate(root.get("populate"));

    Ok(ListQuery {
        filters,
        sort,
        pagination,
        populate,
    })
}

/// Split `filters[user][id][$eq]` into `["filters", "user", "id", "$eq"]`.
/// Keys without brackets come back as a single segment; a key with
/// unbalanced brackets is treated as literal.
fn parse_bracket_path(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if !key.ends_with(']') {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return vec![key.to_string()];
        };
        segments.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    if !rest.is_empty() {
        return vec![key.to_string()];
    }
    segments
}

fn parse_sort(tree: Option<&QueryTree>) -> Result<Vec<SortKey>> {
    let Some(tree) = tree else {
        return Ok(Vec::new());
    };

    let mut keys = Vec::new();
    for entry in tree.as_list() {
        let Some(spec) = entry.as_leaf() else {
            return Err(ForgeError::Validation("Malformed sort parameter".into()));
        };
        let (field, dir) = spec.split_once(':').unwrap_or((spec, "asc"));
        let descending = match dir {
            "asc" => false,
            "desc" => true,
            other => {
                return Err(ForgeError::Validation(format!(
                    "Unknown sort direction '{}'",
                    other
                )))
            }
        };
        keys.push(SortKey {
            field: field.to_string(),
            descending,
        });
    }
    Ok(keys)
}

fn parse_pagination(tree: Option<&QueryTree>, max_page_size: i64) -> Result<Pagination> {
    let mut pagination = Pagination {
        start: 0,
        limit: DEFAULT_PAGE_SIZE.min(max_page_size),
    };

    let Some(tree) = tree else {
        return Ok(pagination);
    };

    if let Some(limit) = tree.get("limit").and_then(QueryTree::as_leaf) {
        let limit: i64 = limit
            .parse()
            .map_err(|_| ForgeError::Validation(format!("Invalid pagination limit '{}'", limit)))?;
        pagination.limit = limit.clamp(1, max_page_size);
    }

    if let Some(start) = tree.get("start").and_then(QueryTree::as_leaf) {
        pagination.start = start
            .parse()
            .map_err(|_| ForgeError::Validation(format!("Invalid pagination start '{}'", start)))?;
    }

    Ok(pagination)
}

fn parse_populate(tree: Option<&QueryTree>) -> Populate {
    let Some(tree) = tree else {
        return Populate::None;
    };

    match tree {
        QueryTree::Leaf(s) if s == "*" => Populate::All,
        QueryTree::Leaf(s) if s.is_empty() => Populate::None,
        QueryTree::Leaf(s) => Populate::Fields(s.split(',').map(|f| f.trim().to_string()).collect()),
        QueryTree::Map(_) => {
            let fields: Vec<String> = tree
                .as_list()
                .iter()
                .filter_map(|e| e.as_leaf())
                .map(|s| s.to_string())
                .collect();
            if fields.iter().any(|f| f == "*") {
                Populate::All
            } else {
                Populate::Fields(fields)
            }
        }
    }
}

/// Convert a filter tree into a MongoDB filter document.
///
/// `field_map` maps relation paths to storage fields (`["user", "id"]` →
/// `"user_id"`); paths it does not recognize are rejected with a validation
/// error rather than passed to the database.
pub fn filters_to_bson(
    tree: &QueryTree,
    field_map: &dyn Fn(&[&str]) -> Option<&'static str>,
) -> Result<Document> {
    let mut constraints: Vec<(String, String, Bson)> = Vec::new();
    collect_constraints(tree, &mut Vec::new(), field_map, &mut constraints)?;

    let mut filter = Document::new();
    for (field, op, value) in constraints {
        match filter.get_mut(&field) {
            Some(Bson::Document(ops)) => {
                ops.insert(op, value);
            }
            _ => {
                let mut ops = Document::new();
                ops.insert(op, value);
                filter.insert(field, ops);
            }
        }
    }
    Ok(filter)
}

fn collect_constraints(
    tree: &QueryTree,
    path: &mut Vec<String>,
    field_map: &dyn Fn(&[&str]) -> Option<&'static str>,
    out: &mut Vec<(String, String, Bson)>,
) -> Result<()> {
    match tree {
        // A bare leaf is an implicit equality
        QueryTree::Leaf(value) => {
            let field = resolve_field(path, field_map)?;
            out.push((field, "$eq".to_string(), parse_scalar(value)));
        }
        QueryTree::Map(map) => {
            for (key, child) in map {
                if key.starts_with('$') {
                    if !FILTER_OPERATORS.contains(&key.as_str()) {
                        return Err(ForgeError::Validation(format!(
                            "Unsupported filter operator '{}'",
                            key
                        )));
                    }
                    let field = resolve_field(path, field_map)?;
                    let value = if key == "$in" {
                        let items: Vec<Bson> = child
                            .as_list()
                            .iter()
                            .filter_map(|e| e.as_leaf())
                            .map(parse_scalar)
                            .collect();
                        Bson::Array(items)
                    } else {
                        match child.as_leaf() {
                            Some(leaf) => parse_scalar(leaf),
                            None => {
                                return Err(ForgeError::Validation(format!(
                                    "Operator '{}' expects a scalar",
                                    key
                                )))
                            }
                        }
                    };
                    out.push((field, key.clone(), value));
                } else {
                    path.push(key.clone());
                    collect_constraints(child, path, field_map, out)?;
                    path.pop();
                }
            }
        }
    }
    Ok(())
}

fn resolve_field(
    path: &[String],
    field_map: &dyn Fn(&[&str]) -> Option<&'static str>,
) -> Result<String> {
    let parts: Vec<&str> = path.iter().map(String::as_str).collect();
    field_map(&parts)
        .map(str::to_string)
        .ok_or_else(|| ForgeError::Validation(format!("Unknown filter field '{}'", path.join("."))))
}

/// Best-effort scalar typing: integers and booleans are compared natively,
/// everything else as a string.
fn parse_scalar(value: &str) -> Bson {
    if let Ok(n) = value.parse::<i64>() {
        return Bson::Int64(n);
    }
    match value {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        _ => Bson::String(value.to_string()),
    }
}

/// Convert decoded sort keys into a MongoDB sort document.
pub fn sort_to_bson(
    sort: &[SortKey],
    field_map: &dyn Fn(&[&str]) -> Option<&'static str>,
) -> Result<Option<Document>> {
    if sort.is_empty() {
        return Ok(None);
    }

    let mut document = Document::new();
    for key in sort {
        let field = resolve_field(&[key.field.clone()], field_map)?;
        document.insert(field, if key.descending { -1 } else { 1 });
    }
    Ok(Some(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn activity_fields(path: &[&str]) -> Option<&'static str> {
        match path {
            ["user", "id"] | ["user"] => Some("user_id"),
            ["type"] => Some("type"),
            ["createdAt"] => Some("metadata.created_at"),
            _ => None,
        }
    }

    #[test]
    fn decodes_nested_filters_pagination_and_sort() {
        let query = parse_query(
            Some("filters%5Buser%5D%5Bid%5D%5B%24eq%5D=3&pagination%5Blimit%5D=10&sort=createdAt%3Adesc"),
            100,
        )
        .unwrap();

        assert_eq!(query.pagination.limit, 10);
        assert_eq!(query.pagination.start, 0);
        assert_eq!(
            query.sort,
            vec![SortKey {
                field: "createdAt".into(),
                descending: true
            }]
        );

        let filter = filters_to_bson(query.filters.as_ref().unwrap(), &activity_fields).unwrap();
        assert_eq!(filter, doc! { "user_id": { "$eq": 3i64 } });
    }

    #[test]
    fn unencoded_brackets_also_decode() {
        let query = parse_query(Some("filters[type][$eq]=challenge"), 100).unwrap();
        let filter = filters_to_bson(query.filters.as_ref().unwrap(), &activity_fields).unwrap();
        assert_eq!(filter, doc! { "type": { "$eq": "challenge" } });
    }

    #[test]
    fn bare_leaf_is_implicit_equality() {
        let query = parse_query(Some("filters[user]=7"), 100).unwrap();
        let filter = filters_to_bson(query.filters.as_ref().unwrap(), &activity_fields).unwrap();
        assert_eq!(filter, doc! { "user_id": { "$eq": 7i64 } });
    }

    #[test]
    fn in_operator_collects_array() {
        let query = parse_query(
            Some("filters[user][id][$in][0]=1&filters[user][id][$in][1]=2"),
            100,
        )
        .unwrap();
        let filter = filters_to_bson(query.filters.as_ref().unwrap(), &activity_fields).unwrap();
        assert_eq!(filter, doc! { "user_id": { "$in": [1i64, 2i64] } });
    }

    #[test]
    fn unknown_filter_field_is_rejected() {
        let query = parse_query(Some("filters[password_hash][$eq]=x"), 100).unwrap();
        let err = filters_to_bson(query.filters.as_ref().unwrap(), &activity_fields).unwrap_err();
        assert!(matches!(err, ForgeError::Validation(_)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let query = parse_query(Some("filters[type][$where]=1"), 100).unwrap();
        let err = filters_to_bson(query.filters.as_ref().unwrap(), &activity_fields).unwrap_err();
        assert!(matches!(err, ForgeError::Validation(_)));
    }

    #[test]
    fn limit_is_clamped_to_the_server_maximum() {
        let query = parse_query(Some("pagination[limit]=5000"), 100).unwrap();
        assert_eq!(query.pagination.limit, 100);

        let query = parse_query(Some("pagination[limit]=0"), 100).unwrap();
        assert_eq!(query.pagination.limit, 1);
    }

    #[test]
    fn missing_query_uses_defaults() {
        let query = parse_query(None, 100).unwrap();
        assert!(query.filters.is_none());
        assert!(query.sort.is_empty());
        assert_eq!(query.pagination.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query.populate, Populate::None);
    }

    #[test]
    fn populate_star_and_field_lists() {
        assert_eq!(
            parse_query(Some("populate=*"), 100).unwrap().populate,
            Populate::All
        );
        assert_eq!(
            parse_query(Some("populate=author,tags"), 100).unwrap().populate,
            Populate::Fields(vec!["author".into(), "tags".into()])
        );
        assert_eq!(
            parse_query(Some("populate[0]=author&populate[1]=tags"), 100)
                .unwrap()
                .populate,
            Populate::Fields(vec!["author".into(), "tags".into()])
        );
    }

    #[test]
    fn populate_wants_matches_nested_requests() {
        let populate = Populate::Fields(vec!["responses.author".into()]);
        assert!(populate.wants("responses"));
        assert!(!populate.wants("tags"));
        assert!(Populate::All.wants("anything"));
    }

    #[test]
    fn sort_to_document_maps_fields() {
        let sort = vec![SortKey {
            field: "createdAt".into(),
            descending: true,
        }];
        let document = sort_to_bson(&sort, &activity_fields).unwrap().unwrap();
        assert_eq!(document, doc! { "metadata.created_at": -1 });
    }
}
