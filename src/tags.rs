//! Tag resolution
//!
//! Free-text tag names supplied at challenge authoring resolve to persisted
//! tag ids, one per input name, in input order, duplicates preserved. The
//! store's get-or-create is atomic (unique name index + upsert), so two
//! concurrent resolutions of the same new name yield a single row.

use crate::store::ContentStore;
use crate::types::Result;

/// Resolve tag names to ids, creating missing tags.
pub async fn resolve_tags(store: &dyn ContentStore, names: &[String]) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let tag = store.get_or_create_tag(name).await?;
        ids.push(tag.id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn duplicates_resolve_to_the_same_id() {
        let store = MemoryStore::new();
        let names = vec!["x".to_string(), "y".to_string(), "x".to_string()];

        let ids = resolve_tags(&store, &names).await.unwrap();

        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], ids[2]);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(store.tag_count(), 2);
    }

    #[tokio::test]
    async fn order_mirrors_input() {
        let store = MemoryStore::new();
        let first = resolve_tags(&store, &["rust".into(), "sql".into()]).await.unwrap();
        let second = resolve_tags(&store, &["sql".into(), "rust".into()]).await.unwrap();

        assert_eq!(first[0], second[1]);
        assert_eq!(first[1], second[0]);
    }

    #[tokio::test]
    async fn concurrent_resolution_creates_one_row() {
        let store = Arc::new(MemoryStore::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                resolve_tags(store.as_ref(), &["new-tag".to_string()]).await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.extend(handle.await.unwrap().unwrap());
        }

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.tag_count(), 1);
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let store = MemoryStore::new();
        assert!(resolve_tags(&store, &[]).await.unwrap().is_empty());
    }
}
