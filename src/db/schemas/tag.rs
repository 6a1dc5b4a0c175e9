//! Tag document schema
//!
//! Names are unique; the index backs the atomic get-or-create in the store.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for tags
pub const TAG_COLLECTION: &str = "tags";

/// Tag document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TagDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Public integer id exposed on the wire
    pub id: i64,

    /// Unique name
    pub name: String,
}

impl TagDoc {
    pub fn new(id: i64, name: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id,
            name,
        }
    }

    pub fn attributes(&self) -> Value {
        json!({ "name": self.name })
    }
}

impl IntoIndexes for TagDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("name_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for TagDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
