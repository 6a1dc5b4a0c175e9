//! Response document schema
//!
//! A response is an answer to a challenge; the `challenge_id` relation is
//! required at creation and never null afterwards.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::envelope::datetime_iso;

/// Collection name for responses
pub const RESPONSE_COLLECTION: &str = "responses";

/// Response document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ResponseDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Public integer id exposed on the wire
    pub id: i64,

    /// Rich text body
    pub content: String,

    /// Author user id
    pub author_id: i64,

    /// Parent challenge id (required)
    pub challenge_id: i64,

    /// Upvote counter; never mutated by this service
    #[serde(default)]
    pub upvotes: i64,

    /// Marked by the challenge author; uniqueness per challenge is not enforced
    #[serde(default)]
    pub is_accepted: bool,
}

impl ResponseDoc {
    pub fn new(id: i64, content: String, author_id: i64, challenge_id: i64) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id,
            content,
            author_id,
            challenge_id,
            upvotes: 0,
            is_accepted: false,
        }
    }

    /// Wire attributes, without populated relations.
    pub fn attributes(&self) -> Value {
        json!({
            "content": self.content,
            "upvotes": self.upvotes,
            "isAccepted": self.is_accepted,
            "createdAt": datetime_iso(self.metadata.created_at),
        })
    }
}

impl IntoIndexes for ResponseDoc {
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
                doc! { "challenge_id": 1 },
                Some(IndexOptions::builder().name("challenge_index".to_string()).build()),
            ),
            (
                doc! { "author_id": 1 },
                Some(IndexOptions::builder().name("author_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for ResponseDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
