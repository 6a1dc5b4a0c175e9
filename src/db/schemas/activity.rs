//! Activity document schema
//!
//! Append-only log of user-visible events. Rows are created exclusively by
//! the fan-out in `hooks`; application code never updates or deletes them.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::envelope::datetime_iso;

/// Collection name for activities
pub const ACTIVITY_COLLECTION: &str = "activities";

/// Kind of event an activity row records
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    #[default]
    Challenge,
    Answer,
    Badge,
    Upvote,
}

/// Activity document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ActivityDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Public integer id exposed on the wire
    pub id: i64,

    #[serde(rename = "type")]
    pub activity_type: ActivityType,

    /// Acting user id
    pub user_id: i64,

    /// Related challenge, when the event concerns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_id: Option<i64>,

    /// Related response; always set together with challenge_id for answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<i64>,

    /// Related badge, for badge awards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_id: Option<i64>,
}

impl ActivityDoc {
    /// Log entry for a newly posted challenge. The store allocates the id.
    pub fn challenge_posted(user_id: i64, challenge_id: i64) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: 0,
            activity_type: ActivityType::Challenge,
            user_id,
            challenge_id: Some(challenge_id),
            response_id: None,
            badge_id: None,
        }
    }

    /// Log entry for a newly posted response. The store allocates the id.
    pub fn answer_posted(user_id: i64, challenge_id: i64, response_id: i64) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id: 0,
            activity_type: ActivityType::Answer,
            user_id,
            challenge_id: Some(challenge_id),
            response_id: Some(response_id),
            badge_id: None,
        }
    }

    /// Wire attributes, without populated relations.
    pub fn attributes(&self) -> Value {
        json!({
            "type": self.activity_type,
            "createdAt": datetime_iso(self.metadata.created_at),
        })
    }
}

impl IntoIndexes for ActivityDoc {
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
            // Profile feeds filter on the acting user and sort on time
            (
                doc! { "user_id": 1, "metadata.created_at": -1 },
                Some(IndexOptions::builder().name("user_created_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for ActivityDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
