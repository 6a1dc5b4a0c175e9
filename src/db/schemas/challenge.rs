//! Challenge document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::envelope::datetime_iso;

/// Collection name for challenges
pub const CHALLENGE_COLLECTION: &str = "challenges";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Category {
    #[default]
    #[serde(rename = "Real-world Challenge")]
    RealWorldChallenge,
    #[serde(rename = "Academic Q&A")]
    AcademicQa,
    #[serde(rename = "Industry Problem")]
    IndustryProblem,
}

/// Challenge document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ChallengeDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Public integer id exposed on the wire
    pub id: i64,

    pub title: String,

    /// Rich text body (HTML)
    pub description: String,

    /// Author user id (owning side of the relation)
    pub author_id: i64,

    /// Resolved tag ids, in the order the author supplied them
    #[serde(default)]
    pub tag_ids: Vec<i64>,

    #[serde(default)]
    pub difficulty: Difficulty,

    #[serde(default)]
    pub category: Category,

    /// Upvote counter; never mutated by this service
    #[serde(default)]
    pub upvotes: i64,
}

impl ChallengeDoc {
    pub fn new(
        id: i64,
        title: String,
        description: String,
        author_id: i64,
        tag_ids: Vec<i64>,
        difficulty: Difficulty,
        category: Category,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id,
            title,
            description,
            author_id,
            tag_ids,
            difficulty,
            category,
            upvotes: 0,
        }
    }

    /// Wire attributes, without populated relations.
    pub fn attributes(&self) -> Value {
        json!({
            "title": self.title,
            "description": self.description,
            "difficulty": self.difficulty,
            "category": self.category,
            "upvotes": self.upvotes,
            "createdAt": datetime_iso(self.metadata.created_at),
        })
    }
}

impl IntoIndexes for ChallengeDoc {
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
                doc! { "author_id": 1 },
                Some(IndexOptions::builder().name("author_index".to_string()).build()),
            ),
            // Feed queries sort on creation time
            (
                doc! { "metadata.created_at": -1 },
                Some(IndexOptions::builder().name("created_at_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for ChallengeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
