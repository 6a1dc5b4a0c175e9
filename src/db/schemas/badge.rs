//! Badge document schema
//!
//! Static reward metadata attached to users via `UserDoc::badge_ids`.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for badges
pub const BADGE_COLLECTION: &str = "badges";

/// Visual gradient family for a badge
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gradient {
    #[default]
    Blue,
    Green,
    Purple,
    Orange,
}

/// Badge document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BadgeDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Public integer id exposed on the wire
    pub id: i64,

    pub title: String,

    /// Icon identifier for the frontend
    pub icon: String,

    #[serde(default)]
    pub gradient: Gradient,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BadgeDoc {
    pub fn attributes(&self) -> Value {
        json!({
            "title": self.title,
            "icon": self.icon,
            "gradient": self.gradient,
            "description": self.description,
        })
    }

    /// Flat representation used when badges are embedded in flat user JSON.
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "icon": self.icon,
            "gradient": self.gradient,
            "description": self.description,
        })
    }
}

impl IntoIndexes for BadgeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for BadgeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
