//! User document schema
//!
//! Stores credentials, profile fields and the gamification attributes
//! (SkillCoins, ranks, badges). SkillCoins and ranks are read-only to this
//! service; they are adjusted by external reward jobs.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::envelope::datetime_iso;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User account category
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserType {
    #[default]
    Student,
    Lecturer,
    #[serde(rename = "Industry Professional")]
    IndustryProfessional,
}

/// A tag-like specialty attached to a user profile
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Specialty {
    pub id: i64,
    pub name: String,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Public integer id exposed on the wire
    pub id: i64,

    /// Display / login name (unique)
    pub username: String,

    /// Email address (unique)
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Account category
    #[serde(default)]
    pub user_type: UserType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Reward currency balance; never mutated here
    #[serde(default)]
    pub skill_coins: i64,

    /// Leaderboard position; never mutated here
    #[serde(default)]
    pub rank: i64,

    /// Leaderboard position over the trailing week
    #[serde(default)]
    pub weekly_rank: i64,

    /// Ids of badges earned by this user, in award order
    #[serde(default)]
    pub badge_ids: Vec<i64>,

    /// Topic areas the user lists on their profile
    #[serde(default)]
    pub specialties: Vec<Specialty>,

    /// Whether the account is active
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new user document at registration defaults
    pub fn new(id: i64, username: String, email: String, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id,
            username,
            email,
            password_hash,
            user_type: UserType::Student,
            university: None,
            program: None,
            graduation_year: None,
            location: None,
            bio: None,
            skill_coins: 0,
            rank: 0,
            weekly_rank: 0,
            badge_ids: Vec::new(),
            specialties: Vec::new(),
            is_active: true,
        }
    }

    /// Wire attributes, used when a user appears as a populated relation.
    /// The password hash never leaves the server.
    pub fn attributes(&self) -> Value {
        json!({
            "username": self.username,
            "email": self.email,
            "type": self.user_type,
            "university": self.university,
            "program": self.program,
            "graduationYear": self.graduation_year,
            "location": self.location,
            "bio": self.bio,
            "skillCoins": self.skill_coins,
            "rank": self.rank,
            "weeklyRank": self.weekly_rank,
            "specialties": self.specialties.iter().map(|s| json!({"id": s.id, "name": s.name})).collect::<Vec<_>>(),
            "createdAt": datetime_iso(self.metadata.created_at),
        })
    }

    /// Flat wire representation for the users endpoints, which serialize
    /// users without the `{id, attributes}` envelope (matching the upstream
    /// users plugin).
    pub fn to_json(&self) -> Value {
        let mut flat = serde_json::Map::new();
        flat.insert("id".to_string(), json!(self.id));
        if let Value::Object(attrs) = self.attributes() {
            flat.extend(attrs);
        }
        Value::Object(flat)
    }
}

impl IntoIndexes for UserDoc {
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
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            // Leaderboard queries sort on rank
            (
                doc! { "rank": 1 },
                Some(IndexOptions::builder().name("rank_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
