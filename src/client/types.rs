//! Client-side domain types
//!
//! Deserialized from normalized (flattened) API values, one explicit type
//! per entity. Enumerations are shared with the schemas so both sides of
//! the wire agree on spellings.

use serde::Deserialize;

pub use crate::db::schemas::{ActivityType, Category, Difficulty, Gradient, UserType};

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: i64,
    pub title: String,
    pub icon: String,
    #[serde(default)]
    pub gradient: Gradient,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "type", default)]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skill_coins: i64,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub weekly_rank: i64,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub specialties: Vec<Tag>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub is_accepted: bool,
    /// Parent challenge; present when the relation was populated
    #[serde(default)]
    pub challenge: Option<Box<Challenge>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub challenge: Option<Challenge>,
    #[serde(default)]
    pub response: Option<Response>,
    #[serde(default)]
    pub badge: Option<Badge>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Result of a successful login or registration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub jwt: String,
    pub user: User,
}

/// Payload for authoring a challenge; tags are free-text names
#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: Category,
    pub tags: Vec<String>,
}
