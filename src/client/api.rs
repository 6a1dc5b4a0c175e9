//! Typed API client
//!
//! Wraps the REST endpoints the web frontend consumes. Every fetch runs
//! through the envelope normalization, so callers only ever see flat domain
//! values. Failures surface the API error body's message; there is no retry
//! at this layer - every failure is terminal for the current action.

use serde_json::{json, Value};

use crate::client::normalize::{flatten, flatten_collection};
use crate::client::query::to_query_string;
use crate::client::types;
use crate::types::{ForgeError, Result};
use crate::validate;

/// Environment variable overriding the API origin
pub const API_URL_ENV: &str = "SKILLFORGE_API_URL";

/// Default API origin for local development
pub const DEFAULT_API_URL: &str = "http://localhost:1337";

/// HTTP client for the SkillForge API
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            token: None,
        }
    }

    /// Build a client from the environment, falling back to localhost.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(base_url)
    }

    /// Attach (or clear) the bearer token used on subsequent requests.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn get_json(&self, path: &str, params: Option<&Value>) -> Result<Value> {
        let mut url = format!("{}/api{}", self.base_url, path);
        if let Some(params) = params {
            let qs = to_query_string(params);
            if !qs.is_empty() {
                url.push('?');
                url.push_str(&qs);
            }
        }

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ForgeError::Http(format!("Request failed: {}", e)))?;

        Self::read_json(response).await
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value> {
        let url = format!("{}/api{}", self.base_url, path);

        // Auth endpoints take the payload bare; content endpoints wrap it
        // in a `data` field.
        let body = if path.starts_with("/auth/") {
            payload.clone()
        } else {
            json!({ "data": payload })
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ForgeError::Http(format!("Request failed: {}", e)))?;

        Self::read_json(response).await
    }

    /// Read a JSON body; non-2xx responses surface the API error message.
    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ForgeError::Http(format!("Invalid response body: {}", e)))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("An error occurred.");
            return Err(ForgeError::Api(message.to_string()));
        }

        Ok(body)
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// POST /api/auth/local - authenticate and keep the returned token.
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<types::AuthSession> {
        validate::login(identifier, password)?;

        let body = self
            .post_json(
                "/auth/local",
                &json!({ "identifier": identifier, "password": password }),
            )
            .await?;

        let session: types::AuthSession = serde_json::from_value(flatten(body))
            .map_err(|e| ForgeError::Http(format!("Unexpected auth response: {}", e)))?;
        self.token = Some(session.jwt.clone());
        Ok(session)
    }

    /// POST /api/auth/local/register - create an account and keep the token.
    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<types::AuthSession> {
        validate::registration(username, email, password)?;

        let body = self
            .post_json(
                "/auth/local/register",
                &json!({ "username": username, "email": email, "password": password }),
            )
            .await?;

        let session: types::AuthSession = serde_json::from_value(flatten(body))
            .map_err(|e| ForgeError::Http(format!("Unexpected auth response: {}", e)))?;
        self.token = Some(session.jwt.clone());
        Ok(session)
    }

    /// POST /api/auth/forgot-password - always acknowledged.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        if !validate::is_valid_email(email) {
            return Err(ForgeError::Validation("A valid email is required".into()));
        }
        self.post_json("/auth/forgot-password", &json!({ "email": email }))
            .await?;
        Ok(())
    }

    /// GET /api/users/me - the authenticated user.
    pub async fn me(&self) -> Result<types::User> {
        let body = self.get_json("/users/me", Some(&json!({ "populate": "*" }))).await?;
        from_flat(flatten(body))
    }

    // =========================================================================
    // Challenges & responses
    // =========================================================================

    /// GET /api/challenges - newest first, relations populated.
    pub async fn challenges(&self) -> Result<Vec<types::Challenge>> {
        let body = self
            .get_json(
                "/challenges",
                Some(&json!({ "populate": "*", "sort": "createdAt:desc" })),
            )
            .await?;
        from_flat_collection(body)
    }

    /// GET /api/challenges/{id}
    pub async fn challenge(&self, id: i64) -> Result<types::Challenge> {
        let body = self.get_json(&format!("/challenges/{}", id), None).await?;
        let flat = flatten(body);
        if flat.is_null() {
            return Err(ForgeError::NotFound("Challenge not found".into()));
        }
        from_flat(flat)
    }

    /// POST /api/challenges - free-text tag names resolve server-side.
    pub async fn create_challenge(&self, challenge: &types::NewChallenge) -> Result<types::Challenge> {
        validate::challenge(&challenge.title, &challenge.description)?;

        let body = self
            .post_json(
                "/challenges",
                &json!({
                    "title": challenge.title,
                    "description": challenge.description,
                    "difficulty": challenge.difficulty,
                    "category": challenge.category,
                    "tags": challenge.tags,
                }),
            )
            .await?;

        let flat = flatten(body);
        if flat.is_null() {
            return Err(ForgeError::Api("Failed to create challenge".into()));
        }
        from_flat(flat)
    }

    /// GET /api/responses filtered on the parent challenge, oldest first.
    pub async fn responses_for(&self, challenge_id: i64) -> Result<Vec<types::Response>> {
        let body = self
            .get_json(
                "/responses",
                Some(&json!({
                    "filters": { "challenge": { "id": { "$eq": challenge_id } } },
                    "sort": "createdAt:asc",
                    "populate": "*",
                })),
            )
            .await?;
        from_flat_collection(body)
    }

    /// POST /api/responses
    pub async fn create_response(&self, challenge_id: i64, content: &str) -> Result<types::Response> {
        validate::response(content)?;

        let body = self
            .post_json(
                "/responses",
                &json!({ "content": content, "challenge": challenge_id }),
            )
            .await?;

        let flat = flatten(body);
        if flat.is_null() {
            return Err(ForgeError::Api("Failed to create response".into()));
        }
        from_flat(flat)
    }

    // =========================================================================
    // Activity feed
    // =========================================================================

    /// GET /api/activities - the site-wide feed, newest first.
    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<types::Activity>> {
        let body = self
            .get_json(
                "/activities",
                Some(&json!({
                    "pagination": { "limit": limit },
                    "sort": "createdAt:desc",
                    "populate": "*",
                })),
            )
            .await?;
        from_flat_collection(body)
    }

    /// GET /api/activities filtered on the acting user.
    pub async fn user_activity(&self, user_id: i64, limit: i64) -> Result<Vec<types::Activity>> {
        let body = self
            .get_json(
                "/activities",
                Some(&json!({
                    "pagination": { "limit": limit },
                    "sort": "createdAt:desc",
                    "filters": { "user": { "id": { "$eq": user_id } } },
                    "populate": "*",
                })),
            )
            .await?;
        from_flat_collection(body)
    }

    // =========================================================================
    // Users & leaderboard
    // =========================================================================

    /// GET /api/users
    pub async fn users(&self) -> Result<Vec<types::User>> {
        let body = self.get_json("/users", Some(&json!({ "populate": "*" }))).await?;
        from_flat_collection(body)
    }

    /// GET /api/users/{id}
    pub async fn user(&self, id: i64) -> Result<types::User> {
        let body = self
            .get_json(&format!("/users/{}", id), Some(&json!({ "populate": "*" })))
            .await?;
        from_flat(flatten(body))
    }

    /// Leaderboard: users ordered by rank.
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<types::User>> {
        let body = self
            .get_json(
                "/users",
                Some(&json!({
                    "populate": "*",
                    "pagination": { "limit": limit },
                    "sort": "rank:asc",
                })),
            )
            .await?;
        from_flat_collection(body)
    }

    /// The podium: top three contributors.
    pub async fn top_contributors(&self) -> Result<Vec<types::User>> {
        self.leaderboard(3).await
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Look up a tag by exact name.
    pub async fn tag_by_name(&self, name: &str) -> Result<Option<types::Tag>> {
        let body = self
            .get_json(
                "/tags",
                Some(&json!({ "filters": { "name": { "$eq": name } } })),
            )
            .await?;
        let mut tags: Vec<types::Tag> = from_flat_collection(body)?;
        Ok(if tags.is_empty() { None } else { Some(tags.remove(0)) })
    }

    /// POST /api/tags - the server deduplicates by name.
    pub async fn create_tag(&self, name: &str) -> Result<types::Tag> {
        let body = self.post_json("/tags", &json!({ "name": name })).await?;
        let flat = flatten(body);
        if flat.is_null() {
            return Err(ForgeError::Api("Failed to create tag".into()));
        }
        from_flat(flat)
    }

    /// Resolve tag names to ids, creating missing tags; output order mirrors
    /// input order, duplicates preserved.
    pub async fn resolve_tags(&self, names: &[String]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let tag = match self.tag_by_name(name).await? {
                Some(tag) => tag,
                None => self.create_tag(name).await?,
            };
            ids.push(tag.id);
        }
        Ok(ids)
    }
}

/// Deserialize a flattened value into a domain type.
fn from_flat<T: serde::de::DeserializeOwned>(flat: Value) -> Result<T> {
    serde_json::from_value(flat)
        .map_err(|e| ForgeError::Http(format!("Unexpected response shape: {}", e)))
}

/// Flatten a collection response and deserialize each element.
fn from_flat_collection<T: serde::de::DeserializeOwned>(body: Value) -> Result<Vec<T>> {
    flatten_collection(body).into_iter().map(from_flat).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enveloped_challenge_deserializes() {
        let body = json!({"data": {
            "id": 1,
            "attributes": {
                "title": "T",
                "description": "D",
                "difficulty": "Beginner",
                "category": "Academic Q&A",
                "upvotes": 2,
                "author": {"data": {"id": 3, "attributes": {"username": "ada", "skillCoins": 10}}},
                "tags": {"data": [{"id": 5, "attributes": {"name": "rust"}}]},
            }
        }});

        let challenge: types::Challenge = from_flat(flatten(body)).unwrap();
        assert_eq!(challenge.id, 1);
        assert_eq!(challenge.author.as_ref().unwrap().username, "ada");
        assert_eq!(challenge.tags[0].name, "rust");
        assert_eq!(challenge.difficulty, Some(types::Difficulty::Beginner));
    }

    #[test]
    fn flat_auth_response_deserializes() {
        let body = json!({"jwt": "tok", "user": {"id": 1, "username": "ada", "skillCoins": 0}});
        let session: types::AuthSession = from_flat(flatten(body)).unwrap();
        assert_eq!(session.jwt, "tok");
        assert_eq!(session.user.username, "ada");
    }

    #[test]
    fn activity_collection_deserializes() {
        let body = json!({"data": [{
            "id": 9,
            "attributes": {
                "type": "answer",
                "user": {"data": {"id": 3, "attributes": {"username": "ada"}}},
                "response": {"data": {"id": 20, "attributes": {
                    "content": "c",
                    "challenge": {"data": {"id": 10, "attributes": {"title": "T"}}},
                }}},
            }
        }], "meta": {"pagination": {"total": 1}}});

        let activities: Vec<types::Activity> = from_flat_collection(body).unwrap();
        assert_eq!(activities.len(), 1);
        let activity = &activities[0];
        assert_eq!(activity.activity_type, types::ActivityType::Answer);
        let response = activity.response.as_ref().unwrap();
        assert_eq!(response.challenge.as_ref().unwrap().title, "T");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = ApiClient::new("http://localhost:1337/");
        assert_eq!(api.base_url(), "http://localhost:1337");
    }
}
