//! In-memory content store
//!
//! Backs operation tests and local experiments; the server always runs
//! against the Mongo-backed store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::schemas::{ActivityDoc, ChallengeDoc, ResponseDoc, TagDoc};
use crate::store::ContentStore;
use crate::types::Result;

#[derive(Default)]
struct Inner {
    challenges: HashMap<i64, ChallengeDoc>,
    responses: HashMap<i64, ResponseDoc>,
    activities: Vec<ActivityDoc>,
    tags: Vec<TagDoc>,
    next_activity_id: i64,
    next_tag_id: i64,
}

/// Mutex-guarded store; get-or-create is atomic under the lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a challenge (test setup)
    pub fn insert_challenge(&self, challenge: ChallengeDoc) {
        let mut inner = self.inner.lock().unwrap();
        inner.challenges.insert(challenge.id, challenge);
    }

    /// Seed a response (test setup)
    pub fn insert_response(&self, response: ResponseDoc) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.insert(response.id, response);
    }

    /// Number of stored tags
    pub fn tag_count(&self) -> usize {
        self.inner.lock().unwrap().tags.len()
    }

    /// Number of stored activities
    pub fn activity_count(&self) -> usize {
        self.inner.lock().unwrap().activities.len()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn challenge_by_id(&self, id: i64) -> Result<Option<ChallengeDoc>> {
        Ok(self.inner.lock().unwrap().challenges.get(&id).cloned())
    }

    async fn response_by_id(&self, id: i64) -> Result<Option<ResponseDoc>> {
        Ok(self.inner.lock().unwrap().responses.get(&id).cloned())
    }

    async fn create_activity(&self, mut activity: ActivityDoc) -> Result<i64> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_activity_id += 1;
        activity.id = inner.next_activity_id;
        let id = activity.id;
        inner.activities.push(activity);
        Ok(id)
    }

    async fn activities_for_user(&self, user_id: i64) -> Result<Vec<ActivityDoc>> {
        let inner = self.inner.lock().unwrap();
        let mut result: Vec<ActivityDoc> = inner
            .activities
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        result.reverse();
        Ok(result)
    }

    async fn tag_by_name(&self, name: &str) -> Result<Option<TagDoc>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tags.iter().find(|t| t.name == name).cloned())
    }

    async fn get_or_create_tag(&self, name: &str) -> Result<TagDoc> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.tags.iter().find(|t| t.name == name) {
            return Ok(existing.clone());
        }
        inner.next_tag_id += 1;
        let tag = TagDoc::new(inner.next_tag_id, name.to_string());
        inner.tags.push(tag.clone());
        Ok(tag)
    }
}
