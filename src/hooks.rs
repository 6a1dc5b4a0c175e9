//! Lifecycle fan-out
//!
//! After a challenge or response is committed, one activity row is appended
//! linking the acting user, the challenge and (for responses) the parent
//! challenge. The operations re-fetch the entity so the author relation is
//! read from the committed state, not the request payload.
//!
//! Failures are returned to the caller; the HTTP handlers log and continue,
//! so the originating create never fails because the activity log did.
//! Replaying the same create event appends another row — there is no
//! uniqueness constraint on activities.

use crate::db::schemas::ActivityDoc;
use crate::store::ContentStore;
use crate::types::{ForgeError, Result};

/// Append a "challenge" activity for a newly created challenge.
/// Returns the new activity id.
pub async fn challenge_created(store: &dyn ContentStore, challenge_id: i64) -> Result<i64> {
    let challenge = store
        .challenge_by_id(challenge_id)
        .await?
        .ok_or_else(|| ForgeError::NotFound(format!("challenge {}", challenge_id)))?;

    store
        .create_activity(ActivityDoc::challenge_posted(challenge.author_id, challenge.id))
        .await
}

/// Append an "answer" activity for a newly created response.
/// Returns the new activity id.
pub async fn response_created(store: &dyn ContentStore, response_id: i64) -> Result<i64> {
    let response = store
        .response_by_id(response_id)
        .await?
        .ok_or_else(|| ForgeError::NotFound(format!("response {}", response_id)))?;

    store
        .create_activity(ActivityDoc::answer_posted(
            response.author_id,
            response.challenge_id,
            response.id,
        ))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{ActivityType, Category, ChallengeDoc, Difficulty, ResponseDoc};
    use crate::store::MemoryStore;

    fn sample_challenge(id: i64, author_id: i64) -> ChallengeDoc {
        ChallengeDoc::new(
            id,
            "Optimize a warehouse layout".into(),
            "<p>Given pick frequencies...</p>".into(),
            author_id,
            vec![],
            Difficulty::Intermediate,
            Category::RealWorldChallenge,
        )
    }

    #[tokio::test]
    async fn challenge_create_appends_one_activity() {
        let store = MemoryStore::new();
        store.insert_challenge(sample_challenge(10, 3));

        challenge_created(&store, 10).await.unwrap();

        let activities = store.activities_for_user(3).await.unwrap();
        assert_eq!(activities.len(), 1);
        let activity = &activities[0];
        assert_eq!(activity.activity_type, ActivityType::Challenge);
        assert_eq!(activity.challenge_id, Some(10));
        assert_eq!(activity.response_id, None);
    }

    #[tokio::test]
    async fn response_create_links_response_and_challenge() {
        let store = MemoryStore::new();
        store.insert_challenge(sample_challenge(10, 3));
        store.insert_response(ResponseDoc::new(20, "Use ABC slotting.".into(), 7, 10));

        response_created(&store, 20).await.unwrap();

        let activities = store.activities_for_user(7).await.unwrap();
        assert_eq!(activities.len(), 1);
        let activity = &activities[0];
        assert_eq!(activity.activity_type, ActivityType::Answer);
        assert_eq!(activity.challenge_id, Some(10));
        assert_eq!(activity.response_id, Some(20));
    }

    #[tokio::test]
    async fn missing_entity_is_an_error_not_a_panic() {
        let store = MemoryStore::new();
        let err = challenge_created(&store, 999).await.unwrap_err();
        assert!(matches!(err, ForgeError::NotFound(_)));
        assert_eq!(store.activity_count(), 0);
    }

    #[tokio::test]
    async fn replayed_event_appends_a_second_row() {
        let store = MemoryStore::new();
        store.insert_challenge(sample_challenge(10, 3));

        challenge_created(&store, 10).await.unwrap();
        challenge_created(&store, 10).await.unwrap();

        assert_eq!(store.activities_for_user(3).await.unwrap().len(), 2);
    }
}
