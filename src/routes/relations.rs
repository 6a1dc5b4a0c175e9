//! Relation lookups for populated responses
//!
//! List handlers collect the related ids from a page of entities and fetch
//! each relation in one `$in` query, keyed by public id.

use bson::doc;
use std::collections::HashMap;

use crate::db::schemas::{
    BadgeDoc, ChallengeDoc, ResponseDoc, TagDoc, UserDoc, BADGE_COLLECTION, CHALLENGE_COLLECTION,
    RESPONSE_COLLECTION, TAG_COLLECTION, USER_COLLECTION,
};
use crate::db::MongoClient;
use crate::types::Result;

pub async fn users_by_ids(mongo: &MongoClient, ids: &[i64]) -> Result<HashMap<i64, UserDoc>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let collection = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
    let docs = collection
        .find_many(doc! { "id": { "$in": ids.to_vec() } })
        .await?;
    Ok(docs.into_iter().map(|d| (d.id, d)).collect())
}

pub async fn tags_by_ids(mongo: &MongoClient, ids: &[i64]) -> Result<HashMap<i64, TagDoc>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let collection = mongo.collection::<TagDoc>(TAG_COLLECTION).await?;
    let docs = collection
        .find_many(doc! { "id": { "$in": ids.to_vec() } })
        .await?;
    Ok(docs.into_iter().map(|d| (d.id, d)).collect())
}

pub async fn badges_by_ids(mongo: &MongoClient, ids: &[i64]) -> Result<HashMap<i64, BadgeDoc>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let collection = mongo.collection::<BadgeDoc>(BADGE_COLLECTION).await?;
    let docs = collection
        .find_many(doc! { "id": { "$in": ids.to_vec() } })
        .await?;
    Ok(docs.into_iter().map(|d| (d.id, d)).collect())
}

pub async fn challenges_by_ids(
    mongo: &MongoClient,
    ids: &[i64],
) -> Result<HashMap<i64, ChallengeDoc>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let collection = mongo.collection::<ChallengeDoc>(CHALLENGE_COLLECTION).await?;
    let docs = collection
        .find_many(doc! { "id": { "$in": ids.to_vec() } })
        .await?;
    Ok(docs.into_iter().map(|d| (d.id, d)).collect())
}

pub async fn responses_by_ids(
    mongo: &MongoClient,
    ids: &[i64],
) -> Result<HashMap<i64, ResponseDoc>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let collection = mongo.collection::<ResponseDoc>(RESPONSE_COLLECTION).await?;
    let docs = collection
        .find_many(doc! { "id": { "$in": ids.to_vec() } })
        .await?;
    Ok(docs.into_iter().map(|d| (d.id, d)).collect())
}

/// All responses belonging to the given challenges, oldest first.
pub async fn responses_for_challenges(
    mongo: &MongoClient,
    challenge_ids: &[i64],
) -> Result<Vec<ResponseDoc>> {
    if challenge_ids.is_empty() {
        return Ok(Vec::new());
    }
    let collection = mongo.collection::<ResponseDoc>(RESPONSE_COLLECTION).await?;
    collection
        .find_page(
            doc! { "challenge_id": { "$in": challenge_ids.to_vec() } },
            Some(doc! { "metadata.created_at": 1 }),
            None,
            None,
        )
        .await
}

/// Dedup while preserving first-seen order.
pub fn unique_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
