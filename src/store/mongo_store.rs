//! Mongo-backed content store

use async_trait::async_trait;
use bson::doc;
use mongodb::options::ReturnDocument;

use crate::db::schemas::{
    ActivityDoc, ChallengeDoc, Metadata, ResponseDoc, TagDoc, ACTIVITY_COLLECTION,
    CHALLENGE_COLLECTION, RESPONSE_COLLECTION, TAG_COLLECTION,
};
use crate::db::{sequence, MongoClient};
use crate::store::ContentStore;
use crate::types::{ForgeError, Result};

/// Content store over the shared Mongo client
#[derive(Clone)]
pub struct MongoContentStore {
    client: MongoClient,
}

impl MongoContentStore {
    pub fn new(client: MongoClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }
}

#[async_trait]
impl ContentStore for MongoContentStore {
    async fn challenge_by_id(&self, id: i64) -> Result<Option<ChallengeDoc>> {
        let collection = self
            .client
            .collection::<ChallengeDoc>(CHALLENGE_COLLECTION)
            .await?;
        collection.find_one(doc! { "id": id }).await
    }

    async fn response_by_id(&self, id: i64) -> Result<Option<ResponseDoc>> {
        let collection = self
            .client
            .collection::<ResponseDoc>(RESPONSE_COLLECTION)
            .await?;
        collection.find_one(doc! { "id": id }).await
    }

    async fn create_activity(&self, mut activity: ActivityDoc) -> Result<i64> {
        let id = sequence::next_id(&self.client, ACTIVITY_COLLECTION).await?;
        activity.id = id;

        let collection = self
            .client
            .collection::<ActivityDoc>(ACTIVITY_COLLECTION)
            .await?;
        collection.insert_one(activity).await?;
        Ok(id)
    }

    async fn activities_for_user(&self, user_id: i64) -> Result<Vec<ActivityDoc>> {
        let collection = self
            .client
            .collection::<ActivityDoc>(ACTIVITY_COLLECTION)
            .await?;
        collection
            .find_page(
                doc! { "user_id": user_id },
                Some(doc! { "metadata.created_at": -1 }),
                None,
                None,
            )
            .await
    }

    async fn tag_by_name(&self, name: &str) -> Result<Option<TagDoc>> {
        let collection = self.client.collection::<TagDoc>(TAG_COLLECTION).await?;
        collection.find_one(doc! { "name": name }).await
    }

    async fn get_or_create_tag(&self, name: &str) -> Result<TagDoc> {
        let collection = self.client.collection::<TagDoc>(TAG_COLLECTION).await?;

        // Fast path: the tag usually exists already.
        if let Some(existing) = collection.find_one(doc! { "name": name }).await? {
            return Ok(existing);
        }

        // Allocate an id up front; if the upsert loses the race the id is
        // simply never used (sequence gaps are harmless).
        let id = sequence::next_id(&self.client, TAG_COLLECTION).await?;
        let metadata = bson::to_bson(&Metadata::new())
            .map_err(|e| ForgeError::Database(format!("Metadata encode failed: {}", e)))?;

        let upserted = collection
            .inner()
            .find_one_and_update(
                doc! { "name": name },
                doc! { "$setOnInsert": { "id": id, "name": name, "metadata": metadata } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;

        match upserted {
            Ok(Some(tag)) => Ok(tag),
            Ok(None) => Err(ForgeError::Database(format!(
                "Tag upsert for '{}' returned nothing",
                name
            ))),
            Err(e) => {
                // The unique index can still reject the loser of a concurrent
                // upsert; the winner's row is now visible.
                let error_str = e.to_string();
                if error_str.contains("duplicate key") || error_str.contains("E11000") {
                    collection
                        .find_one(doc! { "name": name })
                        .await?
                        .ok_or_else(|| {
                            ForgeError::Database(format!("Tag '{}' vanished after conflict", name))
                        })
                } else {
                    Err(ForgeError::Database(format!("Tag upsert failed: {}", e)))
                }
            }
        }
    }
}
