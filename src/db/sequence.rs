//! Per-collection integer id sequences
//!
//! Public entity ids are small integers (the wire format exposes `id` as a
//! number, not an ObjectId). Each collection draws ids from a shared
//! `counters` collection via an atomic `$inc` upsert.

use bson::{doc, Document};
use mongodb::options::ReturnDocument;

use crate::db::mongo::MongoClient;
use crate::types::ForgeError;

const COUNTER_COLLECTION: &str = "counters";

/// Allocate the next integer id for a collection.
pub async fn next_id(client: &MongoClient, collection: &str) -> Result<i64, ForgeError> {
    let counters = client
        .inner()
        .database(client.db_name())
        .collection::<Document>(COUNTER_COLLECTION);

    let updated = counters
        .find_one_and_update(
            doc! { "_id": collection },
            doc! { "$inc": { "seq": 1i64 } },
        )
        .upsert(true)
        .return_document(ReturnDocument::After)
        .await
        .map_err(|e| ForgeError::Database(format!("Sequence update failed: {}", e)))?;

    let doc = updated
        .ok_or_else(|| ForgeError::Database(format!("Sequence for '{}' missing", collection)))?;

    doc.get_i64("seq")
        .map_err(|e| ForgeError::Database(format!("Sequence for '{}' malformed: {}", collection, e)))
}
