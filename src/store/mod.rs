//! Content store capability trait
//!
//! The fan-out and tag-resolution operations run against this seam instead
//! of a concrete database handle, so they can be exercised with the
//! in-memory store and swapped for the Mongo-backed one in the server.

mod memory;
mod mongo_store;

pub use memory::MemoryStore;
pub use mongo_store::MongoContentStore;

use async_trait::async_trait;

use crate::db::schemas::{ActivityDoc, ChallengeDoc, ResponseDoc, TagDoc};
use crate::types::Result;

/// Find/create capabilities needed by the lifecycle operations
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a challenge by public id
    async fn challenge_by_id(&self, id: i64) -> Result<Option<ChallengeDoc>>;

    /// Fetch a response by public id
    async fn response_by_id(&self, id: i64) -> Result<Option<ResponseDoc>>;

    /// Append an activity row; allocates and returns its public id
    async fn create_activity(&self, activity: ActivityDoc) -> Result<i64>;

    /// Activities for a user, newest first
    async fn activities_for_user(&self, user_id: i64) -> Result<Vec<ActivityDoc>>;

    /// Look up a tag by exact name
    async fn tag_by_name(&self, name: &str) -> Result<Option<TagDoc>>;

    /// Atomically fetch the tag with this name, creating it if missing.
    /// Concurrent calls for the same new name yield one row.
    async fn get_or_create_tag(&self, name: &str) -> Result<TagDoc>;
}
