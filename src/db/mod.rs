//! MongoDB persistence layer

pub mod mongo;
pub mod schemas;
pub mod sequence;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
