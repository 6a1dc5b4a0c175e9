//! Typed client for the SkillForge API
//!
//! The pieces a server-rendered frontend calls into: a reqwest-based API
//! client, envelope normalization, query encoding, and cookie session
//! handling with the navigation guard.

pub mod api;
pub mod normalize;
pub mod query;
pub mod session;
pub mod types;

pub use api::{ApiClient, API_URL_ENV, DEFAULT_API_URL};
pub use normalize::{flatten, flatten_collection};
pub use query::to_query_string;
pub use session::{route_guard, GuardDecision, Session, SessionCookie, SESSION_COOKIE};
