//! Database schemas for SkillForge
//!
//! Defines MongoDB document structures for the content types: users,
//! challenges, responses, activities, tags and badges.

mod activity;
mod badge;
mod challenge;
mod metadata;
mod response;
mod tag;
mod user;

pub use activity::{ActivityDoc, ActivityType, ACTIVITY_COLLECTION};
pub use badge::{BadgeDoc, Gradient, BADGE_COLLECTION};
pub use challenge::{Category, ChallengeDoc, Difficulty, CHALLENGE_COLLECTION};
pub use metadata::Metadata;
pub use response::{ResponseDoc, RESPONSE_COLLECTION};
pub use tag::{TagDoc, TAG_COLLECTION};
pub use user::{Specialty, UserDoc, UserType, USER_COLLECTION};
