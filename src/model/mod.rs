//! Persisted entities and their request bodies.

mod goal;
mod group;
mod membership;
mod topic;
mod user;

pub use goal::*;
pub use group::*;
pub use membership::*;
pub use topic::*;
pub use user::*;

pub type UserId = i64;
pub type TopicId = i64;
pub type GoalId = i64;
pub type GroupId = i64;

/// Default value of every group link.
pub const DEFAULT_LINK: &str = "https://example.com";
