//! Persistence ports between the HTTP layer and the backends.
//!
//! Uniqueness and restrict-on-delete are enforced by the backend, which is
//! the authority when concurrent writes conflict.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{DEFAULT_CREDENTIALS, DEFAULT_DATABASE_NAME, DEFAULT_POOL_SIZE, PgStore};

use async_trait::async_trait;

use crate::model::*;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate value for {field}")]
    Unique { field: &'static str },
    #[error("{entity} is still referenced")]
    Protected { entity: &'static str },
    #[error("{field} references a missing record")]
    MissingReference { field: &'static str },
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;
    async fn insert_user(&self, user: &User) -> Result<User>;
    /// Returns `false` when no such user exists.
    async fn update_user(&self, user: &User) -> Result<bool>;
    async fn delete_user(&self, id: UserId) -> Result<bool>;
    /// Set the legacy single group only if the user has none yet.
    async fn claim_user_group(&self, id: UserId, group: GroupId) -> Result<bool>;
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    async fn list_topics(&self) -> Result<Vec<Topic>>;
    async fn find_topic(&self, id: TopicId) -> Result<Option<Topic>>;
    async fn insert_topic(&self, topic: &Topic) -> Result<Topic>;
    async fn update_topic(&self, topic: &Topic) -> Result<bool>;
    async fn delete_topic(&self, id: TopicId) -> Result<bool>;
}

#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn list_goals(&self) -> Result<Vec<Goal>>;
    async fn find_goal(&self, id: GoalId) -> Result<Option<Goal>>;
    async fn insert_goal(&self, goal: &Goal) -> Result<Goal>;
    async fn update_goal(&self, goal: &Goal) -> Result<bool>;
    async fn delete_goal(&self, id: GoalId) -> Result<bool>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<Group>>;
    async fn find_group(&self, id: GroupId) -> Result<Option<Group>>;
    async fn insert_group(&self, group: &Group) -> Result<Group>;
    async fn update_group(&self, group: &Group) -> Result<bool>;
    async fn delete_group(&self, id: GroupId) -> Result<bool>;
}

#[async_trait]
pub trait GroupGoalRepository: Send + Sync {
    async fn list_group_goals(&self) -> Result<Vec<GroupGoal>>;
    async fn find_group_goal(&self, id: i64) -> Result<Option<GroupGoal>>;
    async fn insert_group_goal(&self, record: &GroupGoal) -> Result<GroupGoal>;
    async fn update_group_goal(&self, record: &GroupGoal) -> Result<bool>;
    async fn delete_group_goal(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait UserGroupRepository: Send + Sync {
    async fn list_user_groups(&self) -> Result<Vec<UserGroup>>;
    async fn find_user_group(&self, id: i64) -> Result<Option<UserGroup>>;
    /// Fails with [`StoreError::Unique`] when the pair already exists.
    async fn insert_user_group(&self, user: UserId, group: GroupId) -> Result<UserGroup>;
    async fn update_user_group(&self, record: &UserGroup) -> Result<bool>;
    async fn delete_user_group(&self, id: i64) -> Result<bool>;
    async fn find_membership(&self, user: UserId, group: GroupId) -> Result<Option<UserGroup>>;
    /// Returns `false` when the pair did not exist.
    async fn delete_membership(&self, user: UserId, group: GroupId) -> Result<bool>;
    async fn groups_of(&self, user: UserId) -> Result<Vec<GroupId>>;
}

/// Every repository a backend must provide.
pub trait Store:
    UserRepository
    + TopicRepository
    + GoalRepository
    + GroupRepository
    + GroupGoalRepository
    + UserGroupRepository
{
}

impl<T> Store for T where
    T: UserRepository
        + TopicRepository
        + GoalRepository
        + GroupRepository
        + GroupGoalRepository
        + UserGroupRepository
{
}
