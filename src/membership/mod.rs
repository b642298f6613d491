//! Membership state machine.
//!
//! A (user, group) pair is either `NotMember` or `Member`. How the pair is
//! persisted depends on the [`MembershipStrategy`] selected at startup.

mod many;
mod single;

pub use many::ManyToMany;
pub use single::SingleGroup;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::model::{GroupId, UserId};
use crate::permission::{DenyReason, Principal};
use crate::store::Store;

pub const ALREADY_MEMBER: &str = "already_member";
pub const NOT_MEMBER: &str = "not_member";
pub const ALREADY_IN_GROUP: &str = "already_in_group";

/// Membership model selected in configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipModel {
    /// Users may belong to any number of groups.
    #[default]
    ManyToMany,
    /// Legacy: at most one group per user, no self-service leave.
    SingleGroup,
}

/// Persistence of group membership.
#[async_trait]
pub trait MembershipStrategy: Send + Sync {
    /// Whether `user` currently belongs to `group`.
    async fn is_member(&self, user: UserId, group: GroupId) -> Result<bool>;

    /// Every group `user` currently belongs to.
    async fn groups_of(&self, user: UserId) -> Result<Vec<GroupId>>;

    /// `NotMember -> Member`.
    async fn join(&self, user: UserId, group: GroupId) -> Result<()>;

    /// `Member -> NotMember`.
    async fn leave(&self, user: UserId, group: GroupId) -> Result<()>;
}

/// Build the strategy for `model` on top of `store`.
pub fn strategy(model: MembershipModel, store: Arc<dyn Store>) -> Arc<dyn MembershipStrategy> {
    match model {
        MembershipModel::ManyToMany => Arc::new(ManyToMany::new(store)),
        MembershipModel::SingleGroup => Arc::new(SingleGroup::new(store)),
    }
}

/// Add the caller to `group`.
///
/// `user`, when given, must be the caller: nobody can add someone else, not
/// even staff. This is checked before the state precondition.
pub async fn join(
    strategy: &dyn MembershipStrategy,
    principal: &Principal,
    group: GroupId,
    user: Option<UserId>,
) -> Result<()> {
    if user.is_some_and(|user| user != principal.id) {
        tracing::debug!(caller = principal.id, ?user, group, "refused join on behalf of another user");
        return Err(ServerError::Forbidden(DenyReason::OnBehalfOfAnotherUser));
    }

    strategy.join(principal.id, group).await?;
    tracing::info!(user = principal.id, group, "user joined group");
    metrics::counter!("membership_transitions_total", "transition" => "join").increment(1);
    Ok(())
}

/// Remove the caller from `group`.
pub async fn leave(
    strategy: &dyn MembershipStrategy,
    principal: &Principal,
    group: GroupId,
) -> Result<()> {
    strategy.leave(principal.id, group).await?;
    tracing::info!(user = principal.id, group, "user left group");
    metrics::counter!("membership_transitions_total", "transition" => "leave").increment(1);
    Ok(())
}

fn already_member() -> ServerError {
    ServerError::conflict(ALREADY_MEMBER, "You are already a member of this group.")
}

fn not_member() -> ServerError {
    ServerError::conflict(NOT_MEMBER, "You are not a member of this group.")
}
