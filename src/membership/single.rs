//! Legacy membership: one nullable group reference per user.
//!
//! Joining is only possible while the reference is empty and there is no
//! self-service leave; moving a user requires an administrator.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ALREADY_IN_GROUP, MembershipStrategy, already_member};
use crate::error::{Result, ServerError};
use crate::model::{GroupId, UserId};
use crate::permission::DenyReason;
use crate::store::Store;

pub struct SingleGroup {
    store: Arc<dyn Store>,
}

impl SingleGroup {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn current_group(&self, user: UserId) -> Result<Option<GroupId>> {
        let user = self
            .store
            .find_user(user)
            .await?
            .ok_or(ServerError::NotFound { entity: "user" })?;
        Ok(user.group_id)
    }
}

#[async_trait]
impl MembershipStrategy for SingleGroup {
    async fn is_member(&self, user: UserId, group: GroupId) -> Result<bool> {
        Ok(self.current_group(user).await? == Some(group))
    }

    async fn groups_of(&self, user: UserId) -> Result<Vec<GroupId>> {
        Ok(self.current_group(user).await?.into_iter().collect())
    }

    async fn join(&self, user: UserId, group: GroupId) -> Result<()> {
        if self.store.claim_user_group(user, group).await? {
            return Ok(());
        }

        match self.current_group(user).await? {
            Some(current) if current == group => Err(already_member()),
            _ => Err(ServerError::conflict(
                ALREADY_IN_GROUP,
                "You already belong to another group.",
            )),
        }
    }

    async fn leave(&self, _user: UserId, _group: GroupId) -> Result<()> {
        Err(ServerError::Forbidden(DenyReason::AdminRequired))
    }
}
