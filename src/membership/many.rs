//! Many-to-many membership through the `user_groups` join table.

use std::sync::Arc;

use async_trait::async_trait;

use super::{MembershipStrategy, already_member, not_member};
use crate::error::Result;
use crate::model::{GroupId, UserId};
use crate::store::{Store, StoreError};

pub struct ManyToMany {
    store: Arc<dyn Store>,
}

impl ManyToMany {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MembershipStrategy for ManyToMany {
    async fn is_member(&self, user: UserId, group: GroupId) -> Result<bool> {
        Ok(self.store.find_membership(user, group).await?.is_some())
    }

    async fn groups_of(&self, user: UserId) -> Result<Vec<GroupId>> {
        Ok(self.store.groups_of(user).await?)
    }

    async fn join(&self, user: UserId, group: GroupId) -> Result<()> {
        if self.is_member(user, group).await? {
            return Err(already_member());
        }

        // A concurrent join can still win between the check and the insert.
        match self.store.insert_user_group(user, group).await {
            Ok(_) => Ok(()),
            Err(StoreError::Unique { .. }) => Err(already_member()),
            Err(err) => Err(err.into()),
        }
    }

    async fn leave(&self, user: UserId, group: GroupId) -> Result<()> {
        if self.store.delete_membership(user, group).await? {
            Ok(())
        } else {
            Err(not_member())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::membership::tests::fixture;
    use crate::membership::{ALREADY_MEMBER, NOT_MEMBER};
    use crate::store::UserGroupRepository;

    #[tokio::test]
    async fn test_join_twice_conflicts() {
        let (store, group, alice, _) = fixture().await;
        let strategy = ManyToMany::new(store.clone());

        strategy.join(alice.id, group.id).await.unwrap();
        let err = strategy.join(alice.id, group.id).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict { code: ALREADY_MEMBER, .. }));

        let rows = store.list_user_groups().await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_without_join_conflicts() {
        let (store, group, alice, _) = fixture().await;
        let strategy = ManyToMany::new(store.clone());

        let err = strategy.leave(alice.id, group.id).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict { code: NOT_MEMBER, .. }));
        assert!(store.list_user_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_join_then_leave() {
        let (store, group, alice, bob) = fixture().await;
        let strategy = ManyToMany::new(store);

        strategy.join(alice.id, group.id).await.unwrap();
        strategy.join(bob.id, group.id).await.unwrap();
        assert_eq!(strategy.groups_of(alice.id).await.unwrap(), vec![group.id]);

        strategy.leave(alice.id, group.id).await.unwrap();
        assert!(!strategy.is_member(alice.id, group.id).await.unwrap());
        assert!(strategy.is_member(bob.id, group.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_joins_have_one_winner() {
        let (store, group, alice, _) = fixture().await;
        let strategy = Arc::new(ManyToMany::new(store.clone()));
        let (user, group) = (alice.id, group.id);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let strategy = Arc::clone(&strategy);
                tokio::spawn(async move { strategy.join(user, group).await })
            })
            .collect();

        let mut joined = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => joined += 1,
                Err(ServerError::Conflict { code, .. }) => assert_eq!(code, ALREADY_MEMBER),
                Err(err) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!(joined, 1);
        assert_eq!(store.list_user_groups().await.unwrap().len(), 1);
    }
}
