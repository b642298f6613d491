//! Narrow listings to what the caller may see.

use crate::error::Result;
use crate::membership::MembershipStrategy;
use crate::model::{GroupGoal, GroupId, User};
use crate::permission::Principal;

/// Groups whose records a caller can list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupScope {
    /// No narrowing.
    All,
    /// Only records belonging to these groups.
    Groups(Vec<GroupId>),
}

impl GroupScope {
    /// Scope of group goal listings for `principal`.
    ///
    /// Staff see everything. Anyone else is narrowed to their groups, unless
    /// they belong to none.
    pub async fn of(principal: &Principal, membership: &dyn MembershipStrategy) -> Result<Self> {
        if principal.is_admin() {
            return Ok(Self::All);
        }

        let groups = membership.groups_of(principal.id).await?;
        if groups.is_empty() {
            Ok(Self::All)
        } else {
            Ok(Self::Groups(groups))
        }
    }

    pub fn contains(&self, group: GroupId) -> bool {
        match self {
            Self::All => true,
            Self::Groups(groups) => groups.contains(&group),
        }
    }
}

/// Superusers never appear in user listings, whoever asks.
pub fn users(users: Vec<User>) -> Vec<User> {
    users.into_iter().filter(|user| !user.is_superuser).collect()
}

pub fn group_goals(records: Vec<GroupGoal>, scope: &GroupScope) -> Vec<GroupGoal> {
    match scope {
        GroupScope::All => records,
        GroupScope::Groups(_) => records
            .into_iter()
            .filter(|record| scope.contains(record.group))
            .collect(),
    }
}
