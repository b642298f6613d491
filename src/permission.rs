//! Access control decisions.
//!
//! [`decide`] is a pure function: every fact it needs (caller flags, caller
//! relation to a group) is resolved beforehand and passed in.

use crate::model::UserId;

/// Authenticated caller, or anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub is_staff: bool,
    pub is_superuser: bool,
    authenticated: bool,
}

impl Principal {
    /// Caller without valid credentials.
    pub const fn anonymous() -> Self {
        Self {
            id: 0,
            is_staff: false,
            is_superuser: false,
            authenticated: false,
        }
    }

    /// Caller resolved from a valid token.
    pub const fn user(id: UserId, is_staff: bool, is_superuser: bool) -> Self {
        Self {
            id,
            is_staff,
            is_superuser,
            authenticated: true,
        }
    }

    #[inline]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Staff and superusers bypass every rule.
    #[inline]
    pub const fn is_admin(&self) -> bool {
        self.authenticated && (self.is_staff || self.is_superuser)
    }
}

/// What the caller wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
    /// Join a group, optionally naming the user to add.
    Join { user: Option<UserId> },
    Leave,
    /// Read own user record.
    Me,
    /// Update own user record.
    UpdateMe,
}

impl Action {
    #[inline]
    pub const fn is_safe(&self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }

    #[inline]
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Action::Create | Action::Update | Action::Delete)
    }
}

/// Caller position relative to one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Member,
    Stranger,
}

impl From<bool> for Relation {
    fn from(is_member: bool) -> Self {
        if is_member {
            Relation::Member
        } else {
            Relation::Stranger
        }
    }
}

/// Join tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipKind {
    /// Goal assigned to a group.
    GroupGoal,
    /// User belonging to a group.
    UserGroup,
}

/// Resource targeted by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Topic,
    Goal,
    /// `None` when acting on the collection.
    Group(Option<Relation>),
    Membership(MembershipKind),
    User,
}

/// Why a request is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    StaffOnly,
    NotGroupMember,
    OnBehalfOfAnotherUser,
    /// Legacy single-group model has no self-service leave.
    AdminRequired,
    Unsupported,
}

impl DenyReason {
    /// Stable code sent to clients.
    pub const fn code(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "not_authenticated",
            DenyReason::StaffOnly => "staff_only",
            DenyReason::NotGroupMember => "not_group_member",
            DenyReason::OnBehalfOfAnotherUser => "not_self",
            DenyReason::AdminRequired => "admin_required",
            DenyReason::Unsupported => "permission_denied",
        }
    }

    pub const fn message(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "Authentication credentials were not provided.",
            DenyReason::StaffOnly => "Only staff members can perform this action.",
            DenyReason::NotGroupMember => "Only members of this group can modify it.",
            DenyReason::OnBehalfOfAnotherUser => "You cannot act on behalf of another user.",
            DenyReason::AdminRequired => "Changing group requires an administrator.",
            DenyReason::Unsupported => "You do not have permission to perform this action.",
        }
    }
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    #[inline]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Turn a deny into the matching [`ServerError`](crate::error::ServerError).
    pub fn enforce(self) -> crate::error::Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => {
                Err(crate::error::ServerError::Unauthorized)
            },
            Decision::Deny(reason) => {
                Err(crate::error::ServerError::Forbidden(reason))
            },
        }
    }
}

/// Decide whether `principal` may perform `action` on `resource`.
///
/// Rules are evaluated in order and the first match wins.
pub fn decide(principal: &Principal, action: Action, resource: Resource) -> Decision {
    if !principal.is_authenticated() {
        return Decision::Deny(DenyReason::Unauthenticated);
    }

    if principal.is_admin() {
        return Decision::Allow;
    }

    match (resource, action) {
        (
            Resource::Topic | Resource::Goal | Resource::Group(_) | Resource::Membership(_),
            action,
        ) if action.is_safe() => Decision::Allow,

        // Admin-curated catalog.
        (Resource::Topic | Resource::Goal | Resource::Membership(_), action)
            if action.is_mutation() =>
        {
            Decision::Deny(DenyReason::StaffOnly)
        },

        (Resource::Group(_), Action::Create) => Decision::Allow,
        (Resource::Group(relation), Action::Update | Action::Delete) => match relation {
            Some(Relation::Member) => Decision::Allow,
            Some(Relation::Stranger) | None => Decision::Deny(DenyReason::NotGroupMember),
        },
        (Resource::Group(_), Action::Join { user }) => match user {
            Some(user) if user != principal.id => {
                Decision::Deny(DenyReason::OnBehalfOfAnotherUser)
            },
            _ => Decision::Allow,
        },
        (Resource::Group(_), Action::Leave) => Decision::Allow,

        (
            Resource::User,
            Action::List | Action::Retrieve | Action::Me | Action::UpdateMe,
        ) => Decision::Allow,
        (Resource::User, action) if action.is_mutation() => {
            Decision::Deny(DenyReason::StaffOnly)
        },

        _ => Decision::Deny(DenyReason::Unsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [Action; 9] = [
        Action::List,
        Action::Retrieve,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Join { user: None },
        Action::Leave,
        Action::Me,
        Action::UpdateMe,
    ];

    const ALL_RESOURCES: [Resource; 8] = [
        Resource::Topic,
        Resource::Goal,
        Resource::Group(None),
        Resource::Group(Some(Relation::Member)),
        Resource::Group(Some(Relation::Stranger)),
        Resource::Membership(MembershipKind::GroupGoal),
        Resource::Membership(MembershipKind::UserGroup),
        Resource::User,
    ];

    fn member() -> Principal {
        Principal::user(7, false, false)
    }

    #[test]
    fn test_anonymous_is_always_denied() {
        let anonymous = Principal::anonymous();
        for resource in ALL_RESOURCES {
            for action in ALL_ACTIONS {
                assert_eq!(
                    decide(&anonymous, action, resource),
                    Decision::Deny(DenyReason::Unauthenticated),
                    "{action:?} on {resource:?}"
                );
            }
        }
    }

    #[test]
    fn test_staff_and_superuser_are_always_allowed() {
        for admin in [Principal::user(1, true, false), Principal::user(2, false, true)] {
            for resource in ALL_RESOURCES {
                for action in ALL_ACTIONS {
                    assert!(decide(&admin, action, resource).is_allowed());
                }
            }
        }
    }

    #[test]
    fn test_reads_are_open_to_authenticated_users() {
        for resource in ALL_RESOURCES {
            assert!(decide(&member(), Action::List, resource).is_allowed());
            assert!(decide(&member(), Action::Retrieve, resource).is_allowed());
        }
    }

    #[test]
    fn test_catalog_mutations_are_staff_only() {
        let catalog = [
            Resource::Topic,
            Resource::Goal,
            Resource::Membership(MembershipKind::GroupGoal),
            Resource::Membership(MembershipKind::UserGroup),
            Resource::User,
        ];
        for resource in catalog {
            for action in [Action::Create, Action::Update, Action::Delete] {
                assert_eq!(
                    decide(&member(), action, resource),
                    Decision::Deny(DenyReason::StaffOnly)
                );
            }
        }
    }

    #[test]
    fn test_group_creation_is_self_service() {
        assert!(decide(&member(), Action::Create, Resource::Group(None)).is_allowed());
    }

    #[test]
    fn test_group_mutation_requires_membership() {
        for action in [Action::Update, Action::Delete] {
            assert!(
                decide(&member(), action, Resource::Group(Some(Relation::Member))).is_allowed()
            );
            assert_eq!(
                decide(&member(), action, Resource::Group(Some(Relation::Stranger))),
                Decision::Deny(DenyReason::NotGroupMember)
            );
            assert_eq!(
                decide(&member(), action, Resource::Group(None)),
                Decision::Deny(DenyReason::NotGroupMember)
            );
        }
    }

    #[test]
    fn test_join_only_for_self() {
        let group = Resource::Group(Some(Relation::Stranger));
        assert!(decide(&member(), Action::Join { user: None }, group).is_allowed());
        assert!(decide(&member(), Action::Join { user: Some(7) }, group).is_allowed());
        assert_eq!(
            decide(&member(), Action::Join { user: Some(8) }, group),
            Decision::Deny(DenyReason::OnBehalfOfAnotherUser)
        );
        assert!(decide(&member(), Action::Leave, group).is_allowed());
    }

    #[test]
    fn test_self_service_user_paths() {
        assert!(decide(&member(), Action::Me, Resource::User).is_allowed());
        assert!(decide(&member(), Action::UpdateMe, Resource::User).is_allowed());
    }

    #[test]
    fn test_unsupported_combinations_are_denied() {
        assert_eq!(
            decide(&member(), Action::Join { user: None }, Resource::Topic),
            Decision::Deny(DenyReason::Unsupported)
        );
        assert_eq!(
            decide(&member(), Action::Me, Resource::Group(None)),
            Decision::Deny(DenyReason::Unsupported)
        );
        assert_eq!(
            decide(&member(), Action::Leave, Resource::User),
            Decision::Deny(DenyReason::Unsupported)
        );
    }

    #[test]
    fn test_enforce_maps_to_errors() {
        use crate::error::ServerError;

        assert!(Decision::Allow.enforce().is_ok());
        assert!(matches!(
            Decision::Deny(DenyReason::Unauthenticated).enforce(),
            Err(ServerError::Unauthorized)
        ));
        assert!(matches!(
            Decision::Deny(DenyReason::StaffOnly).enforce(),
            Err(ServerError::Forbidden(DenyReason::StaffOnly))
        ));
    }
}
