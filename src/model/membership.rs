use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{GoalId, GroupId, UserId};

/// Goal assigned to a group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupGoal {
    pub id: i64,
    #[sqlx(rename = "group_id")]
    pub group: GroupId,
    #[sqlx(rename = "goal_id")]
    pub goal: GoalId,
    pub complete: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct GroupGoalBody {
    #[validate(required(code = "null", message = "This field is required."))]
    pub group: Option<GroupId>,
    #[validate(required(code = "null", message = "This field is required."))]
    pub goal: Option<GoalId>,
    pub complete: Option<bool>,
}

impl GroupGoalBody {
    pub fn into_group_goal(self) -> GroupGoal {
        GroupGoal {
            id: 0,
            group: self.group.unwrap_or_default(),
            goal: self.goal.unwrap_or_default(),
            complete: self.complete.unwrap_or_default(),
        }
    }

    pub fn apply(self, record: &mut GroupGoal) {
        if let Some(group) = self.group {
            record.group = group;
        }
        if let Some(goal) = self.goal {
            record.goal = goal;
        }
        if let Some(complete) = self.complete {
            record.complete = complete;
        }
    }
}

/// User belonging to a group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserGroup {
    pub id: i64,
    #[sqlx(rename = "user_id")]
    pub user: UserId,
    #[sqlx(rename = "group_id")]
    pub group: GroupId,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UserGroupBody {
    #[validate(required(code = "null", message = "This field is required."))]
    pub user: Option<UserId>,
    #[validate(required(code = "null", message = "This field is required."))]
    pub group: Option<GroupId>,
}

impl UserGroupBody {
    pub fn into_user_group(self) -> UserGroup {
        UserGroup {
            id: 0,
            user: self.user.unwrap_or_default(),
            group: self.group.unwrap_or_default(),
        }
    }

    pub fn apply(self, record: &mut UserGroup) {
        if let Some(user) = self.user {
            record.user = user;
        }
        if let Some(group) = self.group {
            record.group = group;
        }
    }
}
