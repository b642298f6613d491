use serde::{Deserialize, Serialize};
use validator::Validate;

use super::GoalId;

/// Achievement a group can be assigned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Goal {
    pub id: GoalId,
    #[validate(length(max = 100, code = "max_length", message = "Title must be at most 100 characters long."))]
    pub title: String,
    #[validate(length(max = 400, code = "max_length", message = "Description must be at most 400 characters long."))]
    pub description: String,
    #[validate(custom(function = "crate::validate::validate_points"))]
    pub points: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct GoalBody {
    #[validate(
        required(code = "null", message = "This field is required."),
        length(max = 100, code = "max_length", message = "Title must be at most 100 characters long.")
    )]
    pub title: Option<String>,
    #[validate(
        required(code = "null", message = "This field is required."),
        length(max = 400, code = "max_length", message = "Description must be at most 400 characters long.")
    )]
    pub description: Option<String>,
    #[validate(
        required(code = "null", message = "This field is required."),
        custom(function = "crate::validate::validate_points")
    )]
    pub points: Option<i32>,
}

impl GoalBody {
    pub fn into_goal(self) -> Goal {
        Goal {
            id: GoalId::default(),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            points: self.points.unwrap_or_default(),
        }
    }

    pub fn apply(self, goal: &mut Goal) {
        if let Some(title) = self.title {
            goal.title = title;
        }
        if let Some(description) = self.description {
            goal.description = description;
        }
        if let Some(points) = self.points {
            goal.points = points;
        }
    }
}
