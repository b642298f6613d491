use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{GroupId, UserId};

/// User as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    #[validate(
        custom(function = "crate::validate::validate_not_blank"),
        length(max = 150, code = "max_length", message = "Username must be at most 150 characters long.")
    )]
    pub username: String,
    #[validate(email(code = "invalid", message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(max = 100, code = "max_length"))]
    pub first_name: String,
    #[validate(length(max = 100, code = "max_length"))]
    pub last_name: String,
    #[validate(custom(function = "crate::validate::validate_matricola"))]
    pub matricola: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// Single group of the legacy membership model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Create a regular user, not persisted yet.
    pub fn new(
        username: String,
        email: String,
        first_name: String,
        last_name: String,
        matricola: String,
    ) -> Self {
        Self {
            id: UserId::default(),
            username,
            email: email.to_lowercase(),
            first_name,
            last_name,
            matricola,
            is_staff: false,
            is_superuser: false,
            group_id: None,
            date_joined: Utc::now(),
        }
    }
}

/// Body of `POST /auth/registration` and `POST /users`.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UserBody {
    #[validate(
        required(code = "null", message = "This field is required."),
        custom(function = "crate::validate::validate_not_blank"),
        length(max = 150, code = "max_length", message = "Username must be at most 150 characters long.")
    )]
    pub username: Option<String>,
    #[validate(
        required(code = "null", message = "This field is required."),
        email(code = "invalid", message = "Email must be formatted.")
    )]
    pub email: Option<String>,
    #[validate(
        required(code = "null", message = "This field is required."),
        custom(function = "crate::validate::validate_not_blank"),
        length(max = 100, code = "max_length")
    )]
    pub first_name: Option<String>,
    #[validate(
        required(code = "null", message = "This field is required."),
        custom(function = "crate::validate::validate_not_blank"),
        length(max = 100, code = "max_length")
    )]
    pub last_name: Option<String>,
    #[validate(
        required(code = "null", message = "This field is required."),
        custom(function = "crate::validate::validate_matricola")
    )]
    pub matricola: Option<String>,
}

impl UserBody {
    /// Build a regular [`User`] from a validated body.
    pub fn into_user(self) -> User {
        User::new(
            self.username.unwrap_or_default(),
            self.email.unwrap_or_default(),
            self.first_name.unwrap_or_default(),
            self.last_name.unwrap_or_default(),
            self.matricola.unwrap_or_default(),
        )
    }
}

/// Partial update of a [`User`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub matricola: Option<String>,
}

impl UserPatch {
    /// Merge into `user`.
    ///
    /// Self-service updates leave matricola as it is.
    pub fn apply(self, user: &mut User, self_service: bool) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email.to_lowercase();
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }

        if let Some(matricola) = self.matricola.filter(|_| !self_service) {
            user.matricola = matricola;
        }
    }
}

/// Public view of a [`User`]. Role flags and membership stay server-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub matricola: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            matricola: user.matricola,
        }
    }
}
