//! Error handler for gpm.

use std::borrow::Cow;

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::permission::DenyReason;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error("authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("{}", .0.message())]
    Forbidden(DenyReason),

    #[error("{reason}")]
    Conflict { code: &'static str, reason: String },

    #[error("a record with this {field} already exists")]
    Unique { field: &'static str },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("internal server error, {details}")]
    Internal {
        details: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ServerError {
    /// Conflict caused by a state precondition.
    pub fn conflict(code: &'static str, reason: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            reason: reason.into(),
        }
    }

    /// Wrap an unexpected failure.
    pub fn internal<E>(details: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            details: details.into(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unique { field } => ServerError::Unique { field },
            StoreError::Protected { entity } => ServerError::conflict(
                "protected",
                format!("{entity} is still referenced and cannot be deleted"),
            ),
            StoreError::MissingReference { field } => {
                let mut errors = ValidationErrors::new();
                errors.add(
                    field,
                    ValidationError::new("does_not_exist")
                        .with_message(Cow::from("Referenced object does not exist.")),
                );
                ServerError::Validation(errors)
            },
            StoreError::Sql(err) => ServerError::Sql(err),
        }
    }
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Update `type` field with a stable, machine readable code.
    pub fn kind(mut self, kind: &str) -> Self {
        self.r#type = Some(kind.into());
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Add a single field error.
    fn field(mut self, field: &str, code: &str, message: &str) -> Self {
        self.errors = Some(vec![FieldError {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }]);
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(
        self,
    ) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    code: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                code: issue.code.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| issue.to_string()),
            })
        })
        .collect();
    // HashMap order is random.
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .title("There were validation errors with your request.")
            .details(&self.to_string())
            .status(StatusCode::BAD_REQUEST);

        let response = match &self {
            ServerError::Validation(validation_errors) => {
                response.kind("invalid").errors(validation_errors)
            },

            ServerError::Json(rejection) => response
                .title("Request body could not be parsed.")
                .kind("parse_error")
                .details(&rejection.body_text())
                .status(rejection.status()),

            ServerError::Unauthorized => response
                .title("Missing or invalid 'Authorization' header.")
                .kind("not_authenticated")
                .status(StatusCode::UNAUTHORIZED),

            ServerError::Forbidden(reason) => response
                .title("You do not have permission to perform this action.")
                .kind(reason.code())
                .status(StatusCode::FORBIDDEN),

            ServerError::Conflict { code, .. } => response
                .title("The request conflicts with the current state.")
                .kind(code)
                .status(StatusCode::CONFLICT),

            ServerError::Unique { field } => response
                .title("The request conflicts with the current state.")
                .kind("unique")
                .field(field, "unique", &self.to_string())
                .status(StatusCode::CONFLICT),

            ServerError::NotFound { .. } => response
                .title("Not found.")
                .kind("not_found")
                .status(StatusCode::NOT_FOUND),

            ServerError::Sql(err) => {
                tracing::error!(error = %err, "database request failed");
                ResponseError::default()
            },

            ServerError::Internal { details, source } => {
                tracing::error!(err = ?source, %details, "server returned 500 status");
                ResponseError::default()
            },
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
