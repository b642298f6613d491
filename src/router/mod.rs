//! HTTP handlers.
//!
//! Bodies are read as raw bytes and parsed only after the caller has been
//! authorized, so an anonymous or forbidden request never sees a validation
//! error.

pub mod goals;
pub mod group_goals;
pub mod group_users;
pub mod groups;
pub mod registration;
pub mod status;
pub mod topics;
pub mod users;

use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::Result;
use crate::permission::{Action, Decision, Principal, Resource, decide};

/// Run the policy and turn a deny into an error.
pub(crate) fn authorize(principal: &Principal, action: Action, resource: Resource) -> Result<()> {
    let decision = decide(principal, action, resource);
    if let Decision::Deny(reason) = &decision {
        tracing::debug!(
            user = principal.id,
            ?action,
            ?resource,
            reason = reason.code(),
            "request denied"
        );
    }
    decision.enforce()
}

/// Parse a creation body and run its validators.
pub(crate) fn valid<T>(body: &[u8]) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let Json(value) = Json::<T>::from_bytes(body)?;
    value.validate()?;
    Ok(value)
}

/// Parse a partial update body.
///
/// Validation is left to the caller, on the merged entity.
pub(crate) fn partial<T>(body: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let Json(value) = Json::<T>::from_bytes(body)?;
    Ok(value)
}
