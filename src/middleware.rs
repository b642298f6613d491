//! Resolve the caller of a request.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::AppState;
use crate::error::ServerError;
use crate::model::UserId;
use crate::permission::Principal;
use crate::store::UserRepository;

const BEARER: &str = "Bearer ";

/// The principal comes from the `Authorization` header.
///
/// Without the header the caller is anonymous and left for the policy to
/// deny. A header that does not resolve to a known user is rejected.
impl FromRequestParts<AppState> for Principal {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(Principal::anonymous());
        };

        let token = value
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix(BEARER))
            .ok_or(ServerError::Unauthorized)?;

        let claims = state.token.decode(token).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            ServerError::Unauthorized
        })?;
        let id: UserId = claims.sub.parse().map_err(|_| ServerError::Unauthorized)?;

        // Role flags are always read fresh from the store.
        let user = state
            .store
            .find_user(id)
            .await?
            .ok_or(ServerError::Unauthorized)?;

        Ok(Principal::user(user.id, user.is_staff, user.is_superuser))
    }
}
