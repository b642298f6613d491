//! Users-related HTTP API.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::model::{User, UserBody, UserId, UserPatch, UserProfile};
use crate::permission::{Action, Principal, Resource};
use crate::router::{authorize, partial, valid};
use crate::scope;
use crate::store::UserRepository;

const ENTITY: &str = "user";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        // `GET /users/me` goes to `me`. `PATCH` updates the caller.
        .route("/me", get(me).patch(update_me))
        .route("/{id}", get(retrieve).patch(update).delete(destroy))
}

async fn find(state: &AppState, id: UserId) -> Result<User> {
    state
        .store
        .find_user(id)
        .await?
        .ok_or(ServerError::NotFound { entity: ENTITY })
}

/// Merge `body` into the stored user and save it.
async fn save(
    state: &AppState,
    mut user: User,
    body: &[u8],
    self_service: bool,
) -> Result<UserProfile> {
    partial::<UserPatch>(body)?.apply(&mut user, self_service);
    user.validate()?;

    if state.store.update_user(&user).await? {
        Ok(user.into())
    } else {
        Err(ServerError::NotFound { entity: ENTITY })
    }
}

async fn list(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<UserProfile>>> {
    authorize(&principal, Action::List, Resource::User)?;

    let users = scope::users(state.store.list_users().await?);
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Bytes,
) -> Result<(StatusCode, Json<UserProfile>)> {
    authorize(&principal, Action::Create, Resource::User)?;

    let body: UserBody = valid(&body)?;
    let user = state.store.insert_user(&body.into_user()).await?;
    tracing::info!(user = user.id, by = principal.id, "user created");

    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn me(State(state): State<AppState>, principal: Principal) -> Result<Json<UserProfile>> {
    authorize(&principal, Action::Me, Resource::User)?;
    Ok(Json(find(&state, principal.id).await?.into()))
}

async fn update_me(
    State(state): State<AppState>,
    principal: Principal,
    body: Bytes,
) -> Result<Json<UserProfile>> {
    authorize(&principal, Action::UpdateMe, Resource::User)?;

    let user = find(&state, principal.id).await?;
    Ok(Json(save(&state, user, &body, true).await?))
}

async fn retrieve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>> {
    authorize(&principal, Action::Retrieve, Resource::User)?;
    Ok(Json(find(&state, id).await?.into()))
}

async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<UserId>,
    body: Bytes,
) -> Result<Json<UserProfile>> {
    authorize(&principal, Action::Update, Resource::User)?;

    let user = find(&state, id).await?;
    Ok(Json(save(&state, user, &body, false).await?))
}

async fn destroy(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    authorize(&principal, Action::Delete, Resource::User)?;

    if state.store.delete_user(id).await? {
        tracing::info!(user = id, by = principal.id, "user deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound { entity: ENTITY })
    }
}
