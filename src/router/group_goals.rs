//! Goals assigned to groups.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::model::{GroupGoal, GroupGoalBody};
use crate::permission::{Action, MembershipKind, Principal, Resource};
use crate::router::{authorize, partial, valid};
use crate::scope::{self, GroupScope};
use crate::store::GroupGoalRepository;

const ENTITY: &str = "group goal";
const RESOURCE: Resource = Resource::Membership(MembershipKind::GroupGoal);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(retrieve).patch(update).delete(destroy))
}

async fn list(State(state): State<AppState>, principal: Principal) -> Result<Json<Vec<GroupGoal>>> {
    authorize(&principal, Action::List, RESOURCE)?;

    let scope = GroupScope::of(&principal, state.membership.as_ref()).await?;
    let records = state.store.list_group_goals().await?;
    Ok(Json(scope::group_goals(records, &scope)))
}

async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Bytes,
) -> Result<(StatusCode, Json<GroupGoal>)> {
    authorize(&principal, Action::Create, RESOURCE)?;

    let body: GroupGoalBody = valid(&body)?;
    let record = state.store.insert_group_goal(&body.into_group_goal()).await?;
    tracing::info!(group = record.group, goal = record.goal, "goal assigned");

    Ok((StatusCode::CREATED, Json(record)))
}

async fn retrieve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<GroupGoal>> {
    authorize(&principal, Action::Retrieve, RESOURCE)?;

    let record = state.store.find_group_goal(id).await?;
    Ok(Json(record.ok_or(ServerError::NotFound { entity: ENTITY })?))
}

async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<GroupGoal>> {
    authorize(&principal, Action::Update, RESOURCE)?;

    let mut record = state
        .store
        .find_group_goal(id)
        .await?
        .ok_or(ServerError::NotFound { entity: ENTITY })?;
    partial::<GroupGoalBody>(&body)?.apply(&mut record);

    if state.store.update_group_goal(&record).await? {
        Ok(Json(record))
    } else {
        Err(ServerError::NotFound { entity: ENTITY })
    }
}

async fn destroy(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    authorize(&principal, Action::Delete, RESOURCE)?;

    if state.store.delete_group_goal(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound { entity: ENTITY })
    }
}
