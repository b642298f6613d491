//! Goal catalog, curated by staff.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::model::{Goal, GoalBody, GoalId};
use crate::permission::{Action, Principal, Resource};
use crate::router::{authorize, partial, valid};
use crate::store::GoalRepository;

const ENTITY: &str = "goal";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(retrieve).patch(update).delete(destroy))
}

async fn list(State(state): State<AppState>, principal: Principal) -> Result<Json<Vec<Goal>>> {
    authorize(&principal, Action::List, Resource::Goal)?;
    Ok(Json(state.store.list_goals().await?))
}

async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Bytes,
) -> Result<(StatusCode, Json<Goal>)> {
    authorize(&principal, Action::Create, Resource::Goal)?;

    let body: GoalBody = valid(&body)?;
    let goal = state.store.insert_goal(&body.into_goal()).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

async fn retrieve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<GoalId>,
) -> Result<Json<Goal>> {
    authorize(&principal, Action::Retrieve, Resource::Goal)?;

    let goal = state.store.find_goal(id).await?;
    Ok(Json(goal.ok_or(ServerError::NotFound { entity: ENTITY })?))
}

async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<GoalId>,
    body: Bytes,
) -> Result<Json<Goal>> {
    authorize(&principal, Action::Update, Resource::Goal)?;

    let mut goal = state
        .store
        .find_goal(id)
        .await?
        .ok_or(ServerError::NotFound { entity: ENTITY })?;
    partial::<GoalBody>(&body)?.apply(&mut goal);
    goal.validate()?;

    if state.store.update_goal(&goal).await? {
        Ok(Json(goal))
    } else {
        Err(ServerError::NotFound { entity: ENTITY })
    }
}

async fn destroy(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<GoalId>,
) -> Result<StatusCode> {
    authorize(&principal, Action::Delete, Resource::Goal)?;

    if state.store.delete_goal(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound { entity: ENTITY })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::membership::MembershipModel;
    use crate::*;

    fn goal(points: i32) -> serde_json::Value {
        json!({ "title": "Ship it", "description": "Deliver the first release.", "points": points })
    }

    #[tokio::test]
    async fn test_points_bounds() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, staff) = seed_user(&state, "staff", "222222", true, false).await;

        for (points, code) in [(0, "min_value"), (6, "max_value")] {
            let response = make_request(
                app(state.clone()),
                Method::POST,
                "/api/v1/goals",
                Some(&staff),
                Some(goal(points)),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let body = read_json(response).await;
            assert_eq!(body["errors"][0]["field"], "points");
            assert_eq!(body["errors"][0]["code"], code);
        }

        for points in [1, 5] {
            let response = make_request(
                app(state.clone()),
                Method::POST,
                "/api/v1/goals",
                Some(&staff),
                Some(goal(points)),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn test_patch_is_revalidated() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, staff) = seed_user(&state, "staff", "222222", true, false).await;

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/goals",
            Some(&staff),
            Some(goal(3)),
        )
        .await;
        let path = format!("/api/v1/goals/{}", read_json(response).await["id"]);

        let response = make_request(
            app(state.clone()),
            Method::PATCH,
            &path,
            Some(&staff),
            Some(json!({ "points": 9 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = make_request(app(state), Method::GET, &path, Some(&staff), None).await;
        assert_eq!(read_json(response).await["points"], 3);
    }

    #[tokio::test]
    async fn test_students_cannot_create_goals() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, student) = seed_user(&state, "student", "111111", false, false).await;

        let response = make_request(
            app(state),
            Method::POST,
            "/api/v1/goals",
            Some(&student),
            Some(goal(3)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
