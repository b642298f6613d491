//! Membership records, managed by staff.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::model::{UserGroup, UserGroupBody};
use crate::permission::{Action, MembershipKind, Principal, Resource};
use crate::router::{authorize, partial, valid};
use crate::store::UserGroupRepository;

const ENTITY: &str = "group user";
const RESOURCE: Resource = Resource::Membership(MembershipKind::UserGroup);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(retrieve).patch(update).delete(destroy))
}

async fn list(State(state): State<AppState>, principal: Principal) -> Result<Json<Vec<UserGroup>>> {
    authorize(&principal, Action::List, RESOURCE)?;
    Ok(Json(state.store.list_user_groups().await?))
}

async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Bytes,
) -> Result<(StatusCode, Json<UserGroup>)> {
    authorize(&principal, Action::Create, RESOURCE)?;

    let body: UserGroupBody = valid(&body)?;
    let record = body.into_user_group();
    let record = state.store.insert_user_group(record.user, record.group).await?;
    tracing::info!(user = record.user, group = record.group, by = principal.id, "membership created");

    Ok((StatusCode::CREATED, Json(record)))
}

async fn retrieve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<UserGroup>> {
    authorize(&principal, Action::Retrieve, RESOURCE)?;

    let record = state.store.find_user_group(id).await?;
    Ok(Json(record.ok_or(ServerError::NotFound { entity: ENTITY })?))
}

async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<UserGroup>> {
    authorize(&principal, Action::Update, RESOURCE)?;

    let mut record = state
        .store
        .find_user_group(id)
        .await?
        .ok_or(ServerError::NotFound { entity: ENTITY })?;
    partial::<UserGroupBody>(&body)?.apply(&mut record);

    if state.store.update_user_group(&record).await? {
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

    if state.store.delete_user_group(id).await? {
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
    use crate::model::{DEFAULT_LINK, Group, Topic};
    use crate::store::{GroupRepository, TopicRepository};
    use crate::*;

    #[tokio::test]
    async fn test_staff_manages_memberships() {
        let state = test_state(MembershipModel::ManyToMany);
        let (student, token) = seed_user(&state, "student", "111111", false, false).await;
        let (_, staff) = seed_user(&state, "staff", "222222", true, false).await;
        let topic = state
            .store
            .insert_topic(&Topic { id: 0, title: "Databases".into() })
            .await
            .unwrap();
        let group = state
            .store
            .insert_group(&Group {
                id: 0,
                name: "Team".into(),
                topic: topic.id,
                link_django: DEFAULT_LINK.into(),
                link_tui: DEFAULT_LINK.into(),
                link_gui: DEFAULT_LINK.into(),
            })
            .await
            .unwrap();
        let body = json!({ "user": student.id, "group": group.id });

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/group-users",
            Some(&token),
            Some(body.clone()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/group-users",
            Some(&staff),
            Some(body.clone()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/group-users",
            Some(&staff),
            Some(body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let error = read_json(response).await;
        assert_eq!(error["errors"][0]["field"], "group");
        assert_eq!(error["errors"][0]["code"], "unique");

        // Listing is not narrowed, even for members.
        let response =
            make_request(app(state), Method::GET, "/api/v1/group-users", Some(&token), None).await;
        assert_eq!(read_json(response).await.as_array().unwrap().len(), 1);
    }
}
