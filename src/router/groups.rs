//! Group projects, plus self-service join and leave.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::membership;
use crate::model::{Group, GroupBody, GroupId, UserId};
use crate::permission::{Action, Principal, Relation, Resource};
use crate::router::{authorize, partial, valid};
use crate::store::GroupRepository;

const ENTITY: &str = "group";

/// Optional body of `POST /groups/{id}/join`.
#[derive(Debug, Default, Deserialize)]
pub struct JoinBody {
    pub user_id: Option<UserId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub status: String,
    pub group: Group,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub status: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(retrieve).patch(update).delete(destroy))
        .route("/{id}/join", post(join))
        .route("/{id}/leave", delete(leave))
}

async fn find(state: &AppState, id: GroupId) -> Result<Group> {
    state
        .store
        .find_group(id)
        .await?
        .ok_or(ServerError::NotFound { entity: ENTITY })
}

/// Relation of the caller to `group`, unknown for anonymous callers.
async fn relation(state: &AppState, principal: &Principal, group: GroupId) -> Result<Option<Relation>> {
    if !principal.is_authenticated() {
        return Ok(None);
    }
    let member = state.membership.is_member(principal.id, group).await?;
    Ok(Some(Relation::from(member)))
}

async fn list(State(state): State<AppState>, principal: Principal) -> Result<Json<Vec<Group>>> {
    authorize(&principal, Action::List, Resource::Group(None))?;
    Ok(Json(state.store.list_groups().await?))
}

async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Bytes,
) -> Result<(StatusCode, Json<Group>)> {
    authorize(&principal, Action::Create, Resource::Group(None))?;

    let body: GroupBody = valid(&body)?;
    let group = state.store.insert_group(&body.into_group()).await?;
    tracing::info!(group = group.id, by = principal.id, "group created");

    Ok((StatusCode::CREATED, Json(group)))
}

async fn retrieve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<GroupId>,
) -> Result<Json<Group>> {
    authorize(&principal, Action::Retrieve, Resource::Group(None))?;
    Ok(Json(find(&state, id).await?))
}

async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<GroupId>,
    body: Bytes,
) -> Result<Json<Group>> {
    let relation = relation(&state, &principal, id).await?;
    authorize(&principal, Action::Update, Resource::Group(relation))?;

    let mut group = find(&state, id).await?;
    partial::<GroupBody>(&body)?.apply(&mut group);
    group.validate()?;

    if state.store.update_group(&group).await? {
        Ok(Json(group))
    } else {
        Err(ServerError::NotFound { entity: ENTITY })
    }
}

async fn destroy(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<GroupId>,
) -> Result<StatusCode> {
    let relation = relation(&state, &principal, id).await?;
    authorize(&principal, Action::Delete, Resource::Group(relation))?;

    if state.store.delete_group(id).await? {
        tracing::info!(group = id, by = principal.id, "group deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound { entity: ENTITY })
    }
}

async fn join(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<GroupId>,
    body: Bytes,
) -> Result<Json<JoinResponse>> {
    authorize(&principal, Action::Join { user: None }, Resource::Group(None))?;

    let JoinBody { user_id } = if body.is_empty() {
        JoinBody::default()
    } else {
        partial(&body)?
    };
    authorize(&principal, Action::Join { user: user_id }, Resource::Group(None))?;

    let group = find(&state, id).await?;
    membership::join(state.membership.as_ref(), &principal, group.id, user_id).await?;

    Ok(Json(JoinResponse {
        status: "joined".into(),
        group,
    }))
}

async fn leave(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<GroupId>,
) -> Result<Json<LeaveResponse>> {
    authorize(&principal, Action::Leave, Resource::Group(None))?;

    let group = find(&state, id).await?;
    membership::leave(state.membership.as_ref(), &principal, group.id).await?;

    Ok(Json(LeaveResponse {
        status: "left".into(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::membership::MembershipModel;
    use crate::store::{GroupRepository, TopicRepository, UserGroupRepository};
    use crate::*;

    /// Seed a topic and a group, returning the group path.
    async fn group(state: &AppState) -> String {
        let topic = state
            .store
            .insert_topic(&model::Topic { id: 0, title: "Databases".into() })
            .await
            .unwrap();
        let group = state
            .store
            .insert_group(&model::Group {
                id: 0,
                name: "Team".into(),
                topic: topic.id,
                link_django: model::DEFAULT_LINK.into(),
                link_tui: model::DEFAULT_LINK.into(),
                link_gui: model::DEFAULT_LINK.into(),
            })
            .await
            .unwrap();
        format!("/api/v1/groups/{}", group.id)
    }

    async fn send(
        app: &Router,
        method: Method,
        path: &str,
        token: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let response = make_request(app.clone(), method, path, Some(token), body).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    #[tokio::test]
    async fn test_member_can_update_group() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, token) = seed_user(&state, "student", "111111", false, false).await;
        let path = group(&state).await;
        let app = app(state);

        let patch = json!({ "name": "Renamed" });
        let (status, body) = send(&app, Method::PATCH, &path, &token, Some(patch.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["type"], "not_group_member");

        let (status, body) = send(&app, Method::POST, &format!("{path}/join"), &token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "joined");

        let (status, body) = send(&app, Method::PATCH, &path, &token, Some(patch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Renamed");
    }

    #[tokio::test]
    async fn test_links_are_validated() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, staff) = seed_user(&state, "staff", "222222", true, false).await;
        let path = group(&state).await;
        let app = app(state);

        for (link, message) in [
            ("http://example.com", "URL must use HTTPS."),
            ("https://127.0.0.1", "Localhost URLs are not allowed."),
            ("https://192.168.1.1", "IP addresses are not allowed, only hostnames."),
        ] {
            let (status, body) =
                send(&app, Method::PATCH, &path, &staff, Some(json!({ "link_gui": link }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{link}");
            assert_eq!(body["errors"][0]["field"], "link_gui");
            assert_eq!(body["errors"][0]["code"], "invalid");
            assert_eq!(body["errors"][0]["message"], message);
        }
    }

    #[tokio::test]
    async fn test_create_group_with_missing_topic() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, token) = seed_user(&state, "student", "111111", false, false).await;

        let (status, body) = send(
            &app(state),
            Method::POST,
            "/api/v1/groups",
            &token,
            Some(json!({ "name": "Orphans", "topic": 42 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "topic");
        assert_eq!(body["errors"][0]["code"], "does_not_exist");
    }

    #[tokio::test]
    async fn test_join_twice_and_leave_twice() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, token) = seed_user(&state, "student", "111111", false, false).await;
        let path = group(&state).await;
        let app = app(state.clone());

        let join = format!("{path}/join");
        let (status, _) = send(&app, Method::POST, &join, &token, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, Method::POST, &join, &token, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["type"], "already_member");
        assert_eq!(state.store.list_user_groups().await.unwrap().len(), 1);

        let leave = format!("{path}/leave");
        let (status, body) = send(&app, Method::DELETE, &leave, &token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "left");
        let (status, body) = send(&app, Method::DELETE, &leave, &token, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["type"], "not_member");
        assert!(state.store.list_user_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_join_on_behalf_of_another_user() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, student) = seed_user(&state, "student", "111111", false, false).await;
        let (other, _) = seed_user(&state, "other", "222222", false, false).await;
        let (_, root) = seed_user(&state, "root", "333333", true, true).await;
        let path = format!("{}/join", group(&state).await);
        let app = app(state.clone());

        for token in [&student, &root] {
            let (status, body) =
                send(&app, Method::POST, &path, token, Some(json!({ "user_id": other.id }))).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["type"], "not_self");
        }
        assert!(state.store.list_user_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_join_unknown_group() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, token) = seed_user(&state, "student", "111111", false, false).await;

        let (status, _) = send(&app(state), Method::POST, "/api/v1/groups/7/join", &token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_legacy_membership() {
        let state = test_state(MembershipModel::SingleGroup);
        let (_, token) = seed_user(&state, "student", "111111", false, false).await;
        let first = group(&state).await;
        let second = group(&state).await;
        let app = app(state);

        let (status, _) = send(&app, Method::POST, &format!("{first}/join"), &token, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, Method::POST, &format!("{second}/join"), &token, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["type"], "already_in_group");

        let (status, body) = send(&app, Method::DELETE, &format!("{first}/leave"), &token, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["type"], "admin_required");

        // Membership still grants group edits.
        let (status, _) = send(&app, Method::PATCH, &first, &token, Some(json!({ "name": "Mine" }))).await;
        assert_eq!(status, StatusCode::OK);
    }
}
