//! Topic catalog, curated by staff.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::model::{Topic, TopicBody, TopicId};
use crate::permission::{Action, Principal, Resource};
use crate::router::{authorize, partial, valid};
use crate::store::TopicRepository;

const ENTITY: &str = "topic";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(retrieve).patch(update).delete(destroy))
}

async fn find(state: &AppState, id: TopicId) -> Result<Topic> {
    state
        .store
        .find_topic(id)
        .await?
        .ok_or(ServerError::NotFound { entity: ENTITY })
}

async fn list(State(state): State<AppState>, principal: Principal) -> Result<Json<Vec<Topic>>> {
    authorize(&principal, Action::List, Resource::Topic)?;
    Ok(Json(state.store.list_topics().await?))
}

async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Bytes,
) -> Result<(StatusCode, Json<Topic>)> {
    authorize(&principal, Action::Create, Resource::Topic)?;

    let body: TopicBody = valid(&body)?;
    let topic = state.store.insert_topic(&body.into_topic()).await?;
    Ok((StatusCode::CREATED, Json(topic)))
}

async fn retrieve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TopicId>,
) -> Result<Json<Topic>> {
    authorize(&principal, Action::Retrieve, Resource::Topic)?;
    Ok(Json(find(&state, id).await?))
}

async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TopicId>,
    body: Bytes,
) -> Result<Json<Topic>> {
    authorize(&principal, Action::Update, Resource::Topic)?;

    let mut topic = find(&state, id).await?;
    partial::<TopicBody>(&body)?.apply(&mut topic);
    topic.validate()?;

    if state.store.update_topic(&topic).await? {
        Ok(Json(topic))
    } else {
        Err(ServerError::NotFound { entity: ENTITY })
    }
}

async fn destroy(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TopicId>,
) -> Result<StatusCode> {
    authorize(&principal, Action::Delete, Resource::Topic)?;

    if state.store.delete_topic(id).await? {
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

    #[tokio::test]
    async fn test_topic_lifecycle() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, staff) = seed_user(&state, "staff", "222222", true, false).await;
        let (_, student) = seed_user(&state, "student", "111111", false, false).await;

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/topics",
            Some(&staff),
            Some(json!({ "title": "Compilers" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = read_json(response).await["id"].as_i64().unwrap();
        let path = format!("/api/v1/topics/{id}");

        // Students can read the catalog but not change it.
        let response = make_request(app(state.clone()), Method::GET, &path, Some(&student), None).await;
        assert_eq!(read_json(response).await["title"], "Compilers");

        let response = make_request(
            app(state.clone()),
            Method::PATCH,
            &path,
            Some(&student),
            Some(json!({ "title": "Mine" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = make_request(
            app(state.clone()),
            Method::PATCH,
            &path,
            Some(&staff),
            Some(json!({ "title": "x".repeat(101) })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["errors"][0]["code"], "max_length");

        let response = make_request(app(state.clone()), Method::DELETE, &path, Some(&staff), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = make_request(app(state), Method::DELETE, &path, Some(&staff), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_referenced_topic_is_protected() {
        let state = test_state(MembershipModel::ManyToMany);
        let (_, staff) = seed_user(&state, "staff", "222222", true, false).await;

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/topics",
            Some(&staff),
            Some(json!({ "title": "Networks" })),
        )
        .await;
        let topic = read_json(response).await["id"].as_i64().unwrap();

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/groups",
            Some(&staff),
            Some(json!({ "name": "Packets", "topic": topic })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            app(state),
            Method::DELETE,
            &format!("/api/v1/topics/{topic}"),
            Some(&staff),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(read_json(response).await["type"], "protected");
    }
}
