use axum::body::Bytes;
use axum::extract::State;
use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::model::{UserBody, UserProfile};
use crate::router::valid;
use crate::store::UserRepository;
use crate::token::EXPIRATION_TIME;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub user: UserProfile,
    pub token_type: String,
    pub token: String,
    pub expires_in: u64,
}

/// Handler to register a new regular user.
pub async fn handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Response>)> {
    let body: UserBody = valid(&body)?;
    let user = state.store.insert_user(&body.into_user()).await?;
    let token = state.token.create(user.id)?;

    tracing::info!(user = user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(Response {
            user: user.into(),
            token_type: TOKEN_TYPE.to_owned(),
            token,
            expires_in: EXPIRATION_TIME,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::MembershipModel;
    use crate::*;
    use axum::http::Method;
    use serde_json::json;

    fn body(username: &str, matricola: &str) -> serde_json::Value {
        json!({
            "username": username,
            "email": format!("{username}@example.org"),
            "first_name": "Mario",
            "last_name": "Rossi",
            "matricola": matricola,
            "is_staff": true,
        })
    }

    #[tokio::test]
    async fn test_registration() {
        let state = test_state(MembershipModel::ManyToMany);
        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/auth/registration",
            None,
            Some(body("mrossi", "123456")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = read_json(response).await;
        let body: Response = serde_json::from_value(body).unwrap();
        assert_eq!(body.token_type, TOKEN_TYPE);

        let user = state.store.find_user(body.user.id).await.unwrap().unwrap();
        assert!(!user.is_staff);
        assert!(!user.is_superuser);

        let claims = state.token.decode(&body.token).unwrap();
        assert_eq!(claims.sub, body.user.id.to_string());
        assert_eq!(claims.iss, state.config.url);

        // The fresh token is immediately usable.
        let response = make_request(
            app(state),
            Method::GET,
            "/api/v1/users/me",
            Some(&body.token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let state = test_state(MembershipModel::ManyToMany);

        for matricola in ["12345", "abcdef"] {
            let response = make_request(
                app(state.clone()),
                Method::POST,
                "/api/v1/auth/registration",
                None,
                Some(body("mrossi", matricola)),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let body = read_json(response).await;
            assert_eq!(body["errors"][0]["field"], "matricola");
            assert_eq!(body["errors"][0]["code"], "invalid");
        }

        let response = make_request(
            app(state),
            Method::POST,
            "/api/v1/auth/registration",
            None,
            Some(json!({})),
        )
        .await;
        let body = read_json(response).await;
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().all(|error| error["code"] == "null"));
    }

    #[tokio::test]
    async fn test_registration_rejects_blank_fields() {
        let state = test_state(MembershipModel::ManyToMany);

        let mut blank_names = body("mrossi", "123456");
        blank_names["first_name"] = json!("");
        blank_names["last_name"] = json!("");
        let mut blank_username = body("mrossi", "123456");
        blank_username["username"] = json!("");

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/auth/registration",
            None,
            Some(blank_names),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = read_json(response).await;
        let mut fields: Vec<_> = errors["errors"]
            .as_array()
            .unwrap()
            .iter()
            .inspect(|error| assert_eq!(error["code"], "min_length"))
            .map(|error| error["field"].as_str().unwrap().to_owned())
            .collect();
        fields.sort();
        assert_eq!(fields, ["first_name", "last_name"]);

        let response = make_request(
            app(state),
            Method::POST,
            "/api/v1/auth/registration",
            None,
            Some(blank_username),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = read_json(response).await;
        assert_eq!(errors["errors"][0]["field"], "username");
        assert_eq!(errors["errors"][0]["code"], "min_length");
    }

    #[tokio::test]
    async fn test_duplicate_matricola() {
        let state = test_state(MembershipModel::ManyToMany);

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/v1/auth/registration",
            None,
            Some(body("first", "123456")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            app(state),
            Method::POST,
            "/api/v1/auth/registration",
            None,
            Some(body("second", "123456")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = read_json(response).await;
        assert_eq!(body["errors"][0]["field"], "matricola");
        assert_eq!(body["errors"][0]["code"], "unique");
    }
}
