//! Public instance status and metrics exposition.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;
use crate::config::Configuration;
use crate::membership::MembershipModel;

/// Structured configuration.
#[derive(Serialize)]
pub struct Status {
    version: String,
    name: String,
    url: String,
    membership: MembershipModel,
}

/// Public server status (configuration).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Status> {
    Json(Status {
        version: env!("CARGO_PKG_VERSION").into(),
        name: if config.name.is_empty() {
            env!("CARGO_CRATE_NAME").into()
        } else {
            config.name.clone()
        },
        url: config.url.clone(),
        membership: config.membership,
    })
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::membership::MembershipModel;
    use crate::*;

    #[tokio::test]
    async fn test_status() {
        let state = test_state(MembershipModel::SingleGroup);
        let response = make_request(app(state), Method::GET, "/status.json", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        assert_eq!(body["name"], "gpm");
        assert_eq!(body["membership"], "single_group");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_metrics_is_public() {
        let state = test_state(MembershipModel::ManyToMany);
        let response = make_request(app(state), Method::GET, "/metrics", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
