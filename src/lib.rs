//! gpm manages group projects: who belongs to which group, which goals a
//! group pursues, and who may change what.

#![forbid(unsafe_code)]
pub mod config;
pub mod error;
pub mod membership;
mod middleware;
pub mod model;
pub mod permission;
mod router;
pub mod scope;
pub mod store;
pub mod telemetry;
pub mod token;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use membership::MembershipStrategy;
use store::{MemoryStore, PgStore, Store};

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub store: Arc<dyn Store>,
    pub membership: Arc<dyn MembershipStrategy>,
    pub token: token::TokenManager,
    pub metrics: PrometheusHandle,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    let api = Router::new()
        // `POST /auth/registration` goes to `registration`.
        .route("/auth/registration", post(router::registration::handler))
        .nest("/users", router::users::router())
        .nest("/topics", router::topics::router())
        .nest("/goals", router::goals::router())
        .nest("/groups", router::groups::router())
        .nest("/group-goals", router::group_goals::router())
        .nest("/group-users", router::group_users::router());

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        .route("/metrics", get(router::status::metrics))
        .nest("/api/v1", api)
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;
    let metrics = telemetry::setup_metrics_recorder()?;

    let store: Arc<dyn Store> = match config.postgres {
        Some(ref postgres) => {
            let store = PgStore::connect(
                &postgres.address,
                postgres
                    .username
                    .as_deref()
                    .unwrap_or(store::DEFAULT_CREDENTIALS),
                postgres
                    .password
                    .as_deref()
                    .unwrap_or(store::DEFAULT_CREDENTIALS),
                postgres
                    .database
                    .as_deref()
                    .unwrap_or(store::DEFAULT_DATABASE_NAME),
                postgres.pool_size.unwrap_or(store::DEFAULT_POOL_SIZE),
            )
            .await?;

            // execute migrations scripts on start.
            store.migrate().await?;
            Arc::new(store)
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, data is kept in memory"
            );
            Arc::new(MemoryStore::new())
        },
    };

    // handle jwt.
    let Some(token_config) = &config.token else {
        return Err("missing `token` entry on `config.yaml` file".into());
    };
    let mut token = token::TokenManager::new(&config.url, &token_config.secret);
    if let Some(audience) = &token_config.audience {
        token.audience(audience);
    }

    let membership = membership::strategy(config.membership, Arc::clone(&store));
    tracing::info!(model = ?config.membership, "membership strategy selected");

    Ok(AppState {
        config,
        store,
        membership,
        token,
        metrics,
    })
}

/// In-memory state for tests.
///
/// MUST NEVER be used in production.
#[cfg(test)]
pub(crate) fn test_state(model: membership::MembershipModel) -> AppState {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    AppState {
        config: Arc::new(config::Configuration {
            name: "gpm".into(),
            url: "https://gpm.example.com/".into(),
            membership: model,
            ..Default::default()
        }),
        membership: membership::strategy(model, Arc::clone(&store)),
        store,
        token: token::TokenManager::new("https://gpm.example.com/", "test secret"),
        metrics: telemetry::detached_metrics_handle().expect("cannot build recorder"),
    }
}

/// Insert a user straight into the store and sign a token for them.
#[cfg(test)]
pub(crate) async fn seed_user(
    state: &AppState,
    username: &str,
    matricola: &str,
    is_staff: bool,
    is_superuser: bool,
) -> (model::User, String) {
    use store::UserRepository;

    let mut user = model::User::new(
        username.into(),
        format!("{username}@example.org"),
        username.into(),
        "Test".into(),
        matricola.into(),
    );
    user.is_staff = is_staff;
    user.is_superuser = is_superuser;

    let user = state.store.insert_user(&user).await.expect("cannot seed user");
    let token = state.token.create(user.id).expect("cannot create JWT");
    (user, token)
}

#[cfg(test)]
pub(crate) async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let body = body.map(|body| body.to_string()).unwrap_or_default();
    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

#[cfg(test)]
pub(crate) async fn read_json(
    response: axum::http::Response<axum::body::Body>,
) -> serde_json::Value {
    use http_body_util::BodyExt;

    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
