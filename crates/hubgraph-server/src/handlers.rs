//! HTTP routes.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use hubgraph_graph::SharedPublisher;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Path the visualizer polls for the graph.
pub const HUBDATA_PATH: &str = "/hubdata.json";
pub const HEALTH_PATH: &str = "/healthz";

/// Shared state between handlers.
#[derive(Clone)]
pub struct AppState {
    pub publisher: SharedPublisher,
}

impl AppState {
    pub fn new(publisher: SharedPublisher) -> Self {
        Self { publisher }
    }
}

/// Builds the router serving the snapshot endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HUBDATA_PATH, get(get_hubdata))
        .route(HEALTH_PATH, get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Handles `GET /hubdata.json`.
///
/// Before the first cycle completes this is the empty snapshot, never an
/// error.
pub async fn get_hubdata(State(state): State<AppState>) -> Response {
    let snapshot = state.publisher.current();

    match snapshot.to_json() {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("Failed to encode snapshot: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handles `GET /healthz`.
pub async fn healthz() -> &'static str {
    "ok"
}
