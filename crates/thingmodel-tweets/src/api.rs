//! Read-only HTTP status API.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use thingmodel_schema::Thing;
use thingmodel_sink::SinkStats;
use thingmodel_warehouse::Warehouse;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::ingest::{IngestStats, IngestStatsSnapshot};

/// State shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    pub warehouse: Arc<Warehouse>,
    pub ingest: Arc<IngestStats>,
    /// Sink counters, if a sink is attached.
    pub sink: Option<Arc<SinkStats>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Response body of `GET /stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub ingest: IngestStatsSnapshot,
    /// Things currently stored.
    pub things: usize,
    /// Sink notifications dropped at enqueue time.
    pub sink_dropped: u64,
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Handler for `GET /stats`.
pub async fn stats_handler(Extension(state): Extension<Arc<ApiState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        ingest: state.ingest.snapshot(),
        things: state.warehouse.len(),
        sink_dropped: state
            .sink
            .as_ref()
            .map(|s| s.snapshot().dropped)
            .unwrap_or(0),
    })
}

/// Handler for `GET /things`.
pub async fn list_things_handler(
    Extension(state): Extension<Arc<ApiState>>,
) -> Json<Vec<Arc<Thing>>> {
    Json(state.warehouse.snapshot())
}

/// Handler for `GET /things/{id}`.
pub async fn get_thing_handler(
    Extension(state): Extension<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Arc<Thing>>, ApiError> {
    state
        .warehouse
        .lookup(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("thing not found".to_string()))
}

/// Builds the status API router.
pub fn app(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats_handler))
        .route("/things", get(list_things_handler))
        .route("/things/{id}", get(get_thing_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}

/// Serves the status API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: ApiState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "status API listening");
    }
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}
