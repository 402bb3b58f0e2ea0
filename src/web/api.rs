use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::{ApiError, AppState};
use crate::config::EngineConfig;
use crate::engine::EngineError;
use crate::tree::NodeId;
use crate::types::{PriceBar, Synthesis};

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub filename: String,
}

/// A live bar as clients send it. Only `close` is required; missing prices
/// default to the close and a missing timestamp to now.
#[derive(Debug, Clone, Deserialize)]
pub struct BarPayload {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl BarPayload {
    pub fn into_bar(self) -> PriceBar {
        PriceBar::new(
            self.timestamp.unwrap_or_else(Utc::now),
            self.open.unwrap_or(self.close),
            self.high.unwrap_or(self.close),
            self.low.unwrap_or(self.close),
            self.close,
            self.volume,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub decision: Synthesis,
    pub data: PriceBar,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    uptime_seconds: i64,
}

/// Empty body or `null` means "use the defaults".
pub fn parse_config(body: &[u8]) -> Result<Option<EngineConfig>, EngineError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<EngineConfig>>(body).map_err(|e| EngineError::InvalidConfig {
        errors: vec![e.to_string()],
    })
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now.timestamp_millis(),
        uptime_seconds: (now - state.started_at).num_seconds(),
    })
}

pub async fn post_initialize(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let config = state.context.initialize(parse_config(&body)?).await?;
    Ok(Json(json!({ "success": true, "config": config })))
}

pub async fn post_load(
    State(state): State<AppState>,
    Json(request): Json<LoadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let bars = state.context.load_data(&request.filename).await?;
    Ok(Json(json!({ "success": true, "bars": bars })))
}

pub async fn post_train(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let report = state.context.train().await?;
    let tree = state.context.tree_snapshot().await?;
    info!("Train request served: {} nodes", report.node_count);
    Ok(Json(json!({ "success": true, "report": report, "tree": tree })))
}

pub async fn get_tree(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.context.tree_snapshot().await?))
}

pub async fn post_process(
    State(state): State<AppState>,
    Json(payload): Json<BarPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let bar = payload.into_bar();
    let decision = state.context.process_new_data(bar).await?;
    Ok(Json(DecisionResponse {
        decision,
        data: bar,
        timestamp: Utc::now(),
    }))
}

pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.context.status().await)
}

pub async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
) -> Result<impl IntoResponse, ApiError> {
    match state.context.node(id).await? {
        Some(node) => Ok(Json(node).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("node {} not found", id), "kind": "NotFound" })),
        )
            .into_response()),
    }
}
