//! Read-only dashboard — GET /.
//!
//! A JSON view over the queue's introspection API, gated by HTTP Basic
//! credentials. It observes state; it never mutates it.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::app::AppState;
use crate::auth::require_dashboard_auth;

const DASHBOARD_JOB_LIMIT: u32 = 50;

pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, Response> {
    require_dashboard_auth(&headers, &state.config.auth)?;

    let counts = state.queue.counts().map_err(internal_error)?;
    let jobs = state
        .queue
        .list_jobs(DASHBOARD_JOB_LIMIT)
        .map_err(internal_error)?;

    Ok(Json(json!({
        "counts": counts,
        "jobs": jobs,
    })))
}

fn internal_error(e: snooze_queue::QueueError) -> Response {
    error!("dashboard query failed: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal error"})),
    )
        .into_response()
}
