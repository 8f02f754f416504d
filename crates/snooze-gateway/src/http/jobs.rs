//! Job management endpoints — GET /add-job and GET /delete-job.
//!
//! Both sit behind the API-key gate. Validation failures answer 400 with
//! `{"error": <message>}` and leave the store untouched; a scheduling
//! acknowledgment means the durable entry exists but no HTTP call has
//! happened yet.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use snooze_scheduler::{RemoveOutcome, SchedulerError};

use crate::app::AppState;
use crate::auth::require_api_key;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddJobQuery {
    pub id: Option<String>,
    pub target_url: Option<String>,
    pub run_at: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteJobQuery {
    pub id: Option<String>,
}

/// GET /add-job?id=&targetUrl=&runAt=&method=
pub async fn add_job_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AddJobQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_api_key(&headers, &state.config.auth)?;

    let id = required(query.id.as_deref(), "id")?;
    let target_url = required(query.target_url.as_deref(), "targetUrl")?;
    let run_at = required(query.run_at.as_deref(), "runAt")?;

    match state
        .scheduler
        .add_job(id, target_url, run_at, query.method.as_deref())
    {
        Ok(scheduled_for) => Ok(Json(json!({
            "ok": true,
            "scheduledFor": scheduled_for.to_rfc3339_opts(SecondsFormat::Millis, true),
        }))),
        Err(e @ (SchedulerError::Queue(_) | SchedulerError::Serialization(_))) => {
            error!("add-job failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            ))
        }
        Err(e) => Err((StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()})))),
    }
}

/// GET /delete-job?id=
///
/// Cancel-all for the given id. 404 only when nothing matched at all;
/// matches that had already started executing are reported in `failed`.
pub async fn delete_job_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DeleteJobQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_api_key(&headers, &state.config.auth)?;

    let id = required(query.id.as_deref(), "id")?;

    match state.scheduler.remove_job(id) {
        Ok(RemoveOutcome::NotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "message": "No matching job found"})),
        )),
        Ok(RemoveOutcome::Matched { removed, failed }) => Ok(Json(json!({
            "ok": true,
            "removed": removed,
            "failed": failed,
        }))),
        Err(e) => {
            error!("delete-job failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            ))
        }
    }
}

fn required<'a>(
    value: Option<&'a str>,
    name: &str,
) -> Result<&'a str, (StatusCode, Json<Value>)> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Missing required parameter: {name}")})),
        )),
    }
}
