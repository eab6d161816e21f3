use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::error::ApiError;
use super::types::{
    CreateTaskRequest, CreateTaskResponse, GetTaskResultRequest, LegacyResultQuery,
    LegacyResultResponse, LegacyTaskQuery, Solution, SolveQuery, SolveResponse,
    TaskResultResponse,
};
use crate::app::{App, AppError, HealthReport};
use crate::domain::{Challenge, TaskId, TaskStatus};

pub const API_KEY_HEADER: &str = "x-api-key";

/// 形式が不正な ID は「存在しない ID」と同じ扱い
fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.trim().parse::<TaskId>().map_err(|e| {
        debug!(task_id = raw, error = %e, "unparseable task id");
        ApiError::from(AppError::NotFound(raw.to_string()))
    })
}

/// POST /createTask
pub async fn create_task(
    State(app): State<App>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Json<CreateTaskResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "createTask: unreadable body");
        ApiError::from(rejection)
    })?;
    let challenge = request
        .into_challenge()
        .ok_or_else(|| ApiError::BadRequest("Missing websiteURL or websiteKey".to_string()))?;

    let id = app.submit(challenge).await?;
    Ok(Json(CreateTaskResponse {
        task_id: id.to_string(),
    }))
}

/// POST /getTaskResult
pub async fn get_task_result(
    State(app): State<App>,
    payload: Result<Json<GetTaskResultRequest>, JsonRejection>,
) -> Result<Json<TaskResultResponse>, ApiError> {
    let Json(request) = payload?;
    let raw = request
        .task_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing taskId".to_string()))?;

    let record = app.get_result(parse_task_id(&raw)?).await?;
    Ok(Json(TaskResultResponse::from(&record)))
}

/// GET /turnstile
pub async fn legacy_create(
    State(app): State<App>,
    Query(query): Query<LegacyTaskQuery>,
) -> Result<Json<CreateTaskResponse>, ApiError> {
    let challenge = Challenge::from_fields(query.url, query.sitekey)
        .ok_or_else(|| ApiError::BadRequest("Missing url or sitekey".to_string()))?;

    let id = app.submit(challenge).await?;
    Ok(Json(CreateTaskResponse {
        task_id: id.to_string(),
    }))
}

/// GET /result
pub async fn legacy_result(
    State(app): State<App>,
    Query(query): Query<LegacyResultQuery>,
) -> Result<Json<LegacyResultResponse>, ApiError> {
    let raw = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing id".to_string()))?;

    let record = app.get_result(parse_task_id(&raw)?).await?;
    Ok(Json(LegacyResultResponse::from(&record)))
}

/// GET /health
pub async fn health(State(app): State<App>) -> Json<HealthReport> {
    Json(app.health().await)
}

/// GET /solve
///
/// 同期版。API key が設定されていれば `X-API-Key` ヘッダか `key` クエリが一致する必要がある。
pub async fn solve(
    State(app): State<App>,
    headers: HeaderMap,
    Query(query): Query<SolveQuery>,
) -> Result<Json<SolveResponse>, ApiError> {
    if let Some(expected) = app.config().api_key.as_deref() {
        let header = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
        if header != Some(expected) && query.key.as_deref() != Some(expected) {
            warn!("solve: rejected request with missing or wrong API key");
            return Err(ApiError::Unauthorized);
        }
    }

    let challenge = Challenge::from_fields(query.url, query.sitekey)
        .ok_or_else(|| ApiError::BadRequest("Missing url or sitekey".to_string()))?
        .with_action(query.action)
        .with_cdata(query.cdata);

    let report = app.solve_now(challenge).await?;
    match report.record.status {
        TaskStatus::Ready => Ok(Json(SolveResponse {
            error_id: 0,
            status: TaskStatus::Ready,
            solution: Solution {
                token: report.record.token,
            },
            elapsed: report.elapsed,
        })),
        _ => Err(ApiError::SolveFailed(
            report
                .record
                .error
                .unwrap_or_else(|| "Unknown error".to_string()),
        )),
    }
}

/// GET /
pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "turnpike",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Challenge solving service backed by a pool of automation workers",
        "endpoints": {
            "POST /createTask": "Submit a challenge; returns {taskId}",
            "POST /getTaskResult": "Poll a task by {taskId}",
            "GET /turnstile": "Legacy submit (url, sitekey)",
            "GET /result": "Legacy poll (id)",
            "GET /solve": "Synchronous solve (url, sitekey, action?, cdata?)",
            "GET /health": "Pool and task counters"
        }
    }))
}
