use axum::{Json, body::Bytes, extract::State};
use serde::Serialize;
use serde_json::Value;

use crate::jobs::JobStatus;
use crate::server::AppState;
use crate::server::error::ApiError;
use crate::types::request::ResearchRequest;

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// 提交调研任务；参数不合法时不创建任务
pub async fn start_research(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<JobResponse>, ApiError> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        ApiError::Validation(vec![format!("Request body must be valid JSON: {}", e)])
    })?;
    let request = ResearchRequest::from_value(&value)?;

    let job = state.jobs.submit(request).await;
    Ok(Json(JobResponse {
        job_id: job.job_id,
        status: job.status,
        message: "Research job started successfully".to_string(),
    }))
}
