use axum::{Json, extract::State};
use serde::Serialize;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    active_jobs: usize,
    total_jobs: usize,
}

/// 健康检查，附带任务数量
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let (active_jobs, total_jobs) = state.jobs.counts().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        active_jobs,
        total_jobs,
    })
}
