use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::Serialize;

use crate::generator::outlet::{ArtifactEntry, content_type_for};
use crate::jobs::Job;
use crate::server::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub job_id: String,
    pub output_directory: String,
    pub files: Vec<ArtifactEntry>,
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.jobs.list_jobs().await)
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.jobs.get_status(&job_id).await?))
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<FilesResponse>, ApiError> {
    let files = state.jobs.list_artifacts(&job_id).await?;
    Ok(Json(FilesResponse {
        output_directory: state.jobs.job_dir(&job_id).display().to_string(),
        job_id,
        files,
    }))
}

/// 下载产物，内容类型按扩展名推断
pub async fn download(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.jobs.get_artifact(&job_id, &filename).await?;
    let headers = [
        (header::CONTENT_TYPE, content_type_for(&filename).to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, bytes))
}
