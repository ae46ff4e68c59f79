use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::ValidationErrors;
use crate::generator::outlet::ArtifactError;
use crate::jobs::JobError;

/// 接口错误，统一以 `{"detail": ...}` 返回
#[derive(Debug)]
pub enum ApiError {
    /// 提交参数不合法，列出全部问题
    Validation(Vec<String>),
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!(message)),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!(message)),
            ApiError::Internal(message) => {
                tracing::error!("❌ 接口内部错误: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, json!(message))
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err.errors)
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(_) => ApiError::NotFound("Job not found".to_string()),
            JobError::Artifact(ArtifactError::NotFound(_)) => {
                ApiError::NotFound("File not found".to_string())
            }
            JobError::Artifact(ArtifactError::InvalidName(name)) => {
                ApiError::BadRequest(format!("Invalid file name: {}", name))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
