//! REST接口与调研面板

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::jobs::JobManager;

pub mod error;
pub mod routes;

/// 各个handler共享的状态
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobManager>,
}

impl AppState {
    pub fn new(jobs: Arc<JobManager>) -> Self {
        Self { jobs }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::dashboard))
        .route("/health", get(routes::health::health_handler))
        .route("/api/research", post(routes::research::start_research))
        .route("/api/jobs", get(routes::jobs::list_jobs))
        .route("/api/job/:job_id/status", get(routes::jobs::job_status))
        .route("/api/job/:job_id/files", get(routes::jobs::list_files))
        .route(
            "/api/job/:job_id/download/:filename",
            get(routes::jobs::download),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 启动HTTP服务，直到进程退出
pub async fn serve(config: &Config) -> Result<()> {
    let jobs = Arc::new(JobManager::from_config(config)?);
    let app = router(AppState::new(jobs));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("🌐 调研服务已启动: http://{}", addr);
    tracing::info!(
        "📂 产物目录: {}，最大并发任务数: {}",
        config.output_dir.display(),
        config.max_concurrent_jobs
    );

    axum::serve(listener, app).await.context("HTTP server error")?;
    Ok(())
}
