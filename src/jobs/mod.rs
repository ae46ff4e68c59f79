//! 任务门面：提交、状态查询与产物读取，REST接口与面板共用

use thiserror::Error;

use crate::generator::outlet::ArtifactError;

pub mod job;
pub mod manager;
pub mod registry;

pub use job::{Job, JobStatus};
pub use manager::JobManager;
pub use registry::JobRegistry;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("invalid status transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
