use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::generator::research::orchestrator::PipelineOutcome;

pub const PROGRESS_QUEUED: &str = "Job queued for processing...";
pub const PROGRESS_STARTED: &str = "Initializing agents...";
pub const PROGRESS_COMPLETED: &str = "Task completed successfully!";

/// 任务状态，只能沿 pending -> running -> completed/failed 前进
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", str)
    }
}

/// 一次调研任务的状态记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Option<PipelineOutcome>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            progress: PROGRESS_QUEUED.to_string(),
            created_at: Utc::now(),
            completed_at: None,
            results: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_forward_transitions_allowed() {
        use JobStatus::*;
        let all = [Pending, Running, Completed, Failed];
        let allowed: Vec<(JobStatus, JobStatus)> = all
            .iter()
            .flat_map(|from| all.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![(Pending, Running), (Running, Completed), (Running, Failed)]
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let job = Job::new("abc");
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["status"], "pending");
        assert_eq!(value["progress"], PROGRESS_QUEUED);
        assert!(value["completed_at"].is_null());
        assert!(value["error"].is_null());
    }
}
