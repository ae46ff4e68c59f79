use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::generator::research::orchestrator::PipelineOutcome;
use crate::jobs::JobError;
use crate::jobs::job::{Job, JobStatus, PROGRESS_COMPLETED};

#[derive(Default)]
struct JobTable {
    jobs: HashMap<String, Job>,
    /// 创建顺序
    order: Vec<String>,
}

/// 任务登记表，所有读写经由同一把锁
#[derive(Default)]
pub struct JobRegistry {
    table: RwLock<JobTable>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一个pending状态的任务
    pub async fn create(&self) -> Job {
        let job = Job::new(uuid::Uuid::new_v4().to_string());
        let mut table = self.table.write().await;
        table.order.push(job.job_id.clone());
        table.jobs.insert(job.job_id.clone(), job.clone());
        job
    }

    pub async fn get(&self, job_id: &str) -> Result<Job, JobError> {
        let table = self.table.read().await;
        table
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// 全部任务，最新创建的在前
    pub async fn list(&self) -> Vec<Job> {
        let table = self.table.read().await;
        table
            .order
            .iter()
            .rev()
            .filter_map(|id| table.jobs.get(id).cloned())
            .collect()
    }

    /// 返回 (未结束的任务数, 任务总数)
    pub async fn counts(&self) -> (usize, usize) {
        let table = self.table.read().await;
        let active = table
            .jobs
            .values()
            .filter(|job| !job.status.is_terminal())
            .count();
        (active, table.jobs.len())
    }

    /// 状态迁移，非法迁移被拒绝且不修改任务
    pub async fn transition(&self, job_id: &str, next: JobStatus) -> Result<Job, JobError> {
        self.update(job_id, next, |_| {}).await
    }

    pub async fn set_progress(&self, job_id: &str, progress: &str) -> Result<(), JobError> {
        let mut table = self.table.write().await;
        let job = table
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        job.progress = progress.to_string();
        Ok(())
    }

    pub async fn complete(&self, job_id: &str, outcome: PipelineOutcome) -> Result<Job, JobError> {
        self.update(job_id, JobStatus::Completed, |job| {
            job.results = Some(outcome);
            job.progress = PROGRESS_COMPLETED.to_string();
        })
        .await
    }

    pub async fn fail(&self, job_id: &str, error: String) -> Result<Job, JobError> {
        self.update(job_id, JobStatus::Failed, |job| {
            job.progress = format!("Task failed: {}", error);
            job.error = Some(error);
        })
        .await
    }

    async fn update<F>(&self, job_id: &str, next: JobStatus, apply: F) -> Result<Job, JobError>
    where
        F: FnOnce(&mut Job),
    {
        let mut table = self.table.write().await;
        let job = table
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        if !job.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                job_id: job_id.to_string(),
                from: job.status,
                to: next,
            });
        }

        job.status = next;
        if next.is_terminal() {
            job.completed_at = Some(Utc::now());
        }
        apply(job);
        Ok(job.clone())
    }
}
