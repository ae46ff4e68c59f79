use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::generator::context::ProgressReporter;
use crate::generator::outlet::{ArtifactEntry, DiskOutlet};
use crate::generator::workflow::{PipelineRunner, ResearchPipeline};
use crate::jobs::JobError;
use crate::jobs::job::{Job, JobStatus, PROGRESS_STARTED};
use crate::jobs::registry::JobRegistry;
use crate::types::request::ResearchRequest;

/// 把阶段进度写回任务记录
struct JobProgress {
    registry: Arc<JobRegistry>,
    job_id: String,
}

#[async_trait]
impl ProgressReporter for JobProgress {
    async fn report(&self, progress: &str) {
        tracing::info!(job_id = %self.job_id, "📌 {}", progress);
        if let Err(e) = self.registry.set_progress(&self.job_id, progress).await {
            tracing::warn!(job_id = %self.job_id, "⚠️ 更新任务进度失败: {}", e);
        }
    }
}

/// 任务管理器：每个任务占用工作池中的一个名额，排队的任务保持pending
pub struct JobManager {
    registry: Arc<JobRegistry>,
    workers: Arc<Semaphore>,
    runner: Arc<dyn PipelineRunner>,
    output_root: PathBuf,
}

impl JobManager {
    pub fn new(
        runner: Arc<dyn PipelineRunner>,
        output_root: impl Into<PathBuf>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            workers: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            runner,
            output_root: output_root.into(),
        }
    }

    /// 使用真实的模型与外部服务
    pub fn from_config(config: &Config) -> Result<Self> {
        let pipeline = ResearchPipeline::from_config(config)?;
        Ok(Self::new(
            Arc::new(pipeline),
            config.output_dir.clone(),
            config.max_concurrent_jobs,
        ))
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// 任务的产物目录
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.output_root.join(job_id)
    }

    /// 登记任务并在后台执行，立即返回pending状态的任务
    pub async fn submit(&self, request: ResearchRequest) -> Job {
        let job = self.registry.create().await;
        let job_id = job.job_id.clone();
        tracing::info!(
            job_id = %job_id,
            "📥 新的调研任务: {} ({})",
            request.product_name,
            request.country_name
        );

        let registry = self.registry.clone();
        let workers = self.workers.clone();
        let runner = self.runner.clone();
        let output_dir = self.job_dir(&job_id);

        tokio::spawn(async move {
            let _permit = match workers.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(job_id = %job_id, "❌ 工作池已关闭: {}", e);
                    return;
                }
            };

            if let Err(e) = registry.transition(&job_id, JobStatus::Running).await {
                tracing::error!(job_id = %job_id, "❌ {}", e);
                return;
            }
            let _ = registry.set_progress(&job_id, PROGRESS_STARTED).await;

            let progress = Arc::new(JobProgress {
                registry: registry.clone(),
                job_id: job_id.clone(),
            });

            // 流水线在独立任务中运行，panic也能让任务进入终态
            let run = tokio::spawn(async move { runner.run(request, output_dir, progress).await });

            let finished = match run.await {
                Ok(Ok(outcome)) => {
                    tracing::info!(job_id = %job_id, "🎉 调研任务完成");
                    registry.complete(&job_id, outcome).await
                }
                Ok(Err(e)) => {
                    let error = format!("{:#}", e);
                    tracing::error!(job_id = %job_id, "❌ 调研任务失败: {}", error);
                    registry.fail(&job_id, error).await
                }
                Err(e) => {
                    let error = format!("Research pipeline aborted: {}", e);
                    tracing::error!(job_id = %job_id, "❌ {}", error);
                    registry.fail(&job_id, error).await
                }
            };

            if let Err(e) = finished {
                tracing::error!(job_id = %job_id, "❌ {}", e);
            }
        });

        job
    }

    pub async fn get_status(&self, job_id: &str) -> Result<Job, JobError> {
        self.registry.get(job_id).await
    }

    pub async fn list_jobs(&self) -> Vec<Job> {
        self.registry.list().await
    }

    /// 返回 (未结束的任务数, 任务总数)
    pub async fn counts(&self) -> (usize, usize) {
        self.registry.counts().await
    }

    /// 列出任务已写出的产物；任务存在但尚无产物时返回空列表
    pub async fn list_artifacts(&self, job_id: &str) -> Result<Vec<ArtifactEntry>, JobError> {
        self.registry.get(job_id).await?;
        Ok(DiskOutlet::new(self.job_dir(job_id)).list()?)
    }

    pub async fn get_artifact(&self, job_id: &str, name: &str) -> Result<Vec<u8>, JobError> {
        self.registry.get(job_id).await?;
        Ok(DiskOutlet::new(self.job_dir(job_id)).read(name)?)
    }
}
