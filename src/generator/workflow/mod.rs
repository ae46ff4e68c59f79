use crate::config::Config;
use crate::generator::context::{GeneratorContext, LogProgress, ProgressReporter};
use crate::generator::outlet::DiskOutlet;
use crate::generator::research::orchestrator::PipelineOutcome;
use crate::llm::client::LLMClient;
use crate::services::{PageScraper, ScrapeGraphClient, SearchEngine, TavilyClient};
use crate::types::request::ResearchRequest;

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 时间跟踪作用域，阶段按开始顺序记录
pub struct TimingScope {
    start_time: Instant,
    running: Vec<(String, Instant)>,
    phase_durations: Vec<(String, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            running: Vec::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.running.push((phase_name.to_string(), Instant::now()));
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let index = self.running.iter().position(|(name, _)| name == phase_name)?;
        let (name, started) = self.running.remove(index);
        let duration = started.elapsed();
        self.phase_durations.push((name, duration));
        Some(duration)
    }

    /// 获取总执行时间
    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 获取所有已结束阶段的执行时间
    pub fn get_phase_durations(&self) -> &[(String, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.get_total_duration().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 流水线入口，供任务管理器与命令行共用
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    async fn run(
        &self,
        request: ResearchRequest,
        output_dir: PathBuf,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<PipelineOutcome>;
}

/// 组合模型与外部服务的调研流水线
#[derive(Clone)]
pub struct ResearchPipeline {
    config: Config,
    llm_client: LLMClient,
    search: Arc<dyn SearchEngine>,
    scraper: Arc<dyn PageScraper>,
}

impl ResearchPipeline {
    pub fn new(
        config: Config,
        llm_client: LLMClient,
        search: Arc<dyn SearchEngine>,
        scraper: Arc<dyn PageScraper>,
    ) -> Self {
        Self {
            config,
            llm_client,
            search,
            scraper,
        }
    }

    /// 使用配置中的provider与服务地址创建流水线
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm_client = LLMClient::new(config.clone())?;
        let search: Arc<dyn SearchEngine> = Arc::new(TavilyClient::new(&config.search)?);
        let scraper: Arc<dyn PageScraper> = Arc::new(ScrapeGraphClient::new(&config.scraper)?);
        Ok(Self::new(config.clone(), llm_client, search, scraper))
    }

    pub fn llm_client(&self) -> &LLMClient {
        &self.llm_client
    }
}

#[async_trait]
impl PipelineRunner for ResearchPipeline {
    async fn run(
        &self,
        request: ResearchRequest,
        output_dir: PathBuf,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<PipelineOutcome> {
        let context = GeneratorContext::new(
            self.llm_client.clone(),
            self.config.clone(),
            request,
            self.search.clone(),
            self.scraper.clone(),
            DiskOutlet::new(output_dir),
            progress,
        );

        crate::generator::research::execute(&context).await
    }
}

/// 在前台运行一次完整的调研流程
pub async fn launch(
    config: &Config,
    request: ResearchRequest,
    output_dir: PathBuf,
) -> Result<PipelineOutcome> {
    let pipeline = ResearchPipeline::from_config(config)?;

    // 启动时检查模型连接
    pipeline.llm_client().check_connection().await?;

    pipeline
        .run(request, output_dir, Arc::new(LogProgress))
        .await
}

// Include tests
#[cfg(test)]
mod tests;
