use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::generator::context::GeneratorContext;
use crate::generator::outlet::ArtifactEntry;
use crate::generator::research::agents::page_extractor::PageExtractor;
use crate::generator::research::agents::query_composer::QueryComposer;
use crate::generator::research::agents::report_composer::ReportComposer;
use crate::generator::research::agents::result_collector::ResultCollector;
use crate::generator::step_forward_agent::StepForwardAgent;
use crate::generator::workflow::TimingScope;

/// 一次成功运行的汇总信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub output_directory: String,
    pub query_count: usize,
    pub result_count: usize,
    pub product_count: usize,
    pub artifacts: Vec<ArtifactEntry>,
}

/// 四阶段调研编排器：严格顺序执行，任一阶段失败即终止
#[derive(Default)]
pub struct ResearchOrchestrator;

impl ResearchOrchestrator {
    pub async fn execute_research_pipeline(
        &self,
        context: &GeneratorContext,
    ) -> Result<PipelineOutcome> {
        tracing::info!(
            "🚀 开始执行商品调研流程: {} ({})",
            context.request.product_name,
            context.request.country_name
        );
        let mut timing = TimingScope::new();

        let queries = self
            .execute_agent(&QueryComposer, context, &mut timing)
            .await?;
        let results = self
            .execute_agent(&ResultCollector, context, &mut timing)
            .await?;
        let products = self
            .execute_agent(&PageExtractor, context, &mut timing)
            .await?;
        self.execute_agent(&ReportComposer, context, &mut timing)
            .await?;

        tracing::info!("✓ 商品调研流程执行完毕\n{}", timing.generate_timing_report());

        Ok(PipelineOutcome {
            output_directory: context.outlet.root().display().to_string(),
            query_count: queries.queries.len(),
            result_count: results.results.len(),
            product_count: products.products.len(),
            artifacts: context.outlet.list()?,
        })
    }

    /// 执行单个阶段并记录耗时
    async fn execute_agent<T>(
        &self,
        agent: &T,
        context: &GeneratorContext,
        timing: &mut TimingScope,
    ) -> Result<T::Output>
    where
        T: StepForwardAgent + Send + Sync,
    {
        let stage = agent.stage();
        let phase = stage.to_string();
        tracing::info!("🤖 执行 {} 阶段...", stage);

        timing.start_phase(&phase);
        let result = agent.execute(context).await;
        let elapsed_ms = timing
            .end_phase(&phase)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        match &result {
            Ok(_) => tracing::info!(stage = %stage, elapsed_ms, "✓ {} 阶段完成", stage),
            Err(e) => tracing::error!(stage = %stage, elapsed_ms, "❌ {} 阶段失败: {:#}", stage, e),
        }

        result.with_context(|| format!("Stage {} ({}) failed", stage.ordinal(), stage))
    }
}
