// 商品采购调研流水线
// A QueryComposer   请求 + 公司背景 -> 搜索关键词
// B ResultCollector 关键词 -> 搜索 -> 模型挑选的搜索结果
// C PageExtractor   得分最高的N个结果 -> 抓取 -> 模型抽取并排名的商品记录
// D ReportComposer  商品记录 + 公司背景 -> HTML采购报告

use crate::generator::context::GeneratorContext;
use crate::generator::research::orchestrator::{PipelineOutcome, ResearchOrchestrator};
use anyhow::Result;

pub mod agents;
pub mod memory;
pub mod orchestrator;
pub mod types;

/// 执行调研流水线
pub async fn execute(context: &GeneratorContext) -> Result<PipelineOutcome> {
    let orchestrator = ResearchOrchestrator;
    orchestrator.execute_research_pipeline(context).await
}
