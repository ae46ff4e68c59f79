use anyhow::Result;
use async_trait::async_trait;

use crate::error::PipelineError;
use crate::generator::outlet::ReportRenderer;
use crate::generator::research::memory::StageMemory;
use crate::generator::research::types::StageKind;
use crate::generator::{
    context::GeneratorContext,
    step_forward_agent::{
        AgentDataConfig, DataSource, FormatterConfig, PromptTemplate, StepForwardAgent,
    },
};
use crate::types::product::{AllExtractedProducts, ReportDraft};

/// 采购报告撰写员 - 基于商品记录与公司背景撰写报告正文，版式由渲染器生成
#[derive(Default, Clone)]
pub struct ReportComposer;

#[async_trait]
impl StepForwardAgent for ReportComposer {
    type Output = ReportDraft;

    fn stage(&self) -> StageKind {
        StageKind::ReportComposer
    }

    fn data_config(&self) -> AgentDataConfig {
        AgentDataConfig {
            required_sources: vec![
                DataSource::StageOutput(StageKind::PageExtractor),
                DataSource::CompanyContext,
            ],
            optional_sources: vec![DataSource::Request],
        }
    }

    fn prompt_template(&self, _context: &GeneratorContext) -> PromptTemplate {
        PromptTemplate {
            system_prompt: r#"You are a Procurement Report Author Agent.
Your goal is to write a professional procurement report after looking into a list of products.
You write clear business prose as HTML fragments that will be placed inside a Bootstrap page."#
                .to_string(),

            opening_instruction: [
                "The task is to write the content of a professional procurement report.",
                "Use the provided context about the company to make a specialized report.",
                "The report will include the search results and prices of products from different websites.",
                "The report is structured with the following sections:",
                "1. Executive Summary: A brief overview of the procurement process and key findings.",
                "2. Introduction: An introduction to the procurement objective and scope of the report.",
                "3. Methodology: A description of the methods used to gather and compare prices.",
                "4. Findings: Detailed comparison of prices from different websites.",
                "5. Analysis: An analysis of the findings, highlighting any significant trends or observations.",
                "6. Recommendations: Suggestions for procurement based on the analysis.",
                "7. Conclusion: A summary of the report and final thoughts.",
                "8. Appendices: Any additional information or supplementary materials.",
            ]
            .join("\n"),

            closing_instruction: r#"
## Requirements
- Fill every field of the JSON object; each section is a non-empty HTML fragment using Bootstrap classes (paragraphs, lists, badges)
- Do not include <html>, <head>, <body>, <script> or section headings; the page layout and headings are added automatically
- A product comparison table and the raw product data are appended to Findings and Appendices automatically, so refer to them instead of repeating them
- Base every statement on the extracted products; do not invent prices or products"#
                .to_string(),

            formatter_config: FormatterConfig::default(),
        }
    }

    async fn validate(
        &self,
        output: Self::Output,
        _context: &GeneratorContext,
    ) -> Result<Self::Output, PipelineError> {
        validate_draft(output)
    }

    /// 将报告正文与商品记录渲染为完整的HTML文档
    async fn render_artifact(
        &self,
        output: &Self::Output,
        context: &GeneratorContext,
    ) -> Result<String> {
        let products = context
            .get_stage_output::<AllExtractedProducts>(StageKind::PageExtractor)
            .await
            .ok_or_else(|| PipelineError::MissingInput {
                stage: self.stage(),
                input: StageKind::PageExtractor.to_string(),
            })?;

        Ok(ReportRenderer::render(
            output,
            &products.products,
            &context.request,
            &context.config.company,
        ))
    }
}

/// 报告的每一节都必须有内容
pub fn validate_draft(draft: ReportDraft) -> Result<ReportDraft, PipelineError> {
    let sections = [
        ("title", &draft.title),
        ("executive_summary", &draft.executive_summary),
        ("introduction", &draft.introduction),
        ("methodology", &draft.methodology),
        ("findings", &draft.findings),
        ("analysis", &draft.analysis),
        ("recommendations", &draft.recommendations),
        ("conclusion", &draft.conclusion),
        ("appendices", &draft.appendices),
    ];

    let empty: Vec<&str> = sections
        .iter()
        .filter(|(_, body)| body.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if !empty.is_empty() {
        return Err(PipelineError::schema(
            StageKind::ReportComposer,
            format!("empty report sections: {}", empty.join(", ")),
        ));
    }
    Ok(draft)
}
