use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::PipelineError;
use crate::generator::research::memory::{MemoryScope, ScopedKeys, StageMemory};
use crate::generator::research::types::StageKind;
use crate::generator::{
    context::GeneratorContext,
    step_forward_agent::{
        AgentDataConfig, DataSource, FormatterConfig, PromptTemplate, StepForwardAgent,
    },
};
use crate::services::ScrapedPage;
use crate::types::product::{AllExtractedProducts, AllSearchResults, SingleSearchResult};
use crate::utils::threads::do_parallel_with_limit;

pub const MAX_SPECS: usize = 5;
pub const MIN_RANK: u8 = 1;
pub const MAX_RANK: u8 = 5;

/// 商品页抓取分析员 - 抓取得分最高的候选页面，抽取商品信息并给出推荐排名
#[derive(Default, Clone)]
pub struct PageExtractor;

#[async_trait]
impl StepForwardAgent for PageExtractor {
    type Output = AllExtractedProducts;

    fn stage(&self) -> StageKind {
        StageKind::PageExtractor
    }

    fn data_config(&self) -> AgentDataConfig {
        AgentDataConfig {
            required_sources: vec![DataSource::StageOutput(StageKind::ResultCollector)],
            optional_sources: vec![DataSource::Request],
        }
    }

    fn prompt_template(&self, context: &GeneratorContext) -> PromptTemplate {
        let top_n = context.request.top_recommendations_no;

        PromptTemplate {
            system_prompt: r#"You are a Web Scraping Agent.
Your goal is to extract details from any website.
You look for the required values in scraped product pages. These details will be used to decide which best product to buy."#
                .to_string(),

            opening_instruction: [
                "The task is to extract product details from any ecommerce store page url.".to_string(),
                "The task has to collect results from multiple pages urls.".to_string(),
                format!("Collect the best {} products from the search results.", top_n),
            ]
            .join("\n"),

            closing_instruction: format!(
                r#"
## Requirements
- Return between 1 and {top_n} products, only from the scraped pages listed above
- page_url must be exactly the url of the scraped page the product comes from
- product_current_price is a non-negative number; set product_original_price and product_discount_percentage to null when there is no discount
- product_specs holds between 1 and {MAX_SPECS} of the most important specifications to compare
- agent_recommendation_rank is an integer from {MIN_RANK} to {MAX_RANK}, higher is better, relative to the other products in this list
- agent_recommendation_notes explains why you would recommend or not recommend the product compared to the others"#
            ),

            formatter_config: FormatterConfig::default(),
        }
    }

    /// 按得分选出前N个页面并抓取，任何一个页面抓取失败即整体失败
    async fn provide_custom_prompt_content(
        &self,
        context: &GeneratorContext,
    ) -> Result<Option<String>> {
        let results = context
            .get_stage_output::<AllSearchResults>(StageKind::ResultCollector)
            .await
            .ok_or_else(|| PipelineError::MissingInput {
                stage: self.stage(),
                input: StageKind::ResultCollector.to_string(),
            })?;

        let candidates = select_candidates(
            &results.results,
            context.request.top_recommendations_no as usize,
        );
        tracing::info!("🕸️ 准备抓取 {} 个候选商品页面", candidates.len());

        let required_fields = context.config.scraper.required_fields.clone();
        let scrapes: Vec<_> = candidates
            .iter()
            .map(|candidate| {
                let scraper = context.scraper.clone();
                let page_url = candidate.url.clone();
                let fields = required_fields.clone();
                Box::pin(async move { scraper.scrape(&page_url, &fields).await })
            })
            .collect();

        let mut pages = Vec::new();
        for outcome in do_parallel_with_limit(scrapes, context.config.llm.max_parallels).await {
            pages.push(outcome.map_err(|e| PipelineError::external("scraper", format!("{:#}", e)))?);
        }

        context
            .store_to_memory(MemoryScope::RAW, ScopedKeys::SCRAPED_PAGES, &pages)
            .await?;

        Ok(Some(format_pages(&pages)))
    }

    async fn validate(
        &self,
        output: Self::Output,
        context: &GeneratorContext,
    ) -> Result<Self::Output, PipelineError> {
        let pages: Vec<ScrapedPage> = context
            .get_from_memory(MemoryScope::RAW, ScopedKeys::SCRAPED_PAGES)
            .await
            .unwrap_or_default();
        validate_products(
            output,
            &pages,
            context.request.top_recommendations_no as usize,
        )
    }
}

/// 按得分从高到低（同分保持原顺序）选出前 top_n 个结果
pub fn select_candidates(results: &[SingleSearchResult], top_n: usize) -> Vec<SingleSearchResult> {
    let mut sorted: Vec<SingleSearchResult> = results.to_vec();
    sorted.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}

fn format_pages(pages: &[ScrapedPage]) -> String {
    let mut content = String::from("### Scraped product pages\n");
    for (i, page) in pages.iter().enumerate() {
        content.push_str(&format!(
            "{}. page_url: {}\n```json\n{}\n```\n",
            i + 1,
            page.page_url,
            serde_json::to_string_pretty(&page.details).unwrap_or_default()
        ));
    }
    content.push('\n');
    content
}

/// 校验商品记录：数量、规格数、排名范围、价格，以及页面来源
pub fn validate_products(
    output: AllExtractedProducts,
    pages: &[ScrapedPage],
    top_n: usize,
) -> Result<AllExtractedProducts, PipelineError> {
    let stage = StageKind::PageExtractor;
    let count = output.products.len();
    if count == 0 {
        return Err(PipelineError::schema(stage, "no products were extracted"));
    }
    if count > top_n {
        return Err(PipelineError::schema(
            stage,
            format!("{} products extracted but at most {} are allowed", count, top_n),
        ));
    }

    let scraped: HashSet<&str> = pages.iter().map(|p| p.page_url.as_str()).collect();
    for (i, product) in output.products.iter().enumerate() {
        let label = format!("product #{} ({})", i + 1, product.product_title);
        let specs = product.product_specs.len();
        if specs == 0 || specs > MAX_SPECS {
            return Err(PipelineError::schema(
                stage,
                format!("{} has {} specs, expected 1 to {}", label, specs, MAX_SPECS),
            ));
        }
        let rank = product.agent_recommendation_rank;
        if !(MIN_RANK..=MAX_RANK).contains(&rank) {
            return Err(PipelineError::schema(
                stage,
                format!(
                    "{} has rank {}, expected {} to {}",
                    label, rank, MIN_RANK, MAX_RANK
                ),
            ));
        }
        let price = product.product_current_price;
        if !price.is_finite() || price < 0.0 {
            return Err(PipelineError::schema(
                stage,
                format!("{} has invalid current price {}", label, price),
            ));
        }
        if !scraped.contains(product.page_url.as_str()) {
            return Err(PipelineError::schema(
                stage,
                format!("{} page_url {} was not scraped", label, product.page_url),
            ));
        }
    }
    Ok(output)
}
