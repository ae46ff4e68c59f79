use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::error::PipelineError;
use crate::generator::research::memory::{MemoryScope, ScopedKeys, StageMemory};
use crate::generator::research::types::StageKind;
use crate::generator::{
    context::GeneratorContext,
    step_forward_agent::{
        AgentDataConfig, DataFormatter, DataSource, FormatterConfig, PromptTemplate,
        StepForwardAgent,
    },
};
use crate::services::SearchHit;
use crate::types::product::{AllSearchResults, SingleSearchResult, SuggestedSearchQueries};
use crate::utils::threads::do_parallel_with_limit;

/// 搜索结果收集员 - 逐条执行检索词，再由模型挑选最值得抓取的结果
#[derive(Default, Clone)]
pub struct ResultCollector;

#[async_trait]
impl StepForwardAgent for ResultCollector {
    type Output = AllSearchResults;

    fn stage(&self) -> StageKind {
        StageKind::ResultCollector
    }

    fn data_config(&self) -> AgentDataConfig {
        AgentDataConfig {
            required_sources: vec![
                DataSource::StageOutput(StageKind::QueryComposer),
                DataSource::Request,
            ],
            optional_sources: vec![],
        }
    }

    fn prompt_template(&self, context: &GeneratorContext) -> PromptTemplate {
        let request = &context.request;
        let company = &context.config.company.name;

        PromptTemplate {
            system_prompt: r#"You are a Search Engine Agent.
Your goal is to search for products based on the suggested search queries.
You receive the raw search engine results for every query and select the results that are most likely to be ecommerce product pages worth comparing."#
                .to_string(),

            opening_instruction: [
                format!(
                    "{} is looking to buy {} at the best prices (value for a price strategy).",
                    company, request.product_name
                ),
                format!(
                    "The company target any of these websites to buy from: {}.",
                    request.websites_list.join(", ")
                ),
                "The company wants to reach all available products on the internet to be compared later in another stage.".to_string(),
                format!("The stores must sell the product in {}.", request.country_name),
                "Collect the best search results from the search results.".to_string(),
            ]
            .join("\n"),

            closing_instruction: r#"
## Requirements
- Only select results from the raw search results listed above; copy their url, title, content, score and search_query exactly
- Prefer product pages over blogs, reviews or category listings
- Return a JSON object containing a non-empty list of search results"#
                .to_string(),

            formatter_config: FormatterConfig::default(),
        }
    }

    /// 执行全部检索词的搜索，保存原始结果并写入提示词
    async fn provide_custom_prompt_content(
        &self,
        context: &GeneratorContext,
    ) -> Result<Option<String>> {
        let queries = context
            .get_stage_output::<SuggestedSearchQueries>(StageKind::QueryComposer)
            .await
            .ok_or_else(|| PipelineError::MissingInput {
                stage: self.stage(),
                input: StageKind::QueryComposer.to_string(),
            })?;

        let hits = collect_search_hits(context, &queries.queries).await?;
        tracing::info!(
            "🔎 {} 条检索词共获得 {} 条去重后的搜索结果",
            queries.queries.len(),
            hits.len()
        );

        context
            .store_to_memory(MemoryScope::RAW, ScopedKeys::SEARCH_HITS, &hits)
            .await?;

        let formatter = DataFormatter::new(self.prompt_template(context).formatter_config);
        Ok(Some(formatter.format_search_results(&AllSearchResults {
            results: hits,
        })
        .replacen("### Selected search results", "### Raw search results", 1)))
    }

    async fn validate(
        &self,
        output: Self::Output,
        context: &GeneratorContext,
    ) -> Result<Self::Output, PipelineError> {
        let hits: Vec<SingleSearchResult> = context
            .get_from_memory(MemoryScope::RAW, ScopedKeys::SEARCH_HITS)
            .await
            .unwrap_or_default();
        validate_selection(output, &hits)
    }
}

/// 按检索词顺序搜索，并发受 max_parallels 限制；任何一次搜索失败即整体失败
async fn collect_search_hits(
    context: &GeneratorContext,
    queries: &[String],
) -> Result<Vec<SingleSearchResult>, PipelineError> {
    let searches: Vec<_> = queries
        .iter()
        .map(|query| {
            let search = context.search.clone();
            let query = query.clone();
            Box::pin(async move {
                let hits = search.search(&query).await;
                (query, hits)
            })
        })
        .collect();

    let responses = do_parallel_with_limit(searches, context.config.llm.max_parallels).await;

    let mut tagged = Vec::new();
    for (query, hits) in responses {
        let hits = hits.map_err(|e| PipelineError::external("search", format!("{:#}", e)))?;
        tagged.extend(tag_hits(&query, hits));
    }

    let deduped = dedup_by_url(tagged);
    if deduped.is_empty() {
        return Err(PipelineError::external(
            "search",
            "search returned no results for any query",
        ));
    }
    Ok(deduped)
}

fn tag_hits(query: &str, hits: Vec<SearchHit>) -> Vec<SingleSearchResult> {
    hits.into_iter()
        .map(|hit| SingleSearchResult {
            title: hit.title,
            url: hit.url,
            content: hit.content,
            score: hit.score,
            search_query: query.to_string(),
        })
        .collect()
}

/// 按URL去重，保留首次出现的结果
pub fn dedup_by_url(results: Vec<SingleSearchResult>) -> Vec<SingleSearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

/// 模型挑选的结果必须非空，且全部来自原始搜索结果。
/// 模型只决定选哪些URL，返回的记录按URL从原始结果重建，重复的URL只保留一次。
pub fn validate_selection(
    output: AllSearchResults,
    hits: &[SingleSearchResult],
) -> Result<AllSearchResults, PipelineError> {
    let stage = StageKind::ResultCollector;
    if output.results.is_empty() {
        return Err(PipelineError::schema(stage, "no search results were selected"));
    }

    let known: HashMap<&str, &SingleSearchResult> =
        hits.iter().map(|h| (h.url.as_str(), h)).collect();
    let mut seen = HashSet::new();
    let mut results = Vec::with_capacity(output.results.len());
    for selected in &output.results {
        let Some(hit) = known.get(selected.url.as_str()) else {
            return Err(PipelineError::schema(
                stage,
                format!("selected url {} is not among the search results", selected.url),
            ));
        };
        if !seen.insert(hit.url.as_str()) {
            tracing::debug!("忽略重复选择的结果: {}", hit.url);
            continue;
        }
        if *hit != selected {
            tracing::debug!("模型改写了 {} 的字段，使用原始搜索结果", hit.url);
        }
        results.push((*hit).clone());
    }
    Ok(AllSearchResults { results })
}
