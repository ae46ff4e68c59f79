use crate::error::PipelineError;
use crate::generator::research::types::StageKind;
use crate::generator::{
    context::GeneratorContext,
    step_forward_agent::{
        AgentDataConfig, DataSource, FormatterConfig, PromptTemplate, StepForwardAgent,
    },
};
use crate::types::product::SuggestedSearchQueries;
use async_trait::async_trait;

/// 检索词撰写员 - 根据商品与公司背景生成一组面向电商商品页的搜索关键词
#[derive(Default, Clone)]
pub struct QueryComposer;

#[async_trait]
impl StepForwardAgent for QueryComposer {
    type Output = SuggestedSearchQueries;

    fn stage(&self) -> StageKind {
        StageKind::QueryComposer
    }

    fn data_config(&self) -> AgentDataConfig {
        AgentDataConfig {
            required_sources: vec![DataSource::Request, DataSource::CompanyContext],
            optional_sources: vec![],
        }
    }

    fn prompt_template(&self, context: &GeneratorContext) -> PromptTemplate {
        let request = &context.request;
        let company = &context.config.company.name;

        PromptTemplate {
            system_prompt: r#"You are a Search Queries Recommendation Agent.
Your goal is to provide a list of suggested search queries to be passed to the search engine.
The queries must be varied and looking for specific items.
You help a procurement team look for products by turning a product need and its business context into precise search engine queries."#
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
                format!("Generate at maximum {} queries.", request.no_keywords),
                format!(
                    "The search keywords must be in {} language.",
                    request.language
                ),
                "Search keywords must contains specific brands, types or technologies. Avoid general keywords.".to_string(),
                "The search query must reach an ecommerce webpage for the product, and not a blog or listing page.".to_string(),
            ]
            .join("\n"),

            closing_instruction: format!(
                "\nReturn a JSON object containing a list of between 1 and {} suggested search queries. Every query must be a non-empty string.",
                request.no_keywords
            ),

            formatter_config: FormatterConfig::default(),
        }
    }

    async fn validate(
        &self,
        output: Self::Output,
        context: &GeneratorContext,
    ) -> Result<Self::Output, PipelineError> {
        validate_queries(output, context.request.no_keywords as usize)
    }
}

/// 检索词数量必须在 1..=max_queries 之间，且每条非空
pub fn validate_queries(
    output: SuggestedSearchQueries,
    max_queries: usize,
) -> Result<SuggestedSearchQueries, PipelineError> {
    let stage = StageKind::QueryComposer;
    if output.queries.is_empty() {
        return Err(PipelineError::schema(stage, "no search queries were produced"));
    }
    if output.queries.len() > max_queries {
        return Err(PipelineError::schema(
            stage,
            format!(
                "{} queries produced but at most {} are allowed",
                output.queries.len(),
                max_queries
            ),
        ));
    }
    if let Some(i) = output.queries.iter().position(|q| q.trim().is_empty()) {
        return Err(PipelineError::schema(
            stage,
            format!("query #{} is empty", i + 1),
        ));
    }
    Ok(output)
}
