use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::PipelineError;
use crate::generator::context::GeneratorContext;
use crate::generator::research::memory::StageMemory;
use crate::generator::research::types::StageKind;
use crate::llm::client::ModelError;
use crate::types::product::{AllExtractedProducts, AllSearchResults, SuggestedSearchQueries};
use crate::types::request::ResearchRequest;

/// 数据源配置
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// 上游阶段的输出
    StageOutput(StageKind),
    /// 调研请求参数
    Request,
    /// 公司背景
    CompanyContext,
}

/// Agent数据配置 - 声明所需的数据源
#[derive(Debug, Clone)]
pub struct AgentDataConfig {
    /// 必需的数据源 - 缺少时执行失败
    pub required_sources: Vec<DataSource>,
    /// 可选的数据源 - 缺少时不影响执行
    pub optional_sources: Vec<DataSource>,
}

/// 数据格式化配置
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// 搜索结果正文截断长度，None表示不截断
    pub content_truncate_length: Option<usize>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            content_truncate_length: Some(1200),
        }
    }
}

/// Prompt模板配置
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// 系统提示词
    pub system_prompt: String,
    /// 开头的说明性指令
    pub opening_instruction: String,
    /// 结尾的强调性指令
    pub closing_instruction: String,
    /// 数据格式化配置
    pub formatter_config: FormatterConfig,
}

/// 通用数据格式化器
pub struct DataFormatter {
    config: FormatterConfig,
}

impl DataFormatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// 按配置截断长文本（按字符计）
    pub fn truncate(&self, text: &str) -> String {
        match self.config.content_truncate_length {
            Some(limit) if text.chars().count() > limit => {
                let head: String = text.chars().take(limit).collect();
                format!("{}...(truncated)", head)
            }
            _ => text.to_string(),
        }
    }

    pub fn format_request(&self, request: &ResearchRequest) -> String {
        format!(
            "### Research request\n- Product: {}\n- Target websites: {}\n- Country: {}\n- Language: {}\n\n",
            request.product_name,
            request.websites_list.join(", "),
            request.country_name,
            request.language
        )
    }

    pub fn format_company_context(&self, company_name: &str, context: &str) -> String {
        format!("### About {}\n{}\n\n", company_name, context)
    }

    pub fn format_queries(&self, queries: &SuggestedSearchQueries) -> String {
        let mut content = String::from("### Suggested search queries\n");
        for (i, query) in queries.queries.iter().enumerate() {
            content.push_str(&format!("{}. {}\n", i + 1, query));
        }
        content.push('\n');
        content
    }

    pub fn format_search_results(&self, results: &AllSearchResults) -> String {
        let mut content = String::from("### Selected search results\n");
        for (i, result) in results.results.iter().enumerate() {
            content.push_str(&format!(
                "{}. {} ({})\n   score: {:.4}, query: {}\n   {}\n",
                i + 1,
                result.title,
                result.url,
                result.score,
                result.search_query,
                self.truncate(&result.content)
            ));
        }
        content.push('\n');
        content
    }

    pub fn format_products(&self, products: &AllExtractedProducts) -> String {
        format!(
            "### Extracted products\n```json\n{}\n```\n\n",
            serde_json::to_string_pretty(products).unwrap_or_default()
        )
    }
}

/// 标准的阶段Agent Prompt构建器
pub struct GeneratorPromptBuilder {
    template: PromptTemplate,
    formatter: DataFormatter,
}

impl GeneratorPromptBuilder {
    pub fn new(template: PromptTemplate) -> Self {
        let formatter = DataFormatter::new(template.formatter_config.clone());
        Self {
            template,
            formatter,
        }
    }

    /// 构建系统提示词和用户提示词，custom_content插入在参考材料最前面
    pub async fn build_prompts(
        &self,
        context: &GeneratorContext,
        data_sources: &[DataSource],
        custom_content: Option<String>,
    ) -> Result<(String, String)> {
        let system_prompt = self.template.system_prompt.clone();
        let user_prompt = self
            .build_standard_user_prompt(context, data_sources, custom_content)
            .await?;
        Ok((system_prompt, user_prompt))
    }

    async fn build_standard_user_prompt(
        &self,
        context: &GeneratorContext,
        data_sources: &[DataSource],
        custom_content: Option<String>,
    ) -> Result<String> {
        let mut prompt = String::new();

        prompt.push_str(&self.template.opening_instruction);
        prompt.push_str("\n\n## Reference material\n");

        if let Some(custom) = custom_content {
            prompt.push_str(&custom);
            prompt.push('\n');
        }

        for source in data_sources {
            match source {
                DataSource::Request => {
                    prompt.push_str(&self.formatter.format_request(&context.request));
                }
                DataSource::CompanyContext => {
                    prompt.push_str(&self.formatter.format_company_context(
                        &context.config.company.name,
                        &context.config.company_context(),
                    ));
                }
                DataSource::StageOutput(stage) => match stage {
                    StageKind::QueryComposer => {
                        if let Some(queries) = context
                            .get_stage_output::<SuggestedSearchQueries>(*stage)
                            .await
                        {
                            prompt.push_str(&self.formatter.format_queries(&queries));
                        }
                    }
                    StageKind::ResultCollector => {
                        if let Some(results) =
                            context.get_stage_output::<AllSearchResults>(*stage).await
                        {
                            prompt.push_str(&self.formatter.format_search_results(&results));
                        }
                    }
                    StageKind::PageExtractor => {
                        if let Some(products) =
                            context.get_stage_output::<AllExtractedProducts>(*stage).await
                        {
                            prompt.push_str(&self.formatter.format_products(&products));
                        }
                    }
                    StageKind::ReportComposer => {}
                },
            }
        }

        prompt.push_str(&self.template.closing_instruction);
        Ok(prompt)
    }
}

/// 流水线阶段Agent：声明数据源与提示词模板，由默认的execute完成调用、校验与落盘
#[async_trait]
pub trait StepForwardAgent: Send + Sync {
    /// Agent的输出类型 - 必须支持JSON序列化
    type Output: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static;

    /// 所属阶段
    fn stage(&self) -> StageKind;

    /// 数据源配置
    fn data_config(&self) -> AgentDataConfig;

    /// Prompt模板配置
    fn prompt_template(&self, context: &GeneratorContext) -> PromptTemplate;

    /// 可选的自定义prompt内容提供钩子，也是阶段调用外部服务的位置
    async fn provide_custom_prompt_content(
        &self,
        _context: &GeneratorContext,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    /// 校验模型输出，不满足约定时直接拒绝
    async fn validate(
        &self,
        output: Self::Output,
        context: &GeneratorContext,
    ) -> Result<Self::Output, PipelineError>;

    /// 生成写入磁盘的产物内容，默认为格式化JSON
    async fn render_artifact(
        &self,
        output: &Self::Output,
        _context: &GeneratorContext,
    ) -> Result<String> {
        Ok(serde_json::to_string_pretty(output)?)
    }

    /// 默认实现的execute方法：数据检查、构建提示词、调用模型、校验、存储、落盘
    async fn execute(&self, context: &GeneratorContext) -> Result<Self::Output> {
        let stage = self.stage();
        let config = self.data_config();

        for source in &config.required_sources {
            if let DataSource::StageOutput(upstream) = source
                && !context.has_stage_output(*upstream).await
            {
                return Err(PipelineError::MissingInput {
                    stage,
                    input: upstream.to_string(),
                }
                .into());
            }
        }

        context.progress.report(stage.progress_message()).await;

        let all_sources = [config.required_sources, config.optional_sources].concat();
        let template = self.prompt_template(context);
        let prompt_builder = GeneratorPromptBuilder::new(template);

        let custom_content = self.provide_custom_prompt_content(context).await?;

        let (system_prompt, user_prompt) = prompt_builder
            .build_prompts(context, &all_sources, custom_content)
            .await?;

        let output: Self::Output = context
            .llm_client
            .extract(&stage.to_string(), &system_prompt, &user_prompt)
            .await
            .map_err(|e| match e {
                ModelError::InvalidOutput(reason) => PipelineError::schema(stage, reason),
                other => PipelineError::external("model", other),
            })?;

        let output = self.validate(output, context).await?;

        context.store_stage_output(stage, &output).await?;

        let artifact = self.render_artifact(&output, context).await?;
        context.outlet.write(stage.artifact_file(), &artifact)?;

        tracing::info!("✅ Sub-Agent [{}]执行完成", stage);
        Ok(output)
    }
}
