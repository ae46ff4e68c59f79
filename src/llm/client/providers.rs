//! rig provider适配层

use anyhow::Result;
use rig::{
    agent::Agent,
    client::CompletionClient,
    completion::Prompt,
    extractor::{ExtractionError, Extractor},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::ModelError;
use crate::config::{LLMConfig, LLMProvider};

type OpenAIModel = rig::providers::openai::CompletionModel;
type DeepSeekModel = rig::providers::deepseek::CompletionModel;
type OpenRouterModel = rig::providers::openrouter::CompletionModel;
type AnthropicModel = rig::providers::anthropic::completion::CompletionModel;
type OllamaModel = rig::providers::ollama::CompletionModel<reqwest::Client>;

/// 对各provider变体执行同一个表达式
macro_rules! each_provider {
    ($value:expr, $enum:ident, $inner:ident => $body:expr) => {
        match $value {
            $enum::OpenAI($inner) => $body,
            $enum::DeepSeek($inner) => $body,
            $enum::OpenRouter($inner) => $body,
            $enum::Anthropic($inner) => $body,
            $enum::Ollama($inner) => $body,
        }
    };
}

/// 已按配置构建好的provider客户端
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    DeepSeek(rig::providers::deepseek::Client),
    OpenRouter(rig::providers::openrouter::Client),
    Anthropic(rig::providers::anthropic::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let key = config.api_key.as_str();
        let base_url = config.base_url();
        let client = match config.provider {
            LLMProvider::OpenAI => Self::OpenAI(
                rig::providers::openai::Client::builder(key)
                    .base_url(base_url)
                    .build(),
            ),
            LLMProvider::DeepSeek => Self::DeepSeek(
                rig::providers::deepseek::Client::builder(key)
                    .base_url(base_url)
                    .build(),
            ),
            LLMProvider::OpenRouter => Self::OpenRouter(
                rig::providers::openrouter::Client::builder(key)
                    .base_url(base_url)
                    .build(),
            ),
            LLMProvider::Anthropic => Self::Anthropic(
                rig::providers::anthropic::ClientBuilder::new(key)
                    .base_url(base_url)
                    .build()?,
            ),
            LLMProvider::Ollama => Self::Ollama(
                rig::providers::ollama::Client::builder()
                    .base_url(base_url)
                    .build(),
            ),
        };
        tracing::debug!(
            "🔌 已创建 {} 客户端，模型 {}，地址 {}",
            config.provider,
            config.model,
            base_url
        );
        Ok(client)
    }

    /// 单轮对话Agent，只用于连接检查
    pub fn create_agent(&self, system_prompt: &str, config: &LLMConfig) -> ProviderAgent {
        let model = config.model.as_str();
        let max_tokens = u64::from(config.max_tokens);
        match self {
            Self::OpenAI(client) => ProviderAgent::OpenAI(
                client
                    .completion_model(model)
                    .completions_api()
                    .into_agent_builder()
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .temperature(config.temperature)
                    .build(),
            ),
            // openrouter不接受max_tokens
            Self::OpenRouter(client) => ProviderAgent::OpenRouter(
                client
                    .agent(model)
                    .preamble(system_prompt)
                    .temperature(config.temperature)
                    .build(),
            ),
            Self::DeepSeek(client) => ProviderAgent::DeepSeek(
                client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .temperature(config.temperature)
                    .build(),
            ),
            Self::Anthropic(client) => ProviderAgent::Anthropic(
                client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .temperature(config.temperature)
                    .build(),
            ),
            Self::Ollama(client) => ProviderAgent::Ollama(
                client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .temperature(config.temperature)
                    .build(),
            ),
        }
    }

    /// 按 `T` 的JSON Schema约束输出的Extractor
    pub fn create_extractor<T>(&self, system_prompt: &str, config: &LLMConfig) -> ProviderExtractor<T>
    where
        T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
    {
        let model = config.model.as_str();
        let max_tokens = u64::from(config.max_tokens);
        let params = sampling_params(config);
        match self {
            Self::OpenAI(client) => ProviderExtractor::OpenAI(
                client
                    .extractor_completions_api::<T>(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .additional_params(params)
                    .build(),
            ),
            Self::DeepSeek(client) => ProviderExtractor::DeepSeek(
                client
                    .extractor::<T>(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .additional_params(params.clone())
                    .build(),
            ),
            Self::OpenRouter(client) => ProviderExtractor::OpenRouter(
                client
                    .extractor::<T>(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .additional_params(params.clone())
                    .build(),
            ),
            Self::Anthropic(client) => ProviderExtractor::Anthropic(
                client
                    .extractor::<T>(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .additional_params(params.clone())
                    .build(),
            ),
            Self::Ollama(client) => ProviderExtractor::Ollama(
                client
                    .extractor::<T>(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .additional_params(params.clone())
                    .build(),
            ),
        }
    }
}

/// 抽取请求附带的采样参数；extractor构建器没有temperature方法
pub fn sampling_params(config: &LLMConfig) -> Value {
    json!({ "temperature": config.temperature })
}

impl From<ExtractionError> for ModelError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::NoData => ModelError::InvalidOutput("no data extracted".to_string()),
            ExtractionError::DeserializationError(e) => ModelError::InvalidOutput(e.to_string()),
            ExtractionError::CompletionError(e) => ModelError::Service(e.to_string()),
        }
    }
}

pub enum ProviderAgent {
    OpenAI(Agent<OpenAIModel>),
    DeepSeek(Agent<DeepSeekModel>),
    OpenRouter(Agent<OpenRouterModel>),
    Anthropic(Agent<AnthropicModel>),
    Ollama(Agent<OllamaModel>),
}

impl ProviderAgent {
    pub async fn prompt(&self, prompt: &str) -> Result<String, ModelError> {
        each_provider!(self, ProviderAgent, agent => agent
            .prompt(prompt)
            .await
            .map_err(|e| ModelError::Service(e.to_string())))
    }
}

pub enum ProviderExtractor<T>
where
    T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
{
    OpenAI(Extractor<OpenAIModel, T>),
    DeepSeek(Extractor<DeepSeekModel, T>),
    OpenRouter(Extractor<OpenRouterModel, T>),
    Anthropic(Extractor<AnthropicModel, T>),
    Ollama(Extractor<OllamaModel, T>),
}

impl<T> ProviderExtractor<T>
where
    T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
{
    /// 传输错误可重试，输出无法反序列化则归为 `InvalidOutput`
    pub async fn extract(&self, prompt: &str) -> Result<T, ModelError> {
        Ok(each_provider!(self, ProviderExtractor, extractor => extractor.extract(prompt).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_params_carry_temperature() {
        let mut config = LLMConfig::default();
        config.temperature = 0.3;
        assert_eq!(sampling_params(&config), json!({"temperature": 0.3}));
    }

    #[test]
    fn test_extraction_errors_classified() {
        let invalid: ModelError = ExtractionError::NoData.into();
        assert!(matches!(invalid, ModelError::InvalidOutput(_)));

        let bad_json = serde_json::from_str::<u8>("-1").unwrap_err();
        let invalid: ModelError = ExtractionError::DeserializationError(bad_json).into();
        assert!(!invalid.is_retryable());

        let transport: ModelError = ExtractionError::CompletionError(
            rig::completion::CompletionError::ProviderError("overloaded".to_string()),
        )
        .into();
        assert!(transport.is_retryable());
    }

    #[test]
    fn test_ollama_client_uses_configured_host() {
        let mut config = LLMConfig::default();
        config.provider = LLMProvider::Ollama;
        config.api_base_url = "http://gpu-box:11434".to_string();
        assert_eq!(config.base_url(), "http://gpu-box:11434");
        assert!(matches!(
            ProviderClient::new(&config),
            Ok(ProviderClient::Ollama(_))
        ));
    }
}
