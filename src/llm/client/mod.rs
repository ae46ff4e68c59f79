//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

mod providers;
pub mod scripted;

use providers::ProviderClient;
pub use scripted::{RecordedPrompt, ScriptedModel, ScriptedReply};

/// 模型调用错误
#[derive(Debug, Error)]
pub enum ModelError {
    /// 输出无法按约定的JSON Schema解析，重试无意义
    #[error("model output does not match the expected schema: {0}")]
    InvalidOutput(String),

    /// 传输或API错误
    #[error("{0}")]
    Service(String),

    #[error("model call timed out after {0}s")]
    Timeout(u64),
}

impl ModelError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ModelError::InvalidOutput(_))
    }
}

/// 模型后端：真实的rig provider，或预设应答
#[derive(Clone)]
enum Backend {
    Provider(ProviderClient),
    Scripted(Arc<ScriptedModel>),
}

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    backend: Backend,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        Ok(Self {
            config,
            backend: Backend::Provider(client),
        })
    }

    /// 使用预设应答创建客户端，不访问网络
    pub fn scripted(config: Config, model: Arc<ScriptedModel>) -> Self {
        Self {
            config,
            backend: Backend::Scripted(model),
        }
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        tracing::info!("🔄 正在检查模型连接...");
        match self
            .prompt("connection_check", "You are a helpful assistant.", "Hello")
            .await
        {
            Ok(_) => {
                tracing::info!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                tracing::error!("❌ 模型连接失败: {}", e);
                Err(e.into())
            }
        }
    }

    /// 通用重试逻辑，仅针对服务调用失败与超时；每次调用受超时限制
    async fn retry_with_backoff<T, F, Fut>(
        &self,
        log_tag: &str,
        operation: F,
    ) -> Result<T, ModelError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        let llm_config = &self.config.llm;
        let max_attempts = llm_config.retry_attempts.max(1);
        let timeout = Duration::from_secs(llm_config.timeout_seconds);
        let mut attempts = 0;

        loop {
            let outcome = match tokio::time::timeout(timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(ModelError::Timeout(llm_config.timeout_seconds)),
            };

            match outcome {
                Ok(result) => return Ok(result),
                Err(err) if !err.is_retryable() => {
                    tracing::warn!("⚠️ [{}] 模型输出不符合约定，不再重试: {}", log_tag, err);
                    return Err(err);
                }
                Err(err) => {
                    attempts += 1;
                    if attempts >= max_attempts {
                        tracing::error!(
                            "❌ [{}] 调用模型服务出错，尝试 {} 次均失败: {}",
                            log_tag,
                            attempts,
                            err
                        );
                        return Err(err);
                    }
                    tracing::warn!(
                        "❌ [{}] 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        log_tag,
                        attempts,
                        max_attempts,
                        err
                    );
                    tokio::time::sleep(Duration::from_millis(llm_config.retry_delay_ms)).await;
                }
            }
        }
    }

    /// 数据提取方法，按 `T` 的JSON Schema约束模型输出
    pub async fn extract<T>(
        &self,
        log_tag: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<T, ModelError>
    where
        T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
    {
        tracing::debug!(
            "🤖 [{}] 调用模型提取结构化数据，提示词长度 {}",
            log_tag,
            system_prompt.len() + user_prompt.len()
        );

        match &self.backend {
            Backend::Provider(client) => {
                let extractor = client.create_extractor::<T>(system_prompt, &self.config.llm);
                self.retry_with_backoff(log_tag, || async {
                    extractor.extract(user_prompt).await
                })
                .await
            }
            Backend::Scripted(model) => {
                self.retry_with_backoff(log_tag, || async {
                    model.extract(log_tag, system_prompt, user_prompt)
                })
                .await
            }
        }
    }

    /// 简化的单轮对话方法（不使用工具）
    pub async fn prompt(
        &self,
        log_tag: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ModelError> {
        match &self.backend {
            Backend::Provider(client) => {
                let agent = client.create_agent(system_prompt, &self.config.llm);
                self.retry_with_backoff(log_tag, || async { agent.prompt(user_prompt).await })
                    .await
            }
            Backend::Scripted(model) => {
                self.retry_with_backoff(log_tag, || async {
                    model.prompt(log_tag, system_prompt, user_prompt)
                })
                .await
            }
        }
    }
}
