use thiserror::Error;

use crate::generator::research::types::StageKind;

/// 流水线执行错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 模型输出不满足阶段约定，不会重试
    #[error("{stage} produced invalid output: {reason}")]
    SchemaViolation { stage: StageKind, reason: String },

    /// 模型、搜索或抓取服务调用失败
    #[error("{service} call failed: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },

    /// 上游阶段的数据缺失
    #[error("{stage} is missing required input: {input}")]
    MissingInput { stage: StageKind, input: String },
}

impl PipelineError {
    pub fn schema(stage: StageKind, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            stage,
            reason: reason.into(),
        }
    }

    pub fn external(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::ExternalService {
            service,
            message: err.to_string(),
        }
    }
}

/// 提交参数校验错误，包含全部问题
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid research request: {}", errors.join("; "))]
pub struct ValidationErrors {
    pub errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }
}
