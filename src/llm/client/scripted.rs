//! 预设应答的模型后端，用于离线运行和测试

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::ModelError;

/// 预设的单条应答
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// 结构化输出
    Json(Value),
    /// 纯文本输出
    Text(String),
    /// 模拟服务调用失败
    Fail(String),
}

/// 一次被记录的模型调用
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPrompt {
    pub tag: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// 按调用标签返回固定应答，并记录收到的提示词
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: HashMap<String, ScriptedReply>,
    calls: Mutex<Vec<RecordedPrompt>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, tag: impl Into<String>, value: Value) -> Self {
        self.replies.insert(tag.into(), ScriptedReply::Json(value));
        self
    }

    pub fn with_text(mut self, tag: impl Into<String>, text: impl Into<String>) -> Self {
        self.replies
            .insert(tag.into(), ScriptedReply::Text(text.into()));
        self
    }

    pub fn with_failure(mut self, tag: impl Into<String>, message: impl Into<String>) -> Self {
        self.replies
            .insert(tag.into(), ScriptedReply::Fail(message.into()));
        self
    }

    /// 已记录的全部调用
    pub fn calls(&self) -> Vec<RecordedPrompt> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, tag: &str, system_prompt: &str, user_prompt: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedPrompt {
                tag: tag.to_string(),
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
            });
        }
    }

    fn reply(&self, tag: &str) -> Result<&ScriptedReply, ModelError> {
        self.replies
            .get(tag)
            .ok_or_else(|| ModelError::Service(format!("no scripted reply for {}", tag)))
    }

    /// 与rig extractor一致：无法反序列化的应答视为输出不合约定
    pub fn extract<T>(
        &self,
        tag: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<T, ModelError>
    where
        T: DeserializeOwned,
    {
        self.record(tag, system_prompt, user_prompt);
        match self.reply(tag)? {
            ScriptedReply::Json(value) => serde_json::from_value(value.clone())
                .map_err(|e| ModelError::InvalidOutput(e.to_string())),
            ScriptedReply::Text(text) => {
                serde_json::from_str(text).map_err(|e| ModelError::InvalidOutput(e.to_string()))
            }
            ScriptedReply::Fail(message) => Err(ModelError::Service(message.clone())),
        }
    }

    pub fn prompt(
        &self,
        tag: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ModelError> {
        self.record(tag, system_prompt, user_prompt);
        match self.reply(tag)? {
            ScriptedReply::Json(value) => Ok(value.to_string()),
            ScriptedReply::Text(text) => Ok(text.clone()),
            ScriptedReply::Fail(message) => Err(ModelError::Service(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Queries {
        queries: Vec<String>,
    }

    #[test]
    fn test_extract_records_prompt() {
        let model = ScriptedModel::new().with_json("A", json!({"queries": ["q1"]}));

        let out: Queries = model.extract("A", "sys", "user").unwrap();

        assert_eq!(out.queries, vec!["q1".to_string()]);
        assert_eq!(model.calls().len(), 1);
        assert_eq!(model.calls()[0].user_prompt, "user");
    }

    #[test]
    fn test_schema_mismatch_is_error() {
        let model = ScriptedModel::new()
            .with_json("A", json!({"items": []}))
            .with_text("B", "not json");
        let out: Result<Queries, ModelError> = model.extract("A", "sys", "user");
        assert!(matches!(out, Err(ModelError::InvalidOutput(_))));
        let out: Result<Queries, ModelError> = model.extract("B", "sys", "user");
        assert!(matches!(out, Err(ModelError::InvalidOutput(_))));
    }

    #[test]
    fn test_unknown_tag_and_failure() {
        let model = ScriptedModel::new().with_failure("B", "boom");
        assert!(model.prompt("A", "s", "u").is_err());
        let err = model.prompt("B", "s", "u").unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "boom");
    }
}
