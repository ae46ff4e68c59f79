use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// 默认配置文件名，位于当前工作目录
pub const DEFAULT_CONFIG_FILE: &str = "rankx.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl LLMProvider {
    /// provider的默认API地址
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::DeepSeek => "https://api.deepseek.com",
            LLMProvider::OpenRouter => "https://openrouter.ai/api/v1",
            LLMProvider::Anthropic => "https://api.anthropic.com",
            LLMProvider::Ollama => "http://localhost:11434",
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 产物输出根目录，每个任务在其下拥有独立子目录
    pub output_dir: PathBuf,

    /// 同时运行的任务数上限
    pub max_concurrent_jobs: usize,

    /// 公司背景信息
    pub company: CompanyConfig,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 搜索服务配置
    pub search: SearchConfig,

    /// 网页抓取服务配置
    pub scraper: ScraperConfig,

    /// HTTP服务配置
    pub server: ServerConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// 公司背景，作为报告与检索词的静态上下文
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CompanyConfig {
    pub name: String,
    pub description: String,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址，为空时使用provider默认地址
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 调用次数上限，1表示不重试
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,

    /// 阶段内外部调用的并发上限
    pub max_parallels: usize,
}

/// 搜索服务配置（Tavily兼容接口）
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: String,
    pub api_base_url: String,
    /// basic 或 advanced
    pub search_depth: String,
    /// 每个检索词返回的结果数
    pub max_results: usize,
    pub timeout_seconds: u64,
}

/// 网页抓取服务配置（ScrapeGraph smartscraper兼容接口）
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ScraperConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub timeout_seconds: u64,
    /// 异步抓取任务的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 异步抓取任务的最长等待时间（秒）
    pub poll_timeout_seconds: u64,
    /// 要求抓取服务提取的字段
    pub required_fields: Vec<String>,
}

/// HTTP服务配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 加载配置：显式路径优先，其次当前目录下的默认配置文件，最后使用默认值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let default_config_path = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE);
        if default_config_path.exists() {
            Self::from_file(&default_config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// 使用环境变量覆盖配置，`lookup` 通常为 `std::env::var(..).ok()`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("LLM_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.llm.api_key = key;
        }
        if let Some(provider) = get("LLM_PROVIDER") {
            match provider.parse::<LLMProvider>() {
                Ok(provider) => self.llm.provider = provider,
                Err(e) => tracing::warn!("⚠️ 忽略环境变量 LLM_PROVIDER: {}", e),
            }
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = get("LLM_API_BASE_URL") {
            self.llm.api_base_url = url;
        }
        if let Some(temperature) = get("LLM_TEMPERATURE") {
            match temperature.parse::<f64>() {
                Ok(t) => self.llm.temperature = t,
                Err(_) => tracing::warn!("⚠️ 忽略无效的 LLM_TEMPERATURE: {}", temperature),
            }
        }
        if let Some(key) = get("TAVILY_API_KEY") {
            self.search.api_key = key;
        }
        if let Some(key) = get("SCRAPEGRAPH_API_KEY") {
            self.scraper.api_key = key;
        }
        if let Some(dir) = get("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(jobs) = get("MAX_CONCURRENT_JOBS") {
            match jobs.parse::<usize>() {
                Ok(n) if n > 0 => self.max_concurrent_jobs = n,
                _ => tracing::warn!("⚠️ 忽略无效的 MAX_CONCURRENT_JOBS: {}", jobs),
            }
        }
        if let Some(name) = get("COMPANY_NAME") {
            self.company.name = name;
        }
        if let Some(description) = get("COMPANY_DESCRIPTION") {
            self.company.description = description;
        }
    }

    /// 检查外部服务凭据，返回缺失项
    pub fn validate_api_keys(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.llm.provider != LLMProvider::Ollama && self.llm.api_key.trim().is_empty() {
            errors.push("OPENAI_API_KEY is required".to_string());
        }
        if self.search.api_key.trim().is_empty() {
            errors.push("TAVILY_API_KEY is required".to_string());
        }
        if self.scraper.api_key.trim().is_empty() {
            errors.push("SCRAPEGRAPH_API_KEY is required".to_string());
        }
        errors
    }

    /// 供阶段提示词使用的公司背景
    pub fn company_context(&self) -> String {
        self.company.description.clone()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./ai_agent_output"),
            max_concurrent_jobs: 2,
            company: CompanyConfig::default(),
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            scraper: ScraperConfig::default(),
            server: ServerConfig::default(),
            verbose: false,
        }
    }
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: String::from("RankX"),
            description: String::from(
                "RankX is a company that provides AI solutions to help websites refine their search and recommendation systems.",
            ),
        }
    }
}

impl LLMConfig {
    /// 实际使用的API地址
    pub fn base_url(&self) -> &str {
        let configured = self.api_base_url.trim();
        if configured.is_empty() {
            self.provider.default_base_url()
        } else {
            configured
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: String::new(),
            api_base_url: String::new(),
            model: String::from("gpt-4o"),
            max_tokens: 16384,
            temperature: 0.0,
            retry_attempts: 1,
            retry_delay_ms: 2000,
            timeout_seconds: 300,
            max_parallels: 3,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: String::from("https://api.tavily.com"),
            search_depth: String::from("basic"),
            max_results: 5,
            timeout_seconds: 30,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: String::from("https://api.scrapegraphai.com/v1"),
            timeout_seconds: 120,
            poll_interval_ms: 2000,
            poll_timeout_seconds: 180,
            required_fields: vec![
                "product_title".to_string(),
                "product_image_url".to_string(),
                "product_url".to_string(),
                "product_current_price".to_string(),
                "product_original_price".to_string(),
                "product_discount_percentage".to_string(),
                "product_specs".to_string(),
            ],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8000,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
