use crate::config::{Config, LLMProvider};
use crate::error::ValidationErrors;
use crate::generator::workflow::launch;
use crate::types::request::ResearchRequest;
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

/// RankX Research - 由Rust与AI驱动的商品采购调研引擎
#[derive(Parser, Debug)]
#[command(name = "rankx-research")]
#[command(
    about = "AI-based product procurement research engine. It composes search queries, collects and scrapes product pages, ranks the products and writes a professional procurement report."
)]
#[command(version)]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// LLM Provider (openai, deepseek, openrouter, anthropic, ollama)
    #[arg(long, global = true)]
    pub llm_provider: Option<String>,

    /// 模型名称
    #[arg(long, global = true)]
    pub llm_model: Option<String>,

    /// LLM API基地址
    #[arg(long, global = true)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long, global = true)]
    pub llm_api_key: Option<String>,

    /// 温度参数
    #[arg(long, global = true)]
    pub temperature: Option<f64>,

    /// 单个阶段内外部调用的最大并发数
    #[arg(long, global = true)]
    pub max_parallels: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 启动REST接口与调研面板
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
    /// 在前台执行一次调研
    Run(RunArgs),
    /// 检查所需的API凭据
    CheckEnv,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// 要调研的商品
    #[arg(long)]
    pub product: String,

    /// 目标网站，可重复指定
    #[arg(long = "website", required = true)]
    pub websites: Vec<String>,

    /// 商品需在该国家销售
    #[arg(long)]
    pub country: String,

    /// 检索词语言
    #[arg(long)]
    pub language: Option<String>,

    /// 检索词数量上限
    #[arg(long)]
    pub max_keywords: Option<i64>,

    /// 搜索结果得分阈值
    #[arg(long)]
    pub score_threshold: Option<f64>,

    /// 推荐商品数量
    #[arg(long)]
    pub top_recommendations: Option<i64>,

    /// 产物目录，默认为配置中的 output_dir
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    /// 与接口提交相同的JSON形式
    pub fn to_request_value(&self) -> Value {
        let mut body = Map::new();
        body.insert("product_name".to_string(), json!(self.product));
        body.insert("websites_list".to_string(), json!(self.websites));
        body.insert("country_name".to_string(), json!(self.country));
        if let Some(language) = &self.language {
            body.insert("language".to_string(), json!(language));
        }
        if let Some(max_keywords) = self.max_keywords {
            body.insert("no_keywords".to_string(), json!(max_keywords));
        }
        if let Some(score_threshold) = self.score_threshold {
            body.insert("score_th".to_string(), json!(score_threshold));
        }
        if let Some(top) = self.top_recommendations {
            body.insert("top_recommendations_no".to_string(), json!(top));
        }
        Value::Object(body)
    }

    pub fn to_request(&self) -> Result<ResearchRequest, ValidationErrors> {
        ResearchRequest::from_value(&self.to_request_value())
    }
}

impl Args {
    /// 依次叠加配置文件、环境变量与命令行参数
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_env(|key| std::env::var(key).ok());
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// 命令行参数优先级最高
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(provider_str) = &self.llm_provider {
            match provider_str.parse::<LLMProvider>() {
                Ok(provider) => config.llm.provider = provider,
                Err(_) => tracing::warn!(
                    "⚠️ 警告: 未知的provider: {}，使用 {}",
                    provider_str,
                    config.llm.provider
                ),
            }
        }
        if let Some(model) = &self.llm_model {
            config.llm.model = model.clone();
        }
        if let Some(llm_api_base_url) = &self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url.clone();
        }
        if let Some(llm_api_key) = &self.llm_api_key {
            config.llm.api_key = llm_api_key.clone();
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(max_parallels) = self.max_parallels {
            config.llm.max_parallels = max_parallels;
        }

        if let Command::Serve { host, port } = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }

        config.verbose = config.verbose || self.verbose;
    }

    /// 执行子命令
    pub async fn execute(self, config: Config) -> Result<()> {
        match self.command {
            Command::Serve { .. } => {
                for missing in config.validate_api_keys() {
                    tracing::warn!("⚠️ {}，提交的任务将会失败", missing);
                }
                crate::server::serve(&config).await
            }
            Command::Run(run) => {
                let request = run.to_request()?;
                let missing = config.validate_api_keys();
                if !missing.is_empty() {
                    bail!("Missing credentials: {}", missing.join("; "));
                }

                let output_dir = run
                    .output
                    .clone()
                    .unwrap_or_else(|| config.output_dir.clone());
                let outcome = launch(&config, request, output_dir).await?;

                println!("🎉 调研完成，产物目录: {}", outcome.output_directory);
                println!(
                    "   检索词 {} 条，搜索结果 {} 条，商品 {} 个",
                    outcome.query_count, outcome.result_count, outcome.product_count
                );
                for artifact in &outcome.artifacts {
                    println!("   - {} ({} bytes)", artifact.name, artifact.size);
                }
                Ok(())
            }
            Command::CheckEnv => {
                let missing = config.validate_api_keys();
                if missing.is_empty() {
                    println!("✅ 所需的API凭据均已配置 (provider: {})", config.llm.provider);
                    return Ok(());
                }
                for item in &missing {
                    println!("❌ {}", item);
                }
                bail!("{} credential(s) missing", missing.len())
            }
        }
    }
}
