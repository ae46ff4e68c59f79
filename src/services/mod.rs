//! 外部服务：网页搜索与网页结构化抓取

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod scraper;
pub mod search;

pub use scraper::ScrapeGraphClient;
pub use search::TavilyClient;

/// 搜索服务返回的单条结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
}

/// 抓取服务返回的页面数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub page_url: String,
    pub details: Value,
}

/// 网页搜索服务
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// 网页结构化抓取服务
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, page_url: &str, required_fields: &[String]) -> Result<ScrapedPage>;
}
