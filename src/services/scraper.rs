use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

use super::{PageScraper, ScrapedPage};
use crate::config::ScraperConfig;

/// ScrapeGraph smartscraper兼容的网页抓取客户端
pub struct ScrapeGraphClient {
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    poll_timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SmartScraperRequest<'a> {
    website_url: &'a str,
    user_prompt: String,
}

#[derive(Debug, Deserialize)]
struct SmartScraperResponse {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// 抓取任务状态
enum ScrapeState {
    Done(Value),
    Pending(String),
}

impl ScrapeGraphClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            poll_timeout: Duration::from_secs(config.poll_timeout_seconds),
            client,
        })
    }

    /// 提取指令，与字段列表一起发给抓取服务
    pub fn user_prompt(required_fields: &[String]) -> String {
        let fields = serde_json::to_string(required_fields).unwrap_or_else(|_| "[]".to_string());
        format!("Extract {} from the web page.", fields)
    }

    fn interpret(&self, page_url: &str, response: SmartScraperResponse) -> Result<ScrapeState> {
        if let Some(error) = response.error.filter(|e| !e.trim().is_empty()) {
            return Err(anyhow!("ScrapeGraph failed for {}: {}", page_url, error));
        }

        match response.status.as_deref() {
            Some("queued") | Some("processing") | Some("pending") => {
                let request_id = response
                    .request_id
                    .ok_or_else(|| anyhow!("ScrapeGraph returned pending status without request_id"))?;
                Ok(ScrapeState::Pending(request_id))
            }
            Some("failed") => Err(anyhow!("ScrapeGraph failed for {}", page_url)),
            _ => response
                .result
                .filter(|r| !r.is_null())
                .map(ScrapeState::Done)
                .ok_or_else(|| anyhow!("ScrapeGraph returned no result for {}", page_url)),
        }
    }

    async fn poll(&self, page_url: &str, request_id: &str) -> Result<Value> {
        let started = Instant::now();
        loop {
            if started.elapsed() >= self.poll_timeout {
                anyhow::bail!(
                    "ScrapeGraph request {} for {} did not finish within {}s",
                    request_id,
                    page_url,
                    self.poll_timeout.as_secs()
                );
            }
            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .client
                .get(format!("{}/smartscraper/{}", self.base_url, request_id))
                .header("SGAI-APIKEY", &self.api_key)
                .send()
                .await
                .context("Failed to poll ScrapeGraph request")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("ScrapeGraph API error {}: {}", status, body);
            }

            let body: SmartScraperResponse = response
                .json()
                .await
                .context("Failed to parse ScrapeGraph response")?;

            match self.interpret(page_url, body)? {
                ScrapeState::Done(result) => return Ok(result),
                ScrapeState::Pending(_) => {
                    tracing::debug!("⏳ 抓取任务 {} 仍在处理中", request_id);
                }
            }
        }
    }
}

#[async_trait]
impl PageScraper for ScrapeGraphClient {
    async fn scrape(&self, page_url: &str, required_fields: &[String]) -> Result<ScrapedPage> {
        let parsed = Url::parse(page_url).context(format!("Invalid page url: {}", page_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("Unsupported url scheme for scraping: {}", page_url);
        }

        let request = SmartScraperRequest {
            website_url: page_url,
            user_prompt: Self::user_prompt(required_fields),
        };

        let response = self
            .client
            .post(format!("{}/smartscraper", self.base_url))
            .header("SGAI-APIKEY", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send ScrapeGraph request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("ScrapeGraph API error {}: {}", status, body);
        }

        let body: SmartScraperResponse = response
            .json()
            .await
            .context("Failed to parse ScrapeGraph response")?;

        let details = match self.interpret(page_url, body)? {
            ScrapeState::Done(result) => result,
            ScrapeState::Pending(request_id) => self.poll(page_url, &request_id).await?,
        };

        tracing::debug!("🕸️ 已抓取页面 {}", page_url);

        Ok(ScrapedPage {
            page_url: page_url.to_string(),
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_lists_fields() {
        let prompt = ScrapeGraphClient::user_prompt(&[
            "product_title".to_string(),
            "product_current_price".to_string(),
        ]);
        assert_eq!(
            prompt,
            r#"Extract ["product_title","product_current_price"] from the web page."#
        );
    }

    #[tokio::test]
    async fn test_rejects_non_http_urls() {
        let client = ScrapeGraphClient::new(&ScraperConfig::default()).unwrap();
        assert!(client.scrape("ftp://a.example.com/x", &[]).await.is_err());
        assert!(client.scrape("not a url", &[]).await.is_err());
    }
}
