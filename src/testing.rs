//! 离线运行流水线用的替身服务与样例数据，单元测试、集成测试共用

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::generator::research::types::StageKind;
use crate::generator::workflow::ResearchPipeline;
use crate::jobs::{Job, JobManager};
use crate::llm::client::{LLMClient, ScriptedModel};
use crate::services::{PageScraper, ScrapedPage, SearchEngine, SearchHit};

/// 返回固定结果的搜索服务
#[derive(Debug, Default)]
pub struct StaticSearch {
    by_query: HashMap<String, Vec<SearchHit>>,
    fallback: Vec<SearchHit>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    /// 任意检索词都返回同一组结果
    pub fn new(fallback: Vec<SearchHit>) -> Self {
        Self {
            fallback,
            ..Default::default()
        }
    }

    /// 每次搜索都失败
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.by_query.insert(query.into(), hits);
        self
    }

    /// 收到过的检索词，按调用顺序
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchEngine for StaticSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if let Some(message) = &self.failure {
            bail!("{}", message);
        }
        Ok(self
            .by_query
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// 按页面地址返回固定内容的抓取服务
#[derive(Debug, Default)]
pub struct StaticScraper {
    pages: HashMap<String, Value>,
    failure: Option<String>,
    scraped: Mutex<Vec<String>>,
}

impl StaticScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次抓取都失败
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_page(mut self, page_url: impl Into<String>, details: Value) -> Self {
        self.pages.insert(page_url.into(), details);
        self
    }

    /// 抓取过的页面，按调用顺序
    pub fn scraped(&self) -> Vec<String> {
        self.scraped
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageScraper for StaticScraper {
    async fn scrape(&self, page_url: &str, _required_fields: &[String]) -> Result<ScrapedPage> {
        if let Ok(mut scraped) = self.scraped.lock() {
            scraped.push(page_url.to_string());
        }
        if let Some(message) = &self.failure {
            bail!("{}", message);
        }
        let details = self
            .pages
            .get(page_url)
            .cloned()
            .unwrap_or_else(|| json!({ "product_url": page_url }));
        Ok(ScrapedPage {
            page_url: page_url.to_string(),
            details,
        })
    }
}

/// 测试用配置：不重试，重试间隔极短
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.llm.retry_attempts = 1;
    config.llm.retry_delay_ms = 1;
    config.llm.max_parallels = 2;
    config
}

/// 四个阶段都给出合法应答的模型
pub fn scripted_model() -> ScriptedModel {
    ScriptedModel::new()
        .with_text("connection_check", "Hello!")
        .with_json(
            StageKind::QueryComposer.to_string(),
            json!(fixtures::suggested_queries()),
        )
        .with_json(
            StageKind::ResultCollector.to_string(),
            json!(fixtures::search_results()),
        )
        .with_json(
            StageKind::PageExtractor.to_string(),
            json!(fixtures::extracted_products()),
        )
        .with_json(
            StageKind::ReportComposer.to_string(),
            json!(fixtures::report_draft()),
        )
}

/// 使用预设模型与替身服务组装流水线
pub fn scripted_pipeline(
    config: Config,
    model: Arc<ScriptedModel>,
    search: Arc<dyn SearchEngine>,
    scraper: Arc<dyn PageScraper>,
) -> ResearchPipeline {
    let llm_client = LLMClient::scripted(config.clone(), model);
    ResearchPipeline::new(config, llm_client, search, scraper)
}

/// 一切正常的离线流水线
pub fn happy_pipeline(config: Config) -> ResearchPipeline {
    scripted_pipeline(
        config,
        Arc::new(scripted_model()),
        Arc::new(StaticSearch::new(fixtures::search_hits())),
        Arc::new(fixtures::product_pages()),
    )
}

/// 轮询直到任务结束，超过10秒视为失败
pub async fn wait_for_terminal(manager: &JobManager, job_id: &str) -> Job {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    loop {
        match manager.get_status(job_id).await {
            Ok(job) if job.status.is_terminal() => return job,
            Ok(_) => {}
            Err(e) => panic!("job {} disappeared: {}", job_id, e),
        }
        if std::time::Instant::now() > deadline {
            panic!("job {} did not finish in time", job_id);
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

pub mod fixtures {
    use serde_json::{Value, json};

    use super::StaticScraper;
    use crate::services::SearchHit;
    use crate::types::product::{
        AllExtractedProducts, AllSearchResults, ProductSpec, ReportDraft, SingleExtractedProduct,
        SingleSearchResult, SuggestedSearchQueries,
    };
    use crate::types::request::ResearchRequest;

    pub const DEDICA_URL: &str = "https://a.example.com/delonghi-dedica-ec685";
    pub const BAMBINO_URL: &str = "https://a.example.com/breville-bambino-plus";
    pub const BLOG_URL: &str = "https://a.example.com/blog/best-espresso-machines";
    pub const BARISTA_URL: &str = "https://a.example.com/sage-barista-express";

    /// 请求体的原始JSON
    pub fn espresso_request_value() -> Value {
        json!({
            "product_name": "espresso machine",
            "websites_list": ["a.example.com"],
            "country_name": "Morocco",
            "language": "English",
            "no_keywords": 5,
            "score_th": 0.1,
            "top_recommendations_no": 3
        })
    }

    pub fn espresso_request() -> ResearchRequest {
        ResearchRequest {
            product_name: "espresso machine".to_string(),
            websites_list: vec!["a.example.com".to_string()],
            country_name: "Morocco".to_string(),
            language: "English".to_string(),
            no_keywords: 5,
            score_th: 0.1,
            top_recommendations_no: 3,
        }
    }

    pub fn suggested_queries() -> SuggestedSearchQueries {
        SuggestedSearchQueries {
            queries: vec![
                "delonghi dedica espresso machine morocco".to_string(),
                "breville bambino plus espresso price".to_string(),
            ],
        }
    }

    /// 四条得分各不相同的搜索结果，得分前三的是商品页
    pub fn search_hits() -> Vec<SearchHit> {
        vec![
            hit(DEDICA_URL, "De'Longhi Dedica EC685 Espresso Machine", 0.92),
            hit(BAMBINO_URL, "Breville Bambino Plus", 0.85),
            hit(BLOG_URL, "The 10 best espresso machines of the year", 0.20),
            hit(BARISTA_URL, "Sage Barista Express", 0.71),
        ]
    }

    fn hit(url: &str, title: &str, score: f64) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            url: url.to_string(),
            content: format!("{} with 15 bar pump. Free delivery.", title),
            score,
        }
    }

    /// 第一条检索词得到的全部结果
    pub fn search_results() -> AllSearchResults {
        let query = &suggested_queries().queries[0];
        AllSearchResults {
            results: search_hits()
                .into_iter()
                .map(|h| SingleSearchResult {
                    title: h.title,
                    url: h.url,
                    content: h.content,
                    score: h.score,
                    search_query: query.clone(),
                })
                .collect(),
        }
    }

    pub fn extracted_products() -> AllExtractedProducts {
        AllExtractedProducts {
            products: vec![
                product(
                    DEDICA_URL,
                    "De'Longhi Dedica EC685",
                    2490.0,
                    Some(2990.0),
                    4,
                    vec![("Pressure", "15 bar"), ("Water tank", "1.1 L")],
                ),
                product(
                    BAMBINO_URL,
                    "Breville Bambino Plus",
                    4200.0,
                    None,
                    5,
                    vec![
                        ("Pressure", "9 bar"),
                        ("Heating", "ThermoJet 3s"),
                        ("Milk frothing", "Automatic"),
                    ],
                ),
                product(
                    BARISTA_URL,
                    "Sage Barista Express",
                    6100.0,
                    None,
                    3,
                    vec![("Grinder", "Integrated conical burr")],
                ),
            ],
        }
    }

    fn product(
        page_url: &str,
        title: &str,
        price: f64,
        original_price: Option<f64>,
        rank: u8,
        specs: Vec<(&str, &str)>,
    ) -> SingleExtractedProduct {
        SingleExtractedProduct {
            page_url: page_url.to_string(),
            product_title: title.to_string(),
            product_image_url: format!("{}/image.jpg", page_url),
            product_url: page_url.to_string(),
            product_current_price: price,
            product_original_price: original_price,
            product_discount_percentage: original_price
                .map(|original| ((original - price) / original * 100.0).round()),
            product_specs: specs
                .into_iter()
                .map(|(name, value)| ProductSpec {
                    specification_name: name.to_string(),
                    specification_value: value.to_string(),
                })
                .collect(),
            agent_recommendation_rank: rank,
            agent_recommendation_notes: vec![format!("{} is available in Morocco.", title)],
        }
    }

    /// 与商品记录对应的抓取内容
    pub fn product_pages() -> StaticScraper {
        extracted_products()
            .products
            .into_iter()
            .fold(StaticScraper::new(), |scraper, p| {
                scraper.with_page(
                    p.page_url.clone(),
                    json!({
                        "product_title": p.product_title,
                        "product_current_price": p.product_current_price,
                        "product_url": p.product_url,
                    }),
                )
            })
    }

    pub fn report_draft() -> ReportDraft {
        ReportDraft {
            title: "Espresso Machine Procurement Report".to_string(),
            executive_summary: "<p>Three espresso machines were compared for the office.</p>"
                .to_string(),
            introduction: "<p>RankX wants an espresso machine for its team in Morocco.</p>"
                .to_string(),
            methodology: "<p>Search queries, web search and page extraction.</p>".to_string(),
            findings: "<p>Prices range from 2490 to 6100 MAD.</p>".to_string(),
            analysis: "<p>The Bambino Plus offers the best value.</p>".to_string(),
            recommendations: "<ul><li>Buy the Breville Bambino Plus.</li></ul>".to_string(),
            conclusion: "<p>The Bambino Plus is recommended.</p>".to_string(),
            appendices: "<p>See the raw product data below.</p>".to_string(),
        }
    }
}
