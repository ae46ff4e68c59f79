//! 各阶段之间传递的结构化记录。
//! 字段上的文档注释会进入JSON Schema，直接作为模型的字段说明，所以保持英文。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 阶段A输出：搜索关键词列表
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct SuggestedSearchQueries {
    /// Suggested search queries to be passed to the search engine
    pub queries: Vec<String>,
}

/// 单条搜索结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct SingleSearchResult {
    pub title: String,
    /// The page url
    pub url: String,
    pub content: String,
    pub score: f64,
    /// The search query that produced this result
    pub search_query: String,
}

/// 阶段B输出
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct AllSearchResults {
    pub results: Vec<SingleSearchResult>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ProductSpec {
    pub specification_name: String,
    pub specification_value: String,
}

/// 单个商品的结构化信息
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct SingleExtractedProduct {
    /// The original url of the product page
    pub page_url: String,
    /// The title of the product
    pub product_title: String,
    /// The url of the product image
    pub product_image_url: String,
    /// The url of the product
    pub product_url: String,
    /// The current price of the product
    pub product_current_price: f64,
    /// The original price of the product before discount. Set to null if no discount
    #[serde(default)]
    pub product_original_price: Option<f64>,
    /// The discount percentage of the product. Set to null if no discount
    #[serde(default)]
    pub product_discount_percentage: Option<f64>,
    /// The specifications of the product. Focus on the most important specs to compare (1 to 5 items)
    pub product_specs: Vec<ProductSpec>,
    /// The rank of the product to be considered in the final procurement report (1 to 5, higher is better)
    pub agent_recommendation_rank: u8,
    /// A set of notes why would you recommend or not recommend this product to the company, compared to other products
    pub agent_recommendation_notes: Vec<String>,
}

/// 阶段C输出
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct AllExtractedProducts {
    pub products: Vec<SingleExtractedProduct>,
}

/// 阶段D中模型负责的报告正文，每一节都是HTML片段
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ReportDraft {
    /// The report title
    pub title: String,
    /// A brief overview of the procurement process and key findings
    pub executive_summary: String,
    /// An introduction to the procurement objective and scope of the report
    pub introduction: String,
    /// A description of the methods used to gather and compare prices
    pub methodology: String,
    /// Detailed comparison of prices from different websites
    pub findings: String,
    /// An analysis of the findings, highlighting any significant trends or observations
    pub analysis: String,
    /// Suggestions for procurement based on the analysis
    pub recommendations: String,
    /// A summary of the report and final thoughts
    pub conclusion: String,
    /// Any additional information, such as supplementary materials
    pub appendices: String,
}
