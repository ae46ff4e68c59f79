use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationErrors;

pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_NO_KEYWORDS: u32 = 10;
pub const DEFAULT_SCORE_TH: f64 = 0.10;
pub const DEFAULT_TOP_RECOMMENDATIONS_NO: u32 = 10;

pub const MAX_NO_KEYWORDS: u32 = 50;
pub const MAX_TOP_RECOMMENDATIONS_NO: u32 = 50;

/// 一次商品调研的输入参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub product_name: String,
    pub websites_list: Vec<String>,
    pub country_name: String,
    pub language: String,
    pub no_keywords: u32,
    /// 已声明但不参与筛选
    pub score_th: f64,
    pub top_recommendations_no: u32,
}

impl ResearchRequest {
    /// 从原始JSON解析并校验请求，一次性返回全部错误
    pub fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        let Some(obj) = value.as_object() else {
            return Err(ValidationErrors::new(vec![
                "Request body must be a JSON object".to_string(),
            ]));
        };

        let mut errors = Vec::new();

        let product_name = required_string(obj, "product_name", &mut errors);
        let websites_list = websites(obj, &mut errors);
        let country_name = required_string(obj, "country_name", &mut errors);

        let language = match obj.get("language") {
            None | Some(Value::Null) => DEFAULT_LANGUAGE.to_string(),
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::String(_)) => {
                errors.push("language must not be empty".to_string());
                String::new()
            }
            Some(_) => {
                errors.push("language must be a string".to_string());
                String::new()
            }
        };

        let no_keywords = bounded_integer(
            obj,
            "no_keywords",
            DEFAULT_NO_KEYWORDS,
            MAX_NO_KEYWORDS,
            &mut errors,
        );

        let score_th = match obj.get("score_th") {
            None | Some(Value::Null) => DEFAULT_SCORE_TH,
            Some(v) => match v.as_f64() {
                Some(n) if (0.0..=1.0).contains(&n) => n,
                Some(_) => {
                    errors.push("score_th must be between 0 and 1".to_string());
                    DEFAULT_SCORE_TH
                }
                None => {
                    errors.push("score_th must be a number".to_string());
                    DEFAULT_SCORE_TH
                }
            },
        };

        let top_recommendations_no = bounded_integer(
            obj,
            "top_recommendations_no",
            DEFAULT_TOP_RECOMMENDATIONS_NO,
            MAX_TOP_RECOMMENDATIONS_NO,
            &mut errors,
        );

        if !errors.is_empty() {
            return Err(ValidationErrors::new(errors));
        }

        Ok(Self {
            product_name,
            websites_list,
            country_name,
            language,
            no_keywords,
            score_th,
            top_recommendations_no,
        })
    }
}

fn required_string(obj: &Map<String, Value>, field: &str, errors: &mut Vec<String>) -> String {
    match obj.get(field) {
        None | Some(Value::Null) => {
            errors.push(format!("Missing required field: {}", field));
            String::new()
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.push(format!("{} must not be empty", field));
            String::new()
        }
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => {
            errors.push(format!("{} must be a string", field));
            String::new()
        }
    }
}

fn websites(obj: &Map<String, Value>, errors: &mut Vec<String>) -> Vec<String> {
    let Some(value) = obj.get("websites_list").filter(|v| !v.is_null()) else {
        errors.push("Missing required field: websites_list".to_string());
        return Vec::new();
    };

    let Some(items) = value.as_array() else {
        errors.push("websites_list must be a list of website URLs".to_string());
        return Vec::new();
    };

    let sites: Vec<String> = items
        .iter()
        .filter_map(|item| item.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if sites.len() != items.len() {
        errors.push("websites_list must be a list of website URLs".to_string());
    } else if sites.is_empty() {
        errors.push("websites_list must contain at least one website".to_string());
    }
    sites
}

fn bounded_integer(
    obj: &Map<String, Value>,
    field: &str,
    default: u32,
    max: u32,
    errors: &mut Vec<String>,
) -> u32 {
    match obj.get(field) {
        None | Some(Value::Null) => default,
        Some(v) => match v.as_i64() {
            Some(n) if n >= 1 && n <= max as i64 => n as u32,
            Some(_) => {
                errors.push(format!("{} must be between 1 and {}", field, max));
                default
            }
            None => {
                errors.push(format!("{} must be an integer", field));
                default
            }
        },
    }
}
