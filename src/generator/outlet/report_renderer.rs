//! 采购报告HTML渲染。
//! 版式、章节顺序和商品表格由代码生成，模型只提供各章节的正文片段。

use regex::{Captures, Regex};
use std::fmt::Write;
use std::sync::LazyLock;

use crate::config::CompanyConfig;
use crate::types::product::{ReportDraft, SingleExtractedProduct};
use crate::types::request::ResearchRequest;

/// 报告的八个固定章节，按输出顺序排列
pub const REPORT_SECTIONS: [&str; 8] = [
    "Executive Summary",
    "Introduction",
    "Methodology",
    "Findings",
    "Analysis",
    "Recommendations",
    "Conclusion",
    "Appendices",
];

const BOOTSTRAP_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";

static BLOCKED_ELEMENTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "iframe", "object", "embed"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</\s*{tag}\s*>|<\s*/?\s*{tag}\b[^>]*>"))
                .expect("blocked element pattern is valid")
        })
        .collect()
});

// 属性前的分隔符可以是空白、`/` 或上一个属性的引号
static EVENT_HANDLER_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)([\s/"'])on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("event handler pattern is valid")
});

static URL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)([\s/"'])(href|src|action|formaction|poster|xlink:href)\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#,
    )
    .expect("url attribute pattern is valid")
});

pub struct ReportRenderer;

impl ReportRenderer {
    /// 渲染完整的报告文档；相同输入总是得到相同输出
    pub fn render(
        draft: &ReportDraft,
        products: &[SingleExtractedProduct],
        request: &ResearchRequest,
        company: &CompanyConfig,
    ) -> String {
        let mut ranked: Vec<&SingleExtractedProduct> = products.iter().collect();
        ranked.sort_by(|a, b| b.agent_recommendation_rank.cmp(&a.agent_recommendation_rank));

        let title = escape(draft.title.trim());
        let bodies = [
            sanitize(&draft.executive_summary),
            sanitize(&draft.introduction),
            sanitize(&draft.methodology),
            format!("{}\n{}", sanitize(&draft.findings), findings_table(&ranked)),
            sanitize(&draft.analysis),
            sanitize(&draft.recommendations),
            sanitize(&draft.conclusion),
            format!("{}\n{}", sanitize(&draft.appendices), raw_data(&ranked)),
        ];

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        );
        let _ = writeln!(html, "<title>{}</title>", title);
        let _ = writeln!(html, "<link href=\"{}\" rel=\"stylesheet\">", BOOTSTRAP_CSS);
        html.push_str("</head>\n<body class=\"bg-light\">\n<div class=\"container my-5\">\n");

        let _ = writeln!(
            html,
            "<header class=\"mb-5\">\n<h1 class=\"display-5\">{}</h1>\n<p class=\"text-muted\">Prepared for {} | Product: {} | Country: {} | Websites: {}</p>\n</header>",
            title,
            escape(&company.name),
            escape(&request.product_name),
            escape(&request.country_name),
            escape(&request.websites_list.join(", "))
        );

        for (i, (name, body)) in REPORT_SECTIONS.iter().zip(bodies.iter()).enumerate() {
            let _ = writeln!(
                html,
                "<section id=\"{}\" class=\"card mb-4\">\n<div class=\"card-body\">\n<h2 class=\"card-title h3\">{}. {}</h2>\n{}\n</div>\n</section>",
                anchor(name),
                i + 1,
                name,
                body.trim()
            );
        }

        html.push_str("</div>\n</body>\n</html>\n");
        html
    }
}

fn findings_table(products: &[&SingleExtractedProduct]) -> String {
    let mut table = String::from(
        "<div class=\"table-responsive\">\n<table class=\"table table-striped table-bordered align-middle\">\n<thead class=\"table-dark\"><tr><th>Rank</th><th>Product</th><th>Current Price</th><th>Original Price</th><th>Discount</th><th>Source</th></tr></thead>\n<tbody>\n",
    );
    for product in products {
        let _ = writeln!(
            table,
            "<tr><td>{}/5</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            product.agent_recommendation_rank,
            link(&product.product_url, &product.product_title),
            price(Some(product.product_current_price)),
            price(product.product_original_price),
            product
                .product_discount_percentage
                .map(|d| format!("{:.0}%", d))
                .unwrap_or_else(|| "-".to_string()),
            link(&product.page_url, &host_of(&product.page_url)),
        );
    }
    table.push_str("</tbody>\n</table>\n</div>");
    table
}

fn raw_data(products: &[&SingleExtractedProduct]) -> String {
    let mut out = String::from("<h3 class=\"h5 mt-4\">Raw product data</h3>\n");
    for product in products {
        let _ = writeln!(
            out,
            "<div class=\"mb-3\">\n<h4 class=\"h6\">{}</h4>",
            escape(&product.product_title)
        );
        if is_web_url(&product.product_image_url) {
            let _ = writeln!(
                out,
                "<img src=\"{}\" alt=\"{}\" class=\"img-thumbnail mb-2\" style=\"max-width: 160px\">",
                escape(product.product_image_url.trim()),
                escape(&product.product_title)
            );
        }
        out.push_str("<ul class=\"list-unstyled small\">\n");
        for spec in &product.product_specs {
            let _ = writeln!(
                out,
                "<li><strong>{}:</strong> {}</li>",
                escape(&spec.specification_name),
                escape(&spec.specification_value)
            );
        }
        out.push_str("</ul>\n<ul class=\"small\">\n");
        for note in &product.agent_recommendation_notes {
            let _ = writeln!(out, "<li>{}</li>", escape(note));
        }
        out.push_str("</ul>\n</div>\n");
    }
    out
}

fn price(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn host_of(page_url: &str) -> String {
    url::Url::parse(page_url.trim())
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "-".to_string())
}

/// 只接受http(s)绝对地址
fn is_web_url(raw: &str) -> bool {
    url::Url::parse(raw.trim())
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// 地址不可用时只输出文本
fn link(target: &str, text: &str) -> String {
    if is_web_url(target) {
        format!("<a href=\"{}\">{}</a>", escape(target.trim()), escape(text))
    } else {
        escape(text)
    }
}

fn anchor(section: &str) -> String {
    section.to_lowercase().replace(' ', "-")
}

/// 转义纯文本
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 清理模型给出的HTML片段：去掉脚本类元素和内联事件，非http(s)链接改为 `#`
pub fn sanitize(fragment: &str) -> String {
    let mut cleaned = fragment.to_string();
    for pattern in BLOCKED_ELEMENTS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned = EVENT_HANDLER_ATTR
        .replace_all(&cleaned, |caps: &Captures| keep_separator(&caps[1]))
        .into_owned();
    cleaned = URL_ATTR
        .replace_all(&cleaned, |caps: &Captures| {
            let value = caps[3].trim_matches(|c: char| c == '"' || c == '\'');
            if value.starts_with('#') || is_web_url(value) {
                caps[0].to_string()
            } else {
                format!("{}{}=\"#\"", keep_separator(&caps[1]), &caps[2])
            }
        })
        .into_owned();
    cleaned.trim().to_string()
}

/// 空白分隔符随属性一起删除，引号和 `/` 属于前一段标记，需保留
fn keep_separator(separator: &str) -> String {
    if separator.trim().is_empty() {
        String::new()
    } else {
        separator.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_sanitize_strips_scripts_and_handlers() {
        let dirty = r#"<p onclick="steal()">Hi</p><script>alert(1)</script><a href="javascript:alert(1)">x</a><STYLE>p{}</STYLE>"#;
        let clean = sanitize(dirty);

        assert_eq!(clean, r##"<p>Hi</p><a href="#">x</a>"##);
    }

    #[test]
    fn test_sanitize_handlers_without_whitespace() {
        assert_eq!(sanitize("<svg/onload=alert(1)>"), "<svg/>");
        assert_eq!(
            sanitize(r#"<a href="https://a.example.com/x"onclick="steal()">x</a>"#),
            r#"<a href="https://a.example.com/x">x</a>"#
        );
        assert_eq!(
            sanitize(r#"<img title="a>b" onerror=alert(1)>"#),
            r#"<img title="a>b">"#
        );
    }

    #[test]
    fn test_sanitize_keeps_only_web_links() {
        let clean = sanitize(
            r#"<a href="https://a.example.com/dedica">ok</a><a href='#findings'>jump</a><img src=data:text/html,x><a href="JaVaScRiPt:alert(1)">x</a>"#,
        );
        assert_eq!(
            clean,
            r##"<a href="https://a.example.com/dedica">ok</a><a href='#findings'>jump</a><img src="#"><a href="#">x</a>"##
        );
    }

    #[test]
    fn test_render_drops_non_web_product_urls() {
        let mut products = fixtures::extracted_products().products;
        products[0].product_url = "javascript:alert(document.cookie)".to_string();
        products[0].page_url = " javascript:alert(1)".to_string();
        products[0].product_image_url = "javascript:alert(2)".to_string();

        let html = ReportRenderer::render(
            &fixtures::report_draft(),
            &products,
            &fixtures::espresso_request(),
            &CompanyConfig::default(),
        );

        assert!(!html.to_lowercase().contains("javascript:"));
        assert!(html.contains(&format!("<td>{}</td>", escape(&products[0].product_title))));
        for product in &products[1..] {
            assert!(html.contains(&format!("<a href=\"{}\">", escape(&product.product_url))));
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_render_contains_sections_in_order() {
        let products = fixtures::extracted_products().products;
        let html = ReportRenderer::render(
            &fixtures::report_draft(),
            &products,
            &fixtures::espresso_request(),
            &CompanyConfig::default(),
        );

        let mut last = 0;
        for (i, section) in REPORT_SECTIONS.iter().enumerate() {
            let heading = format!("{}. {}</h2>", i + 1, section);
            let pos = html.find(&heading).unwrap();
            assert!(pos > last);
            last = pos;
        }
        assert!(html.contains(BOOTSTRAP_CSS));
        for product in &products {
            assert!(html.contains(&escape(&product.product_title)));
        }
    }

    #[test]
    fn test_render_orders_table_by_rank() {
        let products = fixtures::extracted_products().products;
        let html = ReportRenderer::render(
            &fixtures::report_draft(),
            &products,
            &fixtures::espresso_request(),
            &CompanyConfig::default(),
        );

        let best = products
            .iter()
            .max_by_key(|p| p.agent_recommendation_rank)
            .unwrap();
        let worst = products
            .iter()
            .min_by_key(|p| p.agent_recommendation_rank)
            .unwrap();
        let table_start = html.find("<tbody>").unwrap();
        let best_pos = html[table_start..].find(&escape(&best.product_title)).unwrap();
        let worst_pos = html[table_start..].find(&escape(&worst.product_title)).unwrap();
        assert!(best_pos < worst_pos);
    }

    #[test]
    fn test_render_is_deterministic() {
        let products = fixtures::extracted_products().products;
        let render = || {
            ReportRenderer::render(
                &fixtures::report_draft(),
                &products,
                &fixtures::espresso_request(),
                &CompanyConfig::default(),
            )
        };
        assert_eq!(render(), render());
    }
}
