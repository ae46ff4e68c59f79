use axum::response::Html;

pub mod health;
pub mod jobs;
pub mod research;

const DASHBOARD_HTML: &str = include_str!("../dashboard.html");

/// 调研面板：提交表单、轮询状态、下载产物
pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}
