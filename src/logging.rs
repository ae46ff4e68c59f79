use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 未设置 RUST_LOG 时使用的过滤规则
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "info,rankx_research=debug"
    } else {
        "info"
    }
}

/// 初始化日志输出，RUST_LOG 优先；重复初始化时忽略
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose))),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
