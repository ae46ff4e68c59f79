use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    config::Config,
    generator::outlet::DiskOutlet,
    llm::client::LLMClient,
    memory::Memory,
    services::{PageScraper, SearchEngine},
    types::request::ResearchRequest,
};

/// 运行进度的接收方
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, progress: &str);
}

/// 只写日志的进度接收方，用于命令行运行
pub struct LogProgress;

#[async_trait]
impl ProgressReporter for LogProgress {
    async fn report(&self, progress: &str) {
        tracing::info!("📌 {}", progress);
    }
}

/// 单次流水线运行的上下文
#[derive(Clone)]
pub struct GeneratorContext {
    /// LLM调用器，用于与AI通信。
    pub llm_client: LLMClient,
    /// 配置
    pub config: Config,
    /// 本次调研的输入
    pub request: ResearchRequest,
    /// 网页搜索服务
    pub search: Arc<dyn SearchEngine>,
    /// 网页抓取服务
    pub scraper: Arc<dyn PageScraper>,
    /// 本次运行的产物目录
    pub outlet: DiskOutlet,
    /// 进度上报
    pub progress: Arc<dyn ProgressReporter>,
    /// 阶段间共享的数据
    pub memory: Arc<RwLock<Memory>>,
}

impl GeneratorContext {
    pub fn new(
        llm_client: LLMClient,
        config: Config,
        request: ResearchRequest,
        search: Arc<dyn SearchEngine>,
        scraper: Arc<dyn PageScraper>,
        outlet: DiskOutlet,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            llm_client,
            config,
            request,
            search,
            scraper,
            outlet,
            progress,
            memory: Arc::new(RwLock::new(Memory::new())),
        }
    }

    /// 存储数据到 Memory
    pub async fn store_to_memory<T>(&self, scope: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let mut memory = self.memory.write().await;
        memory.store(scope, key, data)
    }

    /// 从 Memory 获取数据
    pub async fn get_from_memory<T>(&self, scope: &str, key: &str) -> Option<T>
    where
        T: for<'a> Deserialize<'a> + Send + Sync,
    {
        let memory = self.memory.read().await;
        memory.get(scope, key)
    }

    /// 检查Memory中是否存在指定数据
    pub async fn has_memory_data(&self, scope: &str, key: &str) -> bool {
        let memory = self.memory.read().await;
        memory.has_data(scope, key)
    }
}
