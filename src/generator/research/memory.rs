use crate::generator::context::GeneratorContext;
use crate::generator::research::types::StageKind;
use serde::{Serialize, de::DeserializeOwned};

pub struct MemoryScope;

impl MemoryScope {
    /// 各阶段经过校验的输出
    pub const PIPELINE: &'static str = "pipeline";
    /// 外部服务返回的原始数据
    pub const RAW: &'static str = "raw";
}

pub struct ScopedKeys;

impl ScopedKeys {
    pub const SEARCH_HITS: &'static str = "search_hits";
    pub const SCRAPED_PAGES: &'static str = "scraped_pages";
}

#[allow(async_fn_in_trait)]
pub trait StageMemory {
    async fn store_stage_output<T>(&self, stage: StageKind, output: &T) -> anyhow::Result<()>
    where
        T: Serialize + Send + Sync;

    async fn get_stage_output<T>(&self, stage: StageKind) -> Option<T>
    where
        T: DeserializeOwned + Send + Sync;

    async fn has_stage_output(&self, stage: StageKind) -> bool;
}

impl StageMemory for GeneratorContext {
    /// 存储阶段输出
    async fn store_stage_output<T>(&self, stage: StageKind, output: &T) -> anyhow::Result<()>
    where
        T: Serialize + Send + Sync,
    {
        self.store_to_memory(MemoryScope::PIPELINE, &stage.to_string(), output)
            .await
    }

    /// 获取阶段输出
    async fn get_stage_output<T>(&self, stage: StageKind) -> Option<T>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.get_from_memory(MemoryScope::PIPELINE, &stage.to_string())
            .await
    }

    async fn has_stage_output(&self, stage: StageKind) -> bool {
        self.has_memory_data(MemoryScope::PIPELINE, &stage.to_string())
            .await
    }
}
