use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 单次流水线运行期间的阶段数据存储，按 `scope:key` 组织
#[derive(Debug, Default)]
pub struct Memory {
    data: BTreeMap<String, Value>,
    total_size: usize,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    fn full_key(scope: &str, key: &str) -> String {
        format!("{}:{}", scope, key)
    }

    /// 存储数据到指定作用域和键，已有数据会被覆盖
    pub fn store<T>(&mut self, scope: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize,
    {
        let full_key = Self::full_key(scope, key);
        let serialized = serde_json::to_value(data)?;
        let data_size = serialized.to_string().len();

        if let Some(old) = self.data.insert(full_key, serialized) {
            self.total_size -= old.to_string().len();
        }
        self.total_size += data_size;
        Ok(())
    }

    /// 从指定作用域和键获取数据，类型不匹配时返回None
    pub fn get<T>(&self, scope: &str, key: &str) -> Option<T>
    where
        T: for<'a> Deserialize<'a>,
    {
        self.data
            .get(&Self::full_key(scope, key))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// 列出指定作用域的所有键（有序）
    pub fn list_keys(&self, scope: &str) -> Vec<String> {
        let prefix = format!("{}:", scope);
        self.data
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn has_data(&self, scope: &str, key: &str) -> bool {
        self.data.contains_key(&Self::full_key(scope, key))
    }

    /// 已存储数据的序列化总大小（字节）
    pub fn total_size(&self) -> usize {
        self.total_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_get() {
        let mut memory = Memory::new();
        memory
            .store("pipeline", "queries", vec!["a", "b"])
            .unwrap();

        let queries: Vec<String> = memory.get("pipeline", "queries").unwrap();
        assert_eq!(queries, vec!["a".to_string(), "b".to_string()]);
        assert!(memory.has_data("pipeline", "queries"));
        assert!(!memory.has_data("raw", "queries"));
    }

    #[test]
    fn test_type_mismatch_returns_none() {
        let mut memory = Memory::new();
        memory.store("pipeline", "count", 3).unwrap();

        let value: Option<Vec<String>> = memory.get("pipeline", "count");
        assert!(value.is_none());
    }

    #[test]
    fn test_overwrite_tracks_size() {
        let mut memory = Memory::new();
        memory.store("s", "k", "long value here").unwrap();
        memory.store("s", "k", "x").unwrap();

        assert_eq!(memory.total_size(), "\"x\"".len());
    }

    #[test]
    fn test_list_keys_scoped() {
        let mut memory = Memory::new();
        memory.store("raw", "b", 1).unwrap();
        memory.store("raw", "a", 2).unwrap();
        memory.store("pipeline", "c", 3).unwrap();

        assert_eq!(memory.list_keys("raw"), vec!["a".to_string(), "b".to_string()]);
    }
}
