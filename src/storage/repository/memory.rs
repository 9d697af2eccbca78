// 内存键值存储 - 测试模式和单元测试使用

use super::{KeyValueStore, SecureKeyValueStore};
use crate::storage::config::SecureStorageOptions;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 内存存储，进程退出即丢失
#[derive(Default)]
pub struct MemoryRepository {
    items: RwLock<HashMap<String, String>>,
    secure_items: RwLock<HashMap<(String, String), String>>,
    /// 写入记录（键, 值），按写入顺序
    writes: RwLock<Vec<(String, String)>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置普通键值
    pub async fn with_item(self, key: &str, value: &str) -> Self {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        self
    }

    /// 普通存储的全部写入记录
    pub async fn writes(&self) -> Vec<(String, String)> {
        self.writes.read().await.clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryRepository {
    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        self.writes
            .write()
            .await
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }
}

#[async_trait]
impl SecureKeyValueStore for MemoryRepository {
    async fn set_item(
        &self,
        key: &str,
        value: &str,
        options: &SecureStorageOptions,
    ) -> Result<()> {
        self.secure_items
            .write()
            .await
            .insert((options.scope(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn get_item(&self, key: &str, options: &SecureStorageOptions) -> Result<Option<String>> {
        Ok(self
            .secure_items
            .read()
            .await
            .get(&(options.scope(), key.to_string()))
            .cloned())
    }
}
