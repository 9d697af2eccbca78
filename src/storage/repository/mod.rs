// Repository 抽象层 - 定义键值存储接口

pub mod memory;
pub mod sqlite;

use super::config::SecureStorageOptions;
use anyhow::Result;
use async_trait::async_trait;

/// 普通键值存储 - 所有存储实现必须实现此 trait
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 写入（已存在则覆盖）
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// 读取，不存在返回 None
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
}

/// 安全键值存储 - 对应平台的 keychain / shared preferences
///
/// 同一个键在不同的 options 作用域下互不可见
#[async_trait]
pub trait SecureKeyValueStore: Send + Sync {
    async fn set_item(&self, key: &str, value: &str, options: &SecureStorageOptions)
        -> Result<()>;

    async fn get_item(&self, key: &str, options: &SecureStorageOptions) -> Result<Option<String>>;
}
