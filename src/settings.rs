use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::storage::SecureStorageOptions;

/// 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 诊断密钥下载服务地址
    pub retrieve_url: String,
    /// 密钥提交服务地址
    pub submit_url: String,
    /// 地区代码（决定曝光配置和密钥包）
    pub region: String,
    /// 测试模式：使用不联网的后端
    pub test_mode: bool,
    /// SQLite 数据库路径
    pub database_path: String,
    /// 下载的密钥包缓存目录
    pub key_cache_dir: String,
    /// 后台检查间隔（分钟）
    pub background_interval_minutes: u64,
    /// 日志级别
    pub log_level: String,
    /// 安全存储作用域
    pub secure_storage: SecureStorageOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retrieve_url: "http://localhost:8001".to_string(),
            submit_url: "http://localhost:8000".to_string(),
            region: "302".to_string(),
            test_mode: false,
            database_path: "data/exposure-tracker.db".to_string(),
            key_cache_dir: "data/keys".to_string(),
            background_interval_minutes: 240,
            log_level: "info".to_string(),
            secure_storage: SecureStorageOptions::default(),
        }
    }
}

impl ClientConfig {
    /// 用环境变量覆盖配置（TEST_MODE / SUBMIT_URL / RETRIEVE_URL）
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TEST_MODE") {
            self.test_mode = value == "true";
        }
        if let Some(value) = lookup("SUBMIT_URL").filter(|v| !v.is_empty()) {
            self.submit_url = value;
        }
        if let Some(value) = lookup("RETRIEVE_URL").filter(|v| !v.is_empty()) {
            self.retrieve_url = value;
        }
    }
}

/// 配置的部分更新
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfigUpdate {
    pub retrieve_url: Option<String>,
    pub submit_url: Option<String>,
    pub region: Option<String>,
    pub test_mode: Option<bool>,
    pub background_interval_minutes: Option<u64>,
    pub log_level: Option<String>,
}

pub struct SettingsManager {
    path: PathBuf,
    data: RwLock<ClientConfig>,
}

impl SettingsManager {
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                serde_json::from_slice::<ClientConfig>(&bytes).unwrap_or_default()
            }
            _ => {
                let default = ClientConfig::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                default
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(initial),
        })
    }

    pub async fn get(&self) -> ClientConfig {
        self.data.read().await.clone()
    }

    pub async fn update(&self, update: ClientConfigUpdate) -> Result<ClientConfig> {
        let mut config = self.data.write().await;

        if let Some(url) = update.retrieve_url {
            config.retrieve_url = url;
        }
        if let Some(url) = update.submit_url {
            config.submit_url = url;
        }
        if let Some(region) = update.region {
            config.region = region;
        }
        if let Some(test_mode) = update.test_mode {
            config.test_mode = test_mode;
        }
        if let Some(minutes) = update.background_interval_minutes {
            config.background_interval_minutes = minutes;
        }
        if let Some(level) = update.log_level {
            config.log_level = level;
        }

        self.save(&config).await?;
        Ok(config.clone())
    }

    async fn save(&self, config: &ClientConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.json");

        let manager = SettingsManager::new(path.clone()).await.unwrap();

        assert!(path.exists());
        assert_eq!(manager.get().await.background_interval_minutes, 240);
    }

    #[tokio::test]
    async fn test_update_persists_partial_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let manager = SettingsManager::new(path.clone()).await.unwrap();
        manager
            .update(ClientConfigUpdate {
                region: Some("CA".to_string()),
                test_mode: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        let reloaded = SettingsManager::new(path).await.unwrap().get().await;
        assert_eq!(reloaded.region, "CA");
        assert!(reloaded.test_mode);
        assert_eq!(reloaded.submit_url, ClientConfig::default().submit_url);
    }

    #[tokio::test]
    async fn test_missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"region":"CA"}"#).await.unwrap();

        let config = SettingsManager::new(path).await.unwrap().get().await;
        assert_eq!(config.region, "CA");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClientConfig::default();
        config.apply_overrides(|name| match name {
            "TEST_MODE" => Some("true".to_string()),
            "SUBMIT_URL" => Some("https://submit.example".to_string()),
            "RETRIEVE_URL" => Some(String::new()),
            _ => None,
        });

        assert!(config.test_mode);
        assert_eq!(config.submit_url, "https://submit.example");
        assert_eq!(config.retrieve_url, ClientConfig::default().retrieve_url);
    }
}
