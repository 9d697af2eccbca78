// SQLite 键值存储实现

use super::{KeyValueStore, SecureKeyValueStore};
use crate::storage::config::SecureStorageOptions;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

/// SQLite 存储实现
///
/// 普通键值和安全键值分表存放，两个 trait 共用同一个连接池
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// 创建新的 SQLite 数据库连接
    pub async fn new(db_path: &str) -> Result<Self> {
        info!("初始化 SQLite 存储: {}", db_path);

        // 确保数据库文件的目录存在
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .idle_timeout(std::time::Duration::from_secs(300))
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await?;

        let repo = Self { pool };

        // 初始化表结构
        repo.initialize_tables().await?;

        Ok(repo)
    }

    /// 获取连接池引用
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn initialize_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS secure_kv_store (
                scope TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (scope, key)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteRepository {
    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get::<String, _>("value")?),
            None => None,
        })
    }
}

#[async_trait]
impl SecureKeyValueStore for SqliteRepository {
    async fn set_item(
        &self,
        key: &str,
        value: &str,
        options: &SecureStorageOptions,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO secure_kv_store (scope, key, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
        )
        .bind(options.scope())
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_item(&self, key: &str, options: &SecureStorageOptions) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM secure_kv_store WHERE scope = ? AND key = ?")
            .bind(options.scope())
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get::<String, _>("value")?),
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open(dir: &tempfile::TempDir) -> SqliteRepository {
        let path = dir.path().join("data").join("store.db");
        SqliteRepository::new(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_set_get_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open(&dir).await;

        assert_eq!(KeyValueStore::get_item(&repo, "lastCheckTimeStamp").await.unwrap(), None);

        KeyValueStore::set_item(&repo, "lastCheckTimeStamp", "1").await.unwrap();
        KeyValueStore::set_item(&repo, "lastCheckTimeStamp", "2").await.unwrap();
        assert_eq!(
            KeyValueStore::get_item(&repo, "lastCheckTimeStamp").await.unwrap(),
            Some("2".to_string())
        );
    }

    #[tokio::test]
    async fn test_secure_items_are_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open(&dir).await;
        let default_scope = SecureStorageOptions::default();
        let other_scope = SecureStorageOptions {
            keychain_service: "other".to_string(),
            shared_preferences_name: "other".to_string(),
        };

        SecureKeyValueStore::set_item(&repo, "submissionAuthKeys", "{}", &default_scope)
            .await
            .unwrap();

        assert_eq!(
            SecureKeyValueStore::get_item(&repo, "submissionAuthKeys", &default_scope)
                .await
                .unwrap(),
            Some("{}".to_string())
        );
        assert_eq!(
            SecureKeyValueStore::get_item(&repo, "submissionAuthKeys", &other_scope)
                .await
                .unwrap(),
            None
        );
        // 普通存储里看不到安全存储的键
        assert_eq!(KeyValueStore::get_item(&repo, "submissionAuthKeys").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let repo = open(&dir).await;
            KeyValueStore::set_item(&repo, "submissionCycleStartedAt", "1589861400000")
                .await
                .unwrap();
            repo.get_pool().close().await;
        }

        let repo = open(&dir).await;
        assert_eq!(
            KeyValueStore::get_item(&repo, "submissionCycleStartedAt").await.unwrap(),
            Some("1589861400000".to_string())
        );
    }
}
