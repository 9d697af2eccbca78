// 密钥缓存清理 - 删除回看窗口之外的周期目录

use crate::clock::{add_days, period_since_epoch, Clock};
use crate::exposure::DEFAULT_LOOKBACK_DAYS;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

/// 密钥缓存清理器
///
/// 缓存目录下每个周期一个子目录（`{period}/keys.zip` 和解压出的 `keys-export/`），
/// 早于回看窗口起点所在周期的目录不会再被检测用到
pub struct KeyCacheCleaner {
    cache_dir: PathBuf,
    retention_days: i64,
    clock: Arc<dyn Clock>,
}

impl KeyCacheCleaner {
    pub fn new(cache_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            retention_days: DEFAULT_LOOKBACK_DAYS,
            clock,
        }
    }

    /// 启动自动清理任务
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(3600)); // 每小时检查一次
            info!("密钥缓存清理任务已启动: {:?}", self.cache_dir);

            loop {
                interval.tick().await;

                if let Err(e) = self.perform_cleanup().await {
                    error!("密钥缓存清理失败: {}", e);
                }
            }
        });
    }

    /// 执行一次清理，返回删除的周期目录数
    ///
    /// 目录名不是周期编号的条目原样保留
    pub async fn perform_cleanup(&self) -> Result<usize> {
        if !tokio::fs::try_exists(&self.cache_dir).await? {
            return Ok(0);
        }

        let cutoff = period_since_epoch(add_days(self.clock.now(), -self.retention_days));
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let period = match entry.file_name().to_str().and_then(|n| n.parse::<i64>().ok()) {
                Some(period) => period,
                None => continue,
            };
            if period >= cutoff {
                continue;
            }

            match tokio::fs::remove_dir_all(entry.path()).await {
                Ok(()) => {
                    debug!("删除过期密钥缓存: period={}", period);
                    removed += 1;
                }
                Err(e) => error!("删除密钥缓存失败 {:?}: {}", entry.path(), e),
            }
        }

        if removed > 0 {
            info!("密钥缓存清理完成，删除了 {} 个周期 (cutoff={})", removed, cutoff);
        }
        Ok(removed)
    }
}
