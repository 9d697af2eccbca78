// 提交周期管理 - 确诊后 14 天内每天上传一次密钥

use super::read_timestamp;
use crate::clock::{add_days, days_between, to_millis_string, Clock};
use crate::error::{Result, ServiceError};
use crate::models::{SubmissionKeySet, SUBMISSION_CYCLE_DAYS};
use crate::storage::{
    KeyValueStore, SecureKeyValueStore, SecureStorageOptions, SUBMISSION_AUTH_KEYS,
    SUBMISSION_CYCLE_STARTED_AT, SUBMISSION_LAST_COMPLETED_AT,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// 提交周期管理器
///
/// 基于两个持久化时间戳：周期开始时间、最后一次上传完成时间。
/// 周期结束时间总是由开始时间推算，不单独保存。
pub struct SubmissionCycleManager {
    storage: Arc<dyn KeyValueStore>,
    secure_storage: Arc<dyn SecureKeyValueStore>,
    secure_options: SecureStorageOptions,
    clock: Arc<dyn Clock>,
}

impl SubmissionCycleManager {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        secure_storage: Arc<dyn SecureKeyValueStore>,
        secure_options: SecureStorageOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            secure_storage,
            secure_options,
            clock,
        }
    }

    /// 由开始时间推算周期结束时间
    pub fn cycle_ends_at_from(started_at: DateTime<Utc>) -> DateTime<Utc> {
        add_days(started_at, SUBMISSION_CYCLE_DAYS)
    }

    /// 持久化的周期开始时间
    pub async fn cycle_started_at(&self) -> Result<Option<DateTime<Utc>>> {
        read_timestamp(self.storage.as_ref(), SUBMISSION_CYCLE_STARTED_AT).await
    }

    /// 周期结束时间；没有开始记录时按今天开始计算
    pub async fn cycle_ends_at(&self) -> Result<DateTime<Utc>> {
        let started_at = self
            .cycle_started_at()
            .await?
            .unwrap_or_else(|| self.clock.now());
        Ok(Self::cycle_ends_at_from(started_at))
    }

    /// 保存上传密钥对并开始新周期
    ///
    /// # 返回
    /// * 周期结束时间
    pub async fn begin_cycle(&self, keys: &SubmissionKeySet) -> Result<DateTime<Utc>> {
        let serialized = serde_json::to_string(keys)?;
        self.secure_storage
            .set_item(SUBMISSION_AUTH_KEYS, &serialized, &self.secure_options)
            .await
            .map_err(ServiceError::Storage)?;

        let started_at = self.clock.now_millis();
        self.storage
            .set_item(SUBMISSION_CYCLE_STARTED_AT, &to_millis_string(started_at))
            .await
            .map_err(ServiceError::Storage)?;

        info!("提交周期已开始: {}", started_at);
        Ok(Self::cycle_ends_at_from(started_at))
    }

    /// 今天是否还需要上传密钥
    pub async fn calculate_needs_submission(&self) -> Result<bool> {
        let last_submitted = read_timestamp(self.storage.as_ref(), SUBMISSION_LAST_COMPLETED_AT).await?;
        let cycle_ends_at = self.cycle_ends_at().await?;

        let Some(last_submitted) = last_submitted else {
            return Ok(true);
        };

        let today = self.clock.now();
        let needs = if days_between(last_submitted, cycle_ends_at) <= 0 {
            // 周期已结束，不再需要上传
            false
        } else {
            days_between(last_submitted, today) > 0
        };

        debug!(
            "needs_submission={} (最后上传 {}, 周期结束 {})",
            needs, last_submitted, cycle_ends_at
        );
        Ok(needs)
    }

    /// 读取上传密钥对
    pub async fn load_submission_keys(&self) -> Result<SubmissionKeySet> {
        let serialized = self
            .secure_storage
            .get_item(SUBMISSION_AUTH_KEYS, &self.secure_options)
            .await
            .map_err(ServiceError::Storage)?
            .ok_or(ServiceError::NoSubmissionKeys)?;

        Ok(serde_json::from_str(&serialized)?)
    }

    /// 记录一次成功上传
    pub async fn record_completion(&self) -> Result<DateTime<Utc>> {
        let completed_at = self.clock.now_millis();
        self.storage
            .set_item(SUBMISSION_LAST_COMPLETED_AT, &to_millis_string(completed_at))
            .await
            .map_err(ServiceError::Storage)?;
        Ok(completed_at)
    }
}
