// 模拟的曝光检测能力 - 没有原生框架的桌面环境和测试模式使用

use super::ExposureNotificationApi;
use crate::models::{
    ExposureConfiguration, ExposureInformation, ExposureSummary, SystemStatus,
    TemporaryExposureKey,
};
use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use std::sync::Mutex;
use tracing::debug;

/// 每个密钥的滚动周期（10 分钟为单位，144 = 一天）
const ROLLING_PERIOD: u32 = 144;
/// 模拟返回的历史密钥天数
const KEY_HISTORY_DAYS: u32 = 14;

/// 模拟能力：永远不匹配，状态可调
pub struct SimulatedExposureNotification {
    status: Mutex<SystemStatus>,
}

impl SimulatedExposureNotification {
    pub fn new(status: SystemStatus) -> Self {
        Self {
            status: Mutex::new(status),
        }
    }

    /// 修改返回的能力状态（模拟蓝牙开关等）
    pub fn set_status(&self, status: SystemStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }
}

impl Default for SimulatedExposureNotification {
    fn default() -> Self {
        Self::new(SystemStatus::Active)
    }
}

#[async_trait]
impl ExposureNotificationApi for SimulatedExposureNotification {
    async fn start(&self) -> Result<()> {
        debug!("模拟曝光检测框架已启动");
        Ok(())
    }

    async fn get_status(&self) -> Result<SystemStatus> {
        Ok(*self.status.lock().unwrap_or_else(|e| e.into_inner()))
    }

    async fn detect_exposure(
        &self,
        _configuration: &ExposureConfiguration,
        diagnosis_keys_urls: &[String],
    ) -> Result<ExposureSummary> {
        debug!("模拟检测: {:?}", diagnosis_keys_urls);
        Ok(ExposureSummary::default())
    }

    async fn get_exposure_information(
        &self,
        _summary: &ExposureSummary,
    ) -> Result<Vec<ExposureInformation>> {
        Ok(Vec::new())
    }

    async fn get_temporary_exposure_key_history(&self) -> Result<Vec<TemporaryExposureKey>> {
        // 当前的 10 分钟区间序号，对齐到天
        let interval = (Utc::now().timestamp() / 600) as u32;
        let today = interval - interval % ROLLING_PERIOD;

        let keys = (0..KEY_HISTORY_DAYS)
            .map(|day| TemporaryExposureKey {
                key_data: general_purpose::STANDARD.encode(uuid::Uuid::new_v4().as_bytes()),
                rolling_start_interval_number: today - day * ROLLING_PERIOD,
                rolling_period: ROLLING_PERIOD,
                transmission_risk_level: 1,
            })
            .collect();

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_key_history_shape() {
        let bridge = SimulatedExposureNotification::default();
        let keys = bridge.get_temporary_exposure_key_history().await.unwrap();

        assert_eq!(keys.len(), KEY_HISTORY_DAYS as usize);
        for key in &keys {
            let raw = general_purpose::STANDARD.decode(&key.key_data).unwrap();
            assert_eq!(raw.len(), 16);
            assert_eq!(key.rolling_start_interval_number % ROLLING_PERIOD, 0);
        }
        assert!(keys[0].rolling_start_interval_number > keys[1].rolling_start_interval_number);
    }

    #[tokio::test]
    async fn test_status_can_change() {
        let bridge = SimulatedExposureNotification::default();
        assert_eq!(bridge.get_status().await.unwrap(), SystemStatus::Active);
        bridge.set_status(SystemStatus::BluetoothOff);
        assert_eq!(bridge.get_status().await.unwrap(), SystemStatus::BluetoothOff);
    }
}
