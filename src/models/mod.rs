// 数据模型模块 - 定义曝光状态及与原生接口、后端交换的数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 诊断后的密钥提交周期长度（天）
pub const SUBMISSION_CYCLE_DAYS: i64 = 14;

/// 系统曝光检测能力状态
///
/// 只由能力刷新写入，其余地方只读
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    Unknown,
    Disabled,
    Restricted,
    BluetoothOff,
    Active,
}

impl Default for SystemStatus {
    fn default() -> Self {
        SystemStatus::Disabled
    }
}

/// 曝光 / 提交状态，同一时刻只有一种
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExposureStatus {
    /// 初始状态，无已知曝光或诊断
    Monitoring {
        #[serde(rename = "lastChecked", skip_serializing_if = "Option::is_none")]
        last_checked: Option<DateTime<Utc>>,
    },
    /// 检测到匹配的诊断密钥
    Exposed {
        exposures: Vec<ExposureInformation>,
        #[serde(rename = "lastChecked", skip_serializing_if = "Option::is_none")]
        last_checked: Option<DateTime<Utc>>,
    },
    /// 用户已确诊，处于每日上传密钥的周期内
    Diagnosed {
        #[serde(rename = "needsSubmission")]
        needs_submission: bool,
        #[serde(rename = "cycleEndsAt")]
        cycle_ends_at: DateTime<Utc>,
        #[serde(rename = "lastChecked", skip_serializing_if = "Option::is_none")]
        last_checked: Option<DateTime<Utc>>,
    },
}

impl Default for ExposureStatus {
    fn default() -> Self {
        ExposureStatus::Monitoring { last_checked: None }
    }
}

impl ExposureStatus {
    /// 最后一次完成检查的时间
    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        match self {
            ExposureStatus::Monitoring { last_checked }
            | ExposureStatus::Exposed { last_checked, .. }
            | ExposureStatus::Diagnosed { last_checked, .. } => *last_checked,
        }
    }

    /// 替换 lastChecked，其余字段保持不变
    pub fn with_last_checked(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        match &mut self {
            ExposureStatus::Monitoring { last_checked }
            | ExposureStatus::Exposed { last_checked, .. }
            | ExposureStatus::Diagnosed { last_checked, .. } => *last_checked = timestamp,
        }
        self
    }

    /// 状态名称（用于日志）
    pub fn kind(&self) -> &'static str {
        match self {
            ExposureStatus::Monitoring { .. } => "monitoring",
            ExposureStatus::Exposed { .. } => "exposed",
            ExposureStatus::Diagnosed { .. } => "diagnosed",
        }
    }

    pub fn is_diagnosed(&self) -> bool {
        matches!(self, ExposureStatus::Diagnosed { .. })
    }
}

/// 曝光匹配配置（由后端下发，原样交给原生接口）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureConfiguration {
    pub minimum_risk_score: u8,
    pub attenuation_level_values: Vec<u8>,
    pub attenuation_weight: u8,
    pub days_since_last_exposure_level_values: Vec<u8>,
    pub days_since_last_exposure_weight: u8,
    pub duration_level_values: Vec<u8>,
    pub duration_weight: u8,
    pub transmission_risk_level_values: Vec<u8>,
    pub transmission_risk_weight: u8,
}

impl Default for ExposureConfiguration {
    fn default() -> Self {
        let levels = vec![1, 2, 3, 4, 5, 6, 7, 8];
        Self {
            minimum_risk_score: 0,
            attenuation_level_values: levels.clone(),
            attenuation_weight: 50,
            days_since_last_exposure_level_values: levels.clone(),
            days_since_last_exposure_weight: 50,
            duration_level_values: levels.clone(),
            duration_weight: 50,
            transmission_risk_level_values: levels,
            transmission_risk_weight: 50,
        }
    }
}

/// 原生检测返回的匹配摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureSummary {
    pub days_since_last_exposure: u32,
    pub matched_key_count: u32,
    pub maximum_risk_score: u8,
}

/// 单条曝光记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureInformation {
    pub date_millis_since_epoch: i64,
    pub duration_minutes: u32,
    pub attenuation_value: u8,
    pub transmission_risk_level: u8,
    pub total_risk_score: u8,
}

/// 设备自身的临时曝光密钥
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryExposureKey {
    /// base64 编码的 16 字节密钥
    pub key_data: String,
    pub rolling_start_interval_number: u32,
    pub rolling_period: u32,
    pub transmission_risk_level: u8,
}

/// 领取一次性验证码后得到的上传密钥对
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionKeySet {
    pub server_public_key: String,
    pub client_private_key: String,
    pub client_public_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_statuses() {
        assert_eq!(SystemStatus::default(), SystemStatus::Disabled);
        assert_eq!(
            ExposureStatus::default(),
            ExposureStatus::Monitoring { last_checked: None }
        );
    }

    #[test]
    fn test_with_last_checked_keeps_variant() {
        let ends = Utc::now();
        let status = ExposureStatus::Diagnosed {
            needs_submission: true,
            cycle_ends_at: ends,
            last_checked: None,
        };
        let checked = Utc::now();
        let updated = status.with_last_checked(Some(checked));
        assert_eq!(
            updated,
            ExposureStatus::Diagnosed {
                needs_submission: true,
                cycle_ends_at: ends,
                last_checked: Some(checked),
            }
        );
        assert_eq!(updated.last_checked(), Some(checked));
    }

    #[test]
    fn test_submission_key_set_json_layout() {
        // 安全存储里保存的是驼峰命名的 JSON
        let keys: SubmissionKeySet = serde_json::from_value(json!({
            "serverPublicKey": "serverPublicKey",
            "clientPrivateKey": "clientPrivateKey",
            "clientPublicKey": "clientPublicKey"
        }))
        .unwrap();
        assert_eq!(keys.client_private_key, "clientPrivateKey");
    }

    #[test]
    fn test_exposure_status_tagged_serialization() {
        let value = serde_json::to_value(ExposureStatus::default()).unwrap();
        assert_eq!(value, json!({ "type": "monitoring" }));
    }
}
