// 存储配置定义 - 持久化键名与安全存储作用域

use serde::{Deserialize, Serialize};

/// 最后一次完成状态检查的时间（毫秒字符串）
pub const LAST_CHECK_TIMESTAMP: &str = "lastCheckTimeStamp";
/// 确诊（领取验证码）的时间
pub const SUBMISSION_CYCLE_STARTED_AT: &str = "submissionCycleStartedAt";
/// 最后一次成功上传密钥的时间
pub const SUBMISSION_LAST_COMPLETED_AT: &str = "submissionLastCompletedAt";
/// 安全存储中的上传密钥对
pub const SUBMISSION_AUTH_KEYS: &str = "submissionAuthKeys";

/// 安全存储作用域
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureStorageOptions {
    /// iOS keychain 服务名
    pub keychain_service: String,
    /// Android shared preferences 名称
    pub shared_preferences_name: String,
}

impl Default for SecureStorageOptions {
    fn default() -> Self {
        Self {
            keychain_service: "covidShieldKeychain".to_string(),
            shared_preferences_name: "covidShieldSharedPreferences".to_string(),
        }
    }
}

impl SecureStorageOptions {
    /// 作用域标识，用作存储分区键
    pub fn scope(&self) -> String {
        format!("{}/{}", self.keychain_service, self.shared_preferences_name)
    }
}
