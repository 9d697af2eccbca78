// 本地通知 - 只关心触发条件，具体展示交给平台

use std::sync::Arc;
use tracing::info;

/// 文案翻译函数
pub type Translate = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub const EXPOSED_TITLE_KEY: &str = "Notification.ExposedMessageTitle";
pub const EXPOSED_BODY_KEY: &str = "Notification.ExposedMessageBody";
pub const DAILY_UPLOAD_TITLE_KEY: &str = "Notification.DailyUploadNotificationTitle";
pub const DAILY_UPLOAD_BODY_KEY: &str = "Notification.DailyUploadNotificationBody";

/// 本地通知接口
pub trait PushNotifier: Send + Sync {
    fn present_local_notification(&self, title: &str, body: &str);
}

/// 只写日志的通知器（桌面 / 测试模式）
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl PushNotifier for LogNotifier {
    fn present_local_notification(&self, title: &str, body: &str) {
        info!("本地通知: {} - {}", title, body);
    }
}

/// 默认英文文案，未知键原样返回
pub fn default_translator() -> Translate {
    Arc::new(|key: &str| {
        match key {
            EXPOSED_TITLE_KEY => "You have possibly been exposed",
            EXPOSED_BODY_KEY => "Open the app to learn what to do next.",
            DAILY_UPLOAD_TITLE_KEY => "Share your random IDs",
            DAILY_UPLOAD_BODY_KEY => "Open the app to upload today's random IDs.",
            other => other,
        }
        .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_translator() {
        let translate = default_translator();
        assert_eq!(translate(EXPOSED_TITLE_KEY), "You have possibly been exposed");
        assert_eq!(translate("Unknown.Key"), "Unknown.Key");
    }
}
