// 曝光检测核心：回填游标、评估器、提交周期与对外服务

pub mod cursor;
pub mod evaluator;
pub mod service;
pub mod submission;

pub use cursor::{BackfillCursor, DEFAULT_LOOKBACK_DAYS, PERIODS_PER_FETCH};
pub use evaluator::{Evaluation, ExposureEvaluator};
pub use service::{ExposureNotificationService, ServiceBuilder};
pub use submission::SubmissionCycleManager;

use crate::clock::parse_millis_string;
use crate::error::{Result, ServiceError};
use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};

/// 读取以毫秒字符串保存的时间戳
///
/// 缺失返回 None；存在但无法解析时返回 CorruptTimestamp
pub(crate) async fn read_timestamp(
    storage: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = storage.get_item(key).await.map_err(ServiceError::Storage)? else {
        return Ok(None);
    };

    parse_millis_string(&value)
        .map(Some)
        .ok_or_else(|| ServiceError::CorruptTimestamp {
            key: key.to_string(),
            value,
        })
}
