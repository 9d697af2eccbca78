// 原生桥模块 - 系统曝光检测能力和本地通知的接口

pub mod archive;
pub mod notification;
pub mod simulated;

use crate::models::{
    ExposureConfiguration, ExposureInformation, ExposureSummary, SystemStatus,
    TemporaryExposureKey,
};
use anyhow::Result;
use async_trait::async_trait;

pub use archive::ArchiveUnpackingAdapter;
pub use notification::{default_translator, LogNotifier, PushNotifier, Translate};
pub use simulated::SimulatedExposureNotification;

/// 系统曝光检测能力
#[async_trait]
pub trait ExposureNotificationApi: Send + Sync {
    /// 启动检测框架，设备不支持时返回错误
    async fn start(&self) -> Result<()>;

    /// 当前能力状态
    async fn get_status(&self) -> Result<SystemStatus>;

    /// 用配置和密钥文件做匹配
    async fn detect_exposure(
        &self,
        configuration: &ExposureConfiguration,
        diagnosis_keys_urls: &[String],
    ) -> Result<ExposureSummary>;

    /// 根据匹配摘要获取曝光详情
    async fn get_exposure_information(
        &self,
        summary: &ExposureSummary,
    ) -> Result<Vec<ExposureInformation>>;

    /// 本机过去的临时曝光密钥
    async fn get_temporary_exposure_key_history(&self) -> Result<Vec<TemporaryExposureKey>>;
}
