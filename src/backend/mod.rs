// 后端模块 - 诊断密钥服务接口

pub mod http;
pub mod mock;

use crate::error::BackendError;
use crate::models::{ExposureConfiguration, SubmissionKeySet, TemporaryExposureKey};
use async_trait::async_trait;

pub use http::HttpBackend;
pub use mock::MockBackend;

/// 后端结果类型
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// 诊断密钥后端接口
#[async_trait]
pub trait BackendInterface: Send + Sync {
    /// 获取曝光匹配配置
    async fn get_exposure_configuration(&self) -> BackendResult<ExposureConfiguration>;

    /// 获取某个周期的诊断密钥文件
    ///
    /// # 返回
    /// * 可交给原生检测接口的文件引用（本地路径）
    async fn retrieve_diagnosis_keys(&self, period: i64) -> BackendResult<String>;

    /// 用一次性验证码换取上传密钥对
    ///
    /// 验证码无效时返回 `BackendError::Unauthorized`
    async fn claim_one_time_code(&self, code: &str) -> BackendResult<SubmissionKeySet>;

    /// 上传本机的临时曝光密钥
    async fn report_diagnosis_keys(
        &self,
        key_set: &SubmissionKeySet,
        keys: &[TemporaryExposureKey],
    ) -> BackendResult<()>;
}
