// 测试模式后端 - 不访问网络

use super::{BackendInterface, BackendResult};
use crate::models::{ExposureConfiguration, SubmissionKeySet, TemporaryExposureKey};
use async_trait::async_trait;
use tracing::info;

/// 测试模式后端
///
/// 返回默认配置和固定密钥对，密钥文件为空引用
#[derive(Debug, Default, Clone)]
pub struct MockBackend;

#[async_trait]
impl BackendInterface for MockBackend {
    async fn get_exposure_configuration(&self) -> BackendResult<ExposureConfiguration> {
        Ok(ExposureConfiguration::default())
    }

    async fn retrieve_diagnosis_keys(&self, period: i64) -> BackendResult<String> {
        Ok(format!("mock://diagnosis-keys/{}", period))
    }

    async fn claim_one_time_code(&self, _code: &str) -> BackendResult<SubmissionKeySet> {
        Ok(SubmissionKeySet {
            server_public_key: "serverPublicKey".to_string(),
            client_private_key: "clientPrivateKey".to_string(),
            client_public_key: "clientPublicKey".to_string(),
        })
    }

    async fn report_diagnosis_keys(
        &self,
        _key_set: &SubmissionKeySet,
        keys: &[TemporaryExposureKey],
    ) -> BackendResult<()> {
        info!("测试模式: 忽略 {} 个密钥的上传", keys.len());
        Ok(())
    }
}
