// HTTP 后端客户端
// 负责下载曝光配置和诊断密钥包、领取一次性验证码、上传密钥

use super::{BackendInterface, BackendResult};
use crate::error::BackendError;
use crate::models::{ExposureConfiguration, SubmissionKeySet, TemporaryExposureKey};
use crate::settings::ClientConfig;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// 下载的密钥包文件名
const KEYS_ARCHIVE_NAME: &str = "keys.zip";

/// HTTP 后端
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    retrieve_url: String,
    submit_url: String,
    region: String,
    key_cache_dir: PathBuf,
}

impl HttpBackend {
    /// 创建新的后端客户端
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.retrieve_url.is_empty() || config.submit_url.is_empty() {
            return Err(anyhow!("retrieve_url 和 submit_url 不能为空"));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            retrieve_url: config.retrieve_url.trim_end_matches('/').to_string(),
            submit_url: config.submit_url.trim_end_matches('/').to_string(),
            region: config.region.clone(),
            key_cache_dir: PathBuf::from(&config.key_cache_dir),
        })
    }

    /// 把非成功状态码转换为错误
    async fn check_status(response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl BackendInterface for HttpBackend {
    async fn get_exposure_configuration(&self) -> BackendResult<ExposureConfiguration> {
        let url = format!(
            "{}/exposure-configuration/{}.json",
            self.retrieve_url, self.region
        );
        debug!("获取曝光配置: {}", url);

        let response = Self::check_status(self.client.get(&url).send().await?).await?;
        Ok(response.json::<ExposureConfiguration>().await?)
    }

    async fn retrieve_diagnosis_keys(&self, period: i64) -> BackendResult<String> {
        let url = format!("{}/retrieve/{}/{}", self.retrieve_url, self.region, period);
        debug!("下载诊断密钥: 周期 {}", period);

        let response = Self::check_status(self.client.get(&url).send().await?).await?;
        let bytes = response.bytes().await?;

        let dir = self.key_cache_dir.join(period.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(KEYS_ARCHIVE_NAME);
        tokio::fs::write(&path, &bytes).await?;

        debug!("周期 {} 的密钥包已保存: {:?} ({} 字节)", period, path, bytes.len());
        Ok(path.to_string_lossy().to_string())
    }

    async fn claim_one_time_code(&self, code: &str) -> BackendResult<SubmissionKeySet> {
        let url = format!("{}/claim-key", self.submit_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "oneTimeCode": code }))
            .send()
            .await?;

        match Self::check_status(response).await {
            Ok(response) => {
                info!("一次性验证码领取成功");
                Ok(response.json::<SubmissionKeySet>().await?)
            }
            Err(e) => {
                warn!("一次性验证码领取失败: {}", e);
                Err(e)
            }
        }
    }

    async fn report_diagnosis_keys(
        &self,
        key_set: &SubmissionKeySet,
        keys: &[TemporaryExposureKey],
    ) -> BackendResult<()> {
        let url = format!("{}/upload", self.submit_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "serverPublicKey": key_set.server_public_key,
                "clientPublicKey": key_set.client_public_key,
                "keys": keys,
            }))
            .send()
            .await?;

        Self::check_status(response).await?;
        info!("已上传 {} 个临时曝光密钥", keys.len());
        Ok(())
    }
}
