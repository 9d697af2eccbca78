// 曝光评估 - 逐个周期下载诊断密钥并交给原生接口匹配

use super::cursor::BackfillCursor;
use crate::backend::BackendInterface;
use crate::bridge::ExposureNotificationApi;
use crate::error::{Result, ServiceError};
use crate::models::ExposureInformation;
use tracing::{debug, info};

/// 一次评估的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// 某个周期匹配成功
    Exposed {
        period: i64,
        exposures: Vec<ExposureInformation>,
    },
    /// 所有周期都没有匹配
    NoMatch { periods_checked: usize },
}

/// 曝光评估器
///
/// 每个周期单独调用一次原生检测，不合并批次；
/// 第一次匹配后立即停止，不再发起网络或原生调用
pub struct ExposureEvaluator<'a> {
    backend: &'a dyn BackendInterface,
    bridge: &'a dyn ExposureNotificationApi,
}

impl<'a> ExposureEvaluator<'a> {
    pub fn new(backend: &'a dyn BackendInterface, bridge: &'a dyn ExposureNotificationApi) -> Self {
        Self { backend, bridge }
    }

    /// 消费游标，按从新到旧的顺序检测
    ///
    /// 任一周期下载或检测失败都会中止本轮并返回错误
    pub async fn evaluate(&self, cursor: BackfillCursor) -> Result<Evaluation> {
        let configuration = self.backend.get_exposure_configuration().await?;
        debug!("待检测周期数: {}", cursor.len());

        let mut periods_checked = 0;
        for period in cursor {
            debug!("检测周期 {}", period);
            let keys_file = self.backend.retrieve_diagnosis_keys(period).await?;

            let summary = self
                .bridge
                .detect_exposure(&configuration, std::slice::from_ref(&keys_file))
                .await
                .map_err(ServiceError::Native)?;
            periods_checked += 1;

            if summary.matched_key_count > 0 {
                info!(
                    "周期 {} 匹配到 {} 个诊断密钥",
                    period, summary.matched_key_count
                );
                let exposures = self
                    .bridge
                    .get_exposure_information(&summary)
                    .await
                    .map_err(ServiceError::Native)?;
                return Ok(Evaluation::Exposed { period, exposures });
            }
        }

        debug!("检测完成，{} 个周期均未匹配", periods_checked);
        Ok(Evaluation::NoMatch { periods_checked })
    }
}
