// 曝光通知服务 - 对外的编排入口
//
// 持有两个状态单元（系统能力状态、曝光状态），
// 所有状态变更都经过这里的方法

use super::cursor::BackfillCursor;
use super::evaluator::{Evaluation, ExposureEvaluator};
use super::read_timestamp;
use super::submission::SubmissionCycleManager;
use crate::backend::BackendInterface;
use crate::bridge::notification::{
    DAILY_UPLOAD_BODY_KEY, DAILY_UPLOAD_TITLE_KEY, EXPOSED_BODY_KEY, EXPOSED_TITLE_KEY,
};
use crate::bridge::{default_translator, ExposureNotificationApi, LogNotifier, PushNotifier, Translate};
use crate::clock::{to_millis_string, Clock, SystemClock};
use crate::error::{BackendError, Result, ServiceError};
use crate::models::{ExposureStatus, SystemStatus};
use crate::observable::Observable;
use crate::storage::{KeyValueStore, SecureKeyValueStore, SecureStorageOptions, LAST_CHECK_TIMESTAMP};
use crate::utils::{validate_one_time_code, SingleFlight};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// 第一次 start 完成时调用的回调
pub type ReadyHook = Box<dyn FnOnce(&ExposureNotificationService) + Send>;

struct ServiceInner {
    system_status: Observable<SystemStatus>,
    exposure_status: Observable<ExposureStatus>,
    backend: Arc<dyn BackendInterface>,
    bridge: Arc<dyn ExposureNotificationApi>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn PushNotifier>,
    translate: Translate,
    clock: Arc<dyn Clock>,
    submission: SubmissionCycleManager,
    starting: SingleFlight,
    updating: SingleFlight,
    on_ready: Mutex<Option<ReadyHook>>,
}

/// 曝光通知服务
///
/// 克隆得到的是同一个服务的句柄
#[derive(Clone)]
pub struct ExposureNotificationService {
    inner: Arc<ServiceInner>,
}

/// 服务构建器
pub struct ServiceBuilder {
    backend: Arc<dyn BackendInterface>,
    bridge: Arc<dyn ExposureNotificationApi>,
    storage: Arc<dyn KeyValueStore>,
    secure_storage: Arc<dyn SecureKeyValueStore>,
    secure_options: SecureStorageOptions,
    notifier: Arc<dyn PushNotifier>,
    translate: Translate,
    clock: Arc<dyn Clock>,
    on_ready: Option<ReadyHook>,
}

impl ServiceBuilder {
    pub fn secure_options(mut self, options: SecureStorageOptions) -> Self {
        self.secure_options = options;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn PushNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn translator(mut self, translate: Translate) -> Self {
        self.translate = translate;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn on_ready<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&ExposureNotificationService) + Send + 'static,
    {
        self.on_ready = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> ExposureNotificationService {
        let submission = SubmissionCycleManager::new(
            self.storage.clone(),
            self.secure_storage,
            self.secure_options,
            self.clock.clone(),
        );

        ExposureNotificationService {
            inner: Arc::new(ServiceInner {
                system_status: Observable::new(SystemStatus::default()),
                exposure_status: Observable::new(ExposureStatus::default()),
                backend: self.backend,
                bridge: self.bridge,
                storage: self.storage,
                notifier: self.notifier,
                translate: self.translate,
                clock: self.clock,
                submission,
                starting: SingleFlight::new(),
                updating: SingleFlight::new(),
                on_ready: Mutex::new(self.on_ready),
            }),
        }
    }
}

impl ExposureNotificationService {
    /// 创建构建器；通知器默认只写日志，时钟默认系统时钟
    pub fn builder(
        backend: Arc<dyn BackendInterface>,
        bridge: Arc<dyn ExposureNotificationApi>,
        storage: Arc<dyn KeyValueStore>,
        secure_storage: Arc<dyn SecureKeyValueStore>,
    ) -> ServiceBuilder {
        ServiceBuilder {
            backend,
            bridge,
            storage,
            secure_storage,
            secure_options: SecureStorageOptions::default(),
            notifier: Arc::new(LogNotifier),
            translate: default_translator(),
            clock: Arc::new(SystemClock),
            on_ready: None,
        }
    }

    /// 系统能力状态
    pub fn system_status(&self) -> &Observable<SystemStatus> {
        &self.inner.system_status
    }

    /// 曝光状态
    pub fn exposure_status(&self) -> &Observable<ExposureStatus> {
        &self.inner.exposure_status
    }

    /// 启动服务
    ///
    /// 原生框架不可用时静默返回；正在启动时再次调用直接返回
    pub async fn start(&self) -> Result<()> {
        let Some(_guard) = self.inner.starting.try_acquire() else {
            debug!("服务正在启动，忽略重复调用");
            return Ok(());
        };

        let result = self.start_inner().await;
        self.fire_ready();
        result
    }

    async fn start_inner(&self) -> Result<()> {
        if let Err(e) = self.inner.bridge.start().await {
            warn!("曝光检测框架不可用: {}", e);
            return Ok(());
        }
        info!("曝光检测框架已启动");

        self.update_system_status().await;

        if let Some(started_at) = self.inner.submission.cycle_started_at().await? {
            let cycle_ends_at = SubmissionCycleManager::cycle_ends_at_from(started_at);
            info!("恢复确诊状态，周期结束于 {}", cycle_ends_at);
            self.inner.exposure_status.update(|live| ExposureStatus::Diagnosed {
                needs_submission: false,
                cycle_ends_at,
                last_checked: live.last_checked(),
            });
        }

        if let Some(last_checked) = self.read_last_checked().await? {
            self.inner.exposure_status.update(|live| {
                let restored = latest(live.last_checked(), last_checked);
                live.clone().with_last_checked(Some(restored))
            });
        }

        self.update_exposure_status().await
    }

    fn fire_ready(&self) {
        let hook = self
            .inner
            .on_ready
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(hook) = hook {
            debug!("服务就绪");
            hook(self);
        }
    }

    /// 从原生接口刷新能力状态，失败按 Disabled 处理
    pub async fn update_system_status(&self) -> SystemStatus {
        let status = match self.inner.bridge.get_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!("获取能力状态失败，按 Disabled 处理: {}", e);
                SystemStatus::Disabled
            }
        };
        debug!("系统能力状态: {:?}", status);
        self.inner.system_status.set(status);
        status
    }

    /// 执行一轮曝光状态更新
    ///
    /// 只在能力状态为 Active 时运行；已有更新在进行时直接返回。
    /// 更新在独立任务中执行，调用方放弃等待不会中断它
    pub async fn update_exposure_status(&self) -> Result<()> {
        if self.inner.system_status.get() != SystemStatus::Active {
            debug!("能力状态非 Active，跳过曝光状态更新");
            return Ok(());
        }

        let Some(guard) = self.inner.updating.try_acquire() else {
            debug!("曝光状态更新进行中，忽略本次调用");
            return Ok(());
        };

        let service = self.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            service.perform_exposure_status_update().await
        });

        match handle.await? {
            Ok(status) => {
                info!("曝光状态更新完成: {}", status.kind());
                Ok(())
            }
            Err(e) => {
                error!(error = e.as_label(), "曝光状态更新失败: {}", e);
                Err(e)
            }
        }
    }

    async fn perform_exposure_status_update(&self) -> Result<ExposureStatus> {
        let current = self.inner.exposure_status.get();

        if current.is_diagnosed() {
            let needs_submission = self.inner.submission.calculate_needs_submission().await?;
            return self
                .finalize(move |live| match live {
                    ExposureStatus::Diagnosed {
                        cycle_ends_at,
                        last_checked,
                        ..
                    } => ExposureStatus::Diagnosed {
                        needs_submission,
                        cycle_ends_at: *cycle_ends_at,
                        last_checked: *last_checked,
                    },
                    other => other.clone(),
                })
                .await;
        }

        let last_checked = self.read_last_checked().await?;
        let cursor = BackfillCursor::new(self.inner.clock.now(), last_checked);
        let evaluation = ExposureEvaluator::new(self.inner.backend.as_ref(), self.inner.bridge.as_ref())
            .evaluate(cursor)
            .await?;

        let next = match (evaluation, current) {
            (Evaluation::Exposed { exposures, .. }, ExposureStatus::Exposed { exposures: mut known, last_checked }) => {
                known.extend(exposures);
                ExposureStatus::Exposed {
                    exposures: known,
                    last_checked,
                }
            }
            (Evaluation::Exposed { exposures, .. }, current) => ExposureStatus::Exposed {
                exposures,
                last_checked: current.last_checked(),
            },
            (Evaluation::NoMatch { .. }, exposed @ ExposureStatus::Exposed { .. }) => exposed,
            (Evaluation::NoMatch { periods_checked }, current) => {
                debug!("{} 个周期无匹配", periods_checked);
                ExposureStatus::Monitoring {
                    last_checked: current.last_checked(),
                }
            }
        };

        // 扫描期间可能已经确诊，确诊状态优先
        self.finalize(move |live| if live.is_diagnosed() { live.clone() } else { next })
            .await
    }

    /// 写入新状态并刷新 lastChecked（只增不减）
    async fn finalize<F>(&self, f: F) -> Result<ExposureStatus>
    where
        F: FnOnce(&ExposureStatus) -> ExposureStatus + Send,
    {
        let now = self.inner.clock.now_millis();
        let checked = latest(self.inner.exposure_status.get().last_checked(), now);

        // 先落盘，写入失败时内存状态保持不变
        self.inner
            .storage
            .set_item(LAST_CHECK_TIMESTAMP, &to_millis_string(checked))
            .await
            .map_err(ServiceError::Storage)?;

        let status = self.inner.exposure_status.update(|live| {
            let checked = latest(live.last_checked(), checked);
            f(live).with_last_checked(Some(checked))
        });
        Ok(status)
    }

    /// 读取上次检查时间
    ///
    /// 存储的值无法解析时按没有记录处理（回看默认窗口），
    /// 本轮 finalize 会用新值覆盖它
    async fn read_last_checked(&self) -> Result<Option<DateTime<Utc>>> {
        match read_timestamp(self.inner.storage.as_ref(), LAST_CHECK_TIMESTAMP).await {
            Err(ServiceError::CorruptTimestamp { key, value }) => {
                warn!("{} 中的时间戳无法解析，按无记录处理: {:?}", key, value);
                Ok(None)
            }
            other => other,
        }
    }

    /// 后台唤醒时执行更新，必要时弹出一条本地通知
    pub async fn update_exposure_status_in_background(&self) -> Result<()> {
        if self.inner.system_status.get() != SystemStatus::Active {
            debug!("能力状态非 Active，后台更新跳过");
            return Ok(());
        }

        self.update_exposure_status().await?;

        let keys = match self.inner.exposure_status.get() {
            ExposureStatus::Exposed { .. } => Some((EXPOSED_TITLE_KEY, EXPOSED_BODY_KEY)),
            ExposureStatus::Diagnosed {
                needs_submission: true,
                ..
            } => Some((DAILY_UPLOAD_TITLE_KEY, DAILY_UPLOAD_BODY_KEY)),
            _ => None,
        };

        if let Some((title_key, body_key)) = keys {
            info!("触发本地通知: {}", title_key);
            let translate = &self.inner.translate;
            self.inner
                .notifier
                .present_local_notification(&translate(title_key), &translate(body_key));
        }
        Ok(())
    }

    /// 领取一次性验证码并开始提交周期
    pub async fn start_keys_submission(&self, code: &str) -> Result<()> {
        let code = validate_one_time_code(code).map_err(|e| {
            warn!("{}", e);
            ServiceError::InvalidOneTimeCode
        })?;

        let keys = self
            .inner
            .backend
            .claim_one_time_code(code)
            .await
            .map_err(|e| match e {
                BackendError::Unauthorized => ServiceError::InvalidOneTimeCode,
                other => ServiceError::Backend(other),
            })?;

        let cycle_ends_at = self.inner.submission.begin_cycle(&keys).await?;
        self.inner.exposure_status.update(|live| ExposureStatus::Diagnosed {
            needs_submission: true,
            cycle_ends_at,
            last_checked: live.last_checked(),
        });
        info!("已确诊，提交周期结束于 {}", cycle_ends_at);
        Ok(())
    }

    /// 上传今天的临时曝光密钥
    pub async fn fetch_and_submit_keys(&self) -> Result<()> {
        let key_set = self.inner.submission.load_submission_keys().await?;
        let keys = self
            .inner
            .bridge
            .get_temporary_exposure_key_history()
            .await
            .map_err(ServiceError::Native)?;

        self.inner.backend.report_diagnosis_keys(&key_set, &keys).await?;
        info!("已上传 {} 个临时曝光密钥", keys.len());

        self.record_key_submission().await
    }

    async fn record_key_submission(&self) -> Result<()> {
        if !self.inner.exposure_status.get().is_diagnosed() {
            return Ok(());
        }

        self.inner.submission.record_completion().await?;
        self.inner.exposure_status.update(|live| match live {
            ExposureStatus::Diagnosed {
                cycle_ends_at,
                last_checked,
                ..
            } => ExposureStatus::Diagnosed {
                needs_submission: false,
                cycle_ends_at: *cycle_ends_at,
                last_checked: *last_checked,
            },
            other => other.clone(),
        });
        Ok(())
    }
}

fn latest(previous: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    previous.map_or(candidate, |p| p.max(candidate))
}
