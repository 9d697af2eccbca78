// 后台调度 - 定时唤醒后台曝光检查

use crate::actors::LifecycleHandle;
use crate::logger;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// 后台调度器
///
/// 每个间隔向生命周期 Actor 发送一次后台唤醒，Actor 退出后停止
pub struct BackgroundScheduler {
    handle: LifecycleHandle,
    period: Duration,
}

impl BackgroundScheduler {
    pub fn new(handle: LifecycleHandle, period: Duration) -> Self {
        Self { handle, period }
    }

    /// 按分钟配置创建，最少 1 分钟
    pub fn every_minutes(handle: LifecycleHandle, minutes: u64) -> Self {
        Self::new(handle, Duration::from_secs(minutes.max(1) * 60))
    }

    /// 启动调度任务
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            // 第一次在一个间隔之后触发，启动时的检查由 start() 完成
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("后台调度已启动，间隔 {:?}", self.period);

            loop {
                ticker.tick().await;
                if self.handle.is_closed() {
                    break;
                }

                debug!("后台调度触发");
                if let Err(e) = self.handle.background_wake().await {
                    logger::capture_exception(
                        "background wake",
                        &e,
                        serde_json::json!({ "period_secs": self.period.as_secs() }),
                    );
                }
            }

            info!("后台调度已停止");
        })
    }
}
