// Lifecycle Actor - 把应用生命周期事件串行地转换成服务调用
//
// 前台切换、蓝牙变化、后台唤醒都经过同一个通道，按到达顺序处理

use crate::error::Result as ServiceResult;
use crate::exposure::ExposureNotificationService;
use crate::logger;
use anyhow::Result;
use tokio::sync::{mpsc, oneshot};

type Reply = oneshot::Sender<ServiceResult<()>>;

/// 生命周期命令
pub enum LifecycleCommand {
    /// 应用回到前台：刷新能力状态后更新曝光状态
    Foreground { reply: Reply },

    /// 蓝牙开关变化：只刷新能力状态
    BluetoothChanged { reply: Reply },

    /// 后台唤醒：更新并按需弹出通知
    BackgroundWake { reply: Reply },

    /// 健康检查
    HealthCheck { reply: oneshot::Sender<()> },
}

/// 生命周期Actor
pub struct LifecycleActor {
    receiver: mpsc::Receiver<LifecycleCommand>,
    service: ExposureNotificationService,
}

impl LifecycleActor {
    pub fn new(service: ExposureNotificationService) -> (Self, LifecycleHandle) {
        let (sender, receiver) = mpsc::channel(16);
        let actor = Self { receiver, service };
        let handle = LifecycleHandle { sender };
        (actor, handle)
    }

    /// 运行Actor，所有 Handle 被 drop 后退出
    pub async fn run(mut self) {
        tracing::info!("Lifecycle Actor 已启动");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                LifecycleCommand::Foreground { reply } => {
                    tracing::debug!("应用进入前台");
                    self.service.update_system_status().await;
                    let result = self.service.update_exposure_status().await;
                    log_failure("foreground update", &result);
                    let _ = reply.send(result);
                }

                LifecycleCommand::BluetoothChanged { reply } => {
                    let status = self.service.update_system_status().await;
                    tracing::info!("蓝牙状态变化，能力状态: {:?}", status);
                    let _ = reply.send(Ok(()));
                }

                LifecycleCommand::BackgroundWake { reply } => {
                    tracing::debug!("后台唤醒");
                    let result = self.service.update_exposure_status_in_background().await;
                    log_failure("background update", &result);
                    let _ = reply.send(result);
                }

                LifecycleCommand::HealthCheck { reply } => {
                    let _ = reply.send(());
                }
            }
        }

        tracing::info!("Lifecycle Actor 已停止");
    }
}

fn log_failure(what: &str, result: &ServiceResult<()>) {
    if let Err(e) = result {
        logger::capture_exception(what, e, serde_json::json!({ "kind": e.as_label() }));
    }
}

/// 生命周期Handle
#[derive(Clone)]
pub struct LifecycleHandle {
    sender: mpsc::Sender<LifecycleCommand>,
}

impl LifecycleHandle {
    /// 应用回到前台
    pub async fn foreground(&self) -> Result<()> {
        self.request(|reply| LifecycleCommand::Foreground { reply })
            .await
    }

    /// 蓝牙开关变化
    pub async fn bluetooth_changed(&self) -> Result<()> {
        self.request(|reply| LifecycleCommand::BluetoothChanged { reply })
            .await
    }

    /// 后台唤醒
    pub async fn background_wake(&self) -> Result<()> {
        self.request(|reply| LifecycleCommand::BackgroundWake { reply })
            .await
    }

    /// Actor 是否已经退出
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce(Reply) -> LifecycleCommand,
    {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| anyhow::anyhow!("Actor通道已关闭"))?;
        rx.await.map_err(|_| anyhow::anyhow!("Actor已停止"))??;
        Ok(())
    }

    /// 健康检查
    /// 返回true表示Actor正常运行，超时时间为5秒
    pub async fn health_check(&self) -> bool {
        let (reply, rx) = oneshot::channel();

        if self
            .sender
            .send(LifecycleCommand::HealthCheck { reply })
            .await
            .is_err()
        {
            tracing::warn!("Lifecycle Actor 健康检查失败: 通道已关闭");
            return false;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(5), rx).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                tracing::warn!("Lifecycle Actor 健康检查失败: Actor已停止");
                false
            }
            Err(_) => {
                tracing::warn!("Lifecycle Actor 健康检查失败: 超时(5秒)");
                false
            }
        }
    }
}
