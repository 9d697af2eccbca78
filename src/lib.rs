// 曝光通知客户端 - 主库

// 声明模块
pub mod actors;
pub mod backend;
pub mod bridge;
pub mod clock;
pub mod error;
pub mod exposure;
pub mod logger;
pub mod models;
pub mod observable;
pub mod scheduler;
pub mod settings;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use actors::{LifecycleActor, LifecycleHandle};
use backend::{BackendInterface, HttpBackend, MockBackend};
use bridge::{
    default_translator, ArchiveUnpackingAdapter, ExposureNotificationApi, LogNotifier,
    SimulatedExposureNotification,
};
use exposure::ExposureNotificationService;
use scheduler::BackgroundScheduler;
use settings::{ClientConfig, SettingsManager};
use clock::SystemClock;
use storage::{KeyCacheCleaner, SqliteRepository};

pub use error::{BackendError, Result, ServiceError};
pub use models::{ExposureStatus, SystemStatus};

/// 配置文件路径的环境变量
const CONFIG_PATH_ENV: &str = "EXPOSURE_TRACKER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "data/config.json";

/// 应用状态
///
/// - 服务：状态单元和全部业务操作
/// - 生命周期 Handle：串行投递前台 / 后台事件
/// - 设置管理器
#[derive(Clone)]
pub struct AppState {
    pub service: ExposureNotificationService,
    pub lifecycle: LifecycleHandle,
    pub settings: Arc<SettingsManager>,
}

/// 按配置选择后端和原生能力
///
/// 测试模式不联网；否则走 HTTP 后端，密钥包先解压再交给原生能力
fn build_adapters(
    config: &ClientConfig,
) -> anyhow::Result<(Arc<dyn BackendInterface>, Arc<dyn ExposureNotificationApi>)> {
    if config.test_mode {
        info!("测试模式：使用模拟后端");
        return Ok((
            Arc::new(MockBackend),
            Arc::new(SimulatedExposureNotification::default()),
        ));
    }

    info!(
        "后端: retrieve={}, submit={}, region={}",
        config.retrieve_url, config.submit_url, config.region
    );
    Ok((
        Arc::new(HttpBackend::new(config)?),
        Arc::new(ArchiveUnpackingAdapter::new(
            SimulatedExposureNotification::default(),
        )),
    ))
}

/// 组装服务、Actor 和调度器并启动
pub async fn setup(settings: Arc<SettingsManager>, config: &ClientConfig) -> anyhow::Result<AppState> {
    let repository = Arc::new(SqliteRepository::new(&config.database_path).await?);
    let (backend, bridge) = build_adapters(config)?;

    let service = ExposureNotificationService::builder(
        backend,
        bridge,
        repository.clone(),
        repository,
    )
    .secure_options(config.secure_storage.clone())
    .notifier(Arc::new(LogNotifier))
    .translator(default_translator())
    .on_ready(|service| {
        info!(
            "服务就绪: system={:?}, exposure={}",
            service.system_status().get(),
            service.exposure_status().get().kind()
        );
    })
    .build();

    // 状态变化写日志
    service.system_status().observe(|status| {
        info!("系统能力状态变化: {:?}", status);
    });
    service.exposure_status().observe(|status| {
        info!("曝光状态变化: {}", status.kind());
    });

    let (actor, lifecycle) = LifecycleActor::new(service.clone());
    tokio::spawn(actor.run());

    if let Err(e) = service.start().await {
        error!(error = e.as_label(), "服务启动失败: {}", e);
    }

    // 下载的密钥包只在回看窗口内有用
    if !config.test_mode {
        Arc::new(KeyCacheCleaner::new(&config.key_cache_dir, Arc::new(SystemClock)))
            .start_cleanup_task();
    }

    BackgroundScheduler::every_minutes(lifecycle.clone(), config.background_interval_minutes)
        .start();

    Ok(AppState {
        service,
        lifecycle,
        settings,
    })
}

/// 程序入口：加载配置、初始化日志、运行到 Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let settings = Arc::new(SettingsManager::new(config_path).await?);

    let mut config = settings.get().await;
    config.apply_env();

    let _log_guard = logger::init(&logger::default_log_dir(), &config.log_level)?;
    info!("初始化曝光通知客户端...");

    let state = setup(settings, &config).await?;

    tokio::signal::ctrl_c().await?;
    info!("收到退出信号");

    if !state.lifecycle.health_check().await {
        error!("生命周期 Actor 在退出前已无响应");
    }
    Ok(())
}
