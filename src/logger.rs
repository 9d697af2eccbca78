// 日志系统 - 控制台 + 按天轮转的日志文件

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

const APP_DIR_NAME: &str = "exposure-tracker";

/// 默认日志目录
pub fn default_log_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join("Library/Logs").join(APP_DIR_NAME)
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join(APP_DIR_NAME).join("logs")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".local/share")
            .join(APP_DIR_NAME)
            .join("logs")
    }
}

/// 初始化日志系统
///
/// 返回的 guard 需要持有到程序退出，否则文件里可能丢失最后的日志
pub fn init(log_dir: &Path, level: &str) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    // 配置日志输出到文件（每天轮转）
    let file_appender = tracing_appender::rolling::daily(log_dir, "app.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 同时输出到控制台和文件
    let writer = std::io::stdout.and(non_blocking);

    // 使用本地时区
    let timer = LocalTime::new(time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    )?);

    // RUST_LOG 优先，其次是配置里的级别
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_timer(timer)
        .with_ansi(cfg!(debug_assertions)) // release 版本不使用颜色代码
        .try_init()
        .map_err(|e| anyhow::anyhow!("日志系统初始化失败: {}", e))?;

    eprintln!("日志文件位置: {:?}", log_dir);
    Ok(guard)
}

/// 单行化日志消息
fn single_line(message: &str) -> String {
    message.replace('\n', "")
}

/// 开发日志：去掉换行的消息加结构化参数
pub fn capture_message(message: &str, params: &serde_json::Value) {
    tracing::debug!(params = %params, "{}", single_line(message));
}

/// 错误日志：消息前缀 "Error: "，错误信息并入参数
pub fn capture_exception(
    message: &str,
    error: &dyn std::fmt::Display,
    params: serde_json::Value,
) {
    let params = with_error(params, error);
    tracing::error!(params = %params, "{}", single_line(&format!("Error: {}", message)));
}

fn with_error(params: serde_json::Value, error: &dyn std::fmt::Display) -> serde_json::Value {
    let mut params = match params {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("params".to_string(), other);
            map
        }
    };
    params.insert(
        "error".to_string(),
        serde_json::json!({ "message": error.to_string() }),
    );
    serde_json::Value::Object(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a\nb\n"), "ab");
    }

    #[test]
    fn test_error_merged_into_params() {
        let merged = with_error(json!({"period": 3}), &"boom");
        assert_eq!(merged, json!({"period": 3, "error": {"message": "boom"}}));

        let merged = with_error(serde_json::Value::Null, &"boom");
        assert_eq!(merged, json!({"error": {"message": "boom"}}));
    }

    #[test]
    fn test_default_log_dir_is_app_scoped() {
        assert!(default_log_dir().to_string_lossy().contains(APP_DIR_NAME));
    }
}
