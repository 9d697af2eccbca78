// 错误类型定义
//
// 适配层（存储、HTTP、解压、原生桥）内部使用 anyhow，
// 服务层对外统一返回 ServiceError

use thiserror::Error;

/// 服务操作结果类型
pub type Result<T> = std::result::Result<T, ServiceError>;

/// 后端调用错误
#[derive(Error, Debug)]
pub enum BackendError {
    /// 一次性验证码被拒绝 / 鉴权失败
    #[error("后端拒绝了请求凭据")]
    Unauthorized,

    /// 非成功状态码
    #[error("后端返回状态码 {status}: {body}")]
    Status { status: u16, body: String },

    /// 网络层错误
    #[error("请求失败: {0}")]
    Transport(String),

    /// 响应体无法解析
    #[error("响应解析失败: {0}")]
    Decode(String),

    /// 写入密钥缓存失败
    #[error("密钥文件写入失败: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

impl BackendError {
    /// 日志字段用的简短标签
    pub fn as_label(&self) -> &'static str {
        match self {
            BackendError::Unauthorized => "backend_unauthorized",
            BackendError::Status { .. } => "backend_status",
            BackendError::Transport(_) => "backend_transport",
            BackendError::Decode(_) => "backend_decode",
            BackendError::Io(_) => "backend_io",
        }
    }
}

/// 曝光通知服务错误
#[derive(Error, Debug)]
pub enum ServiceError {
    /// 未领取一次性验证码就尝试上传
    #[error("没有提交密钥，一次性验证码尚未领取")]
    NoSubmissionKeys,

    /// 一次性验证码无效
    #[error("一次性验证码被后端拒绝")]
    InvalidOneTimeCode,

    #[error("后端错误: {0}")]
    Backend(#[from] BackendError),

    /// 原生曝光检测能力调用失败
    #[error("原生接口错误: {0}")]
    Native(anyhow::Error),

    #[error("存储错误: {0}")]
    Storage(anyhow::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 持久化的时间戳无法解析
    #[error("无法解析 {key} 中的时间戳: {value}")]
    CorruptTimestamp { key: String, value: String },

    /// 后台更新任务异常退出
    #[error("更新任务异常终止: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// 日志字段用的简短标签
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::NoSubmissionKeys => "no_submission_keys",
            ServiceError::InvalidOneTimeCode => "invalid_one_time_code",
            ServiceError::Backend(e) => e.as_label(),
            ServiceError::Native(_) => "native",
            ServiceError::Storage(_) => "storage",
            ServiceError::Serialization(_) => "serialization",
            ServiceError::CorruptTimestamp { .. } => "corrupt_timestamp",
            ServiceError::Join(_) => "join",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ServiceError::NoSubmissionKeys.as_label(), "no_submission_keys");
        assert_eq!(
            ServiceError::from(BackendError::Unauthorized).as_label(),
            "backend_unauthorized"
        );
        let err = ServiceError::CorruptTimestamp {
            key: "lastCheckTimeStamp".to_string(),
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("lastCheckTimeStamp"));
    }
}
