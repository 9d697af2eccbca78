// 存储模块 - 统一的键值持久化抽象层

// 子模块
pub mod cleaner;
pub mod config;
pub mod repository;

// 重新导出主要类型
pub use cleaner::KeyCacheCleaner;
pub use config::{
    SecureStorageOptions, LAST_CHECK_TIMESTAMP, SUBMISSION_AUTH_KEYS,
    SUBMISSION_CYCLE_STARTED_AT, SUBMISSION_LAST_COMPLETED_AT,
};
pub use repository::{KeyValueStore, SecureKeyValueStore};

// 重新导出具体实现
pub use repository::memory::MemoryRepository;
pub use repository::sqlite::SqliteRepository;
