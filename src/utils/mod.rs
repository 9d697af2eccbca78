//! 工具函数模块
//!
//! - 单飞守卫（同一时间只允许一个执行者）
//! - 输入验证

pub mod single_flight;
pub mod validation;

pub use single_flight::{FlightGuard, SingleFlight};
pub use validation::*;
