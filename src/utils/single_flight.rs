//! 单飞守卫
//!
//! 忙时直接拒绝（不排队）。守卫释放时清除标志，
//! 守卫可以移动到 spawn 出去的任务里，调用方放弃等待也不会提前释放

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 单飞标志
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试占用；已被占用时返回 None
    pub fn try_acquire(&self) -> Option<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// 占用凭据，Drop 时释放
#[derive(Debug)]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
