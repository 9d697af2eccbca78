// 回填游标 - 计算还需要下载哪些周期的诊断密钥

use crate::clock::{add_days, period_since_epoch};
use chrono::{DateTime, Utc};

/// 最多向前回看的天数（诊断密钥的保留窗口）
pub const DEFAULT_LOOKBACK_DAYS: i64 = 14;
/// 每次下载前进的周期数（两个 12 小时周期 = 一天）
pub const PERIODS_PER_FETCH: i64 = 2;

/// 回填游标
///
/// 从当前周期开始向过去走，每步产出一个待下载的周期，
/// 到达（但不越过）上次检查所在周期时结束。上次检查早于回看窗口
/// 或没有记录时，以窗口起点为准。游标只能消费一次。
#[derive(Debug)]
pub struct BackfillCursor {
    running_period: i64,
    last_checked_period: i64,
}

impl BackfillCursor {
    pub fn new(now: DateTime<Utc>, last_checked: Option<DateTime<Utc>>) -> Self {
        let window_start = add_days(now, -DEFAULT_LOOKBACK_DAYS);
        let last_checked = last_checked.map_or(window_start, |ts| ts.max(window_start));
        Self {
            running_period: period_since_epoch(now),
            last_checked_period: period_since_epoch(last_checked),
        }
    }

    /// 剩余的下载次数
    pub fn remaining(&self) -> usize {
        let gap = self.running_period - self.last_checked_period;
        if gap <= 0 {
            0
        } else {
            ((gap + PERIODS_PER_FETCH - 1) / PERIODS_PER_FETCH) as usize
        }
    }
}

impl Iterator for BackfillCursor {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.running_period <= self.last_checked_period {
            return None;
        }
        let period = self.running_period;
        self.running_period -= PERIODS_PER_FETCH;
        Some(period)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BackfillCursor {}
