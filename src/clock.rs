// 时钟与日期计算 - 所有"现在"都从这里取
//
// 业务逻辑不直接调用 Utc::now()，便于测试和测试模式下推进时间

use chrono::{DateTime, Duration, SubsecRound, TimeZone, Utc};
use std::sync::Mutex;

/// 每个周期的小时数
pub const HOURS_PER_PERIOD: i64 = 12;

/// 时钟接口
pub trait Clock: Send + Sync {
    /// 当前时间
    fn now(&self) -> DateTime<Utc>;

    /// 截断到毫秒的当前时间
    ///
    /// 需要持久化的时间都用这个，保证内存里的值和存储里读回的值一致
    fn now_millis(&self) -> DateTime<Utc> {
        self.now().trunc_subsecs(3)
    }
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动时钟 - 测试模式和单元测试使用
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// 设置当前时间
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// 向前推进
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 加减天数（按 24 小时计）
pub fn add_days(date: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    date + Duration::days(days)
}

/// 两个时间之间相差的日历天数（UTC 日期），`to` 晚于 `from` 为正
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

/// 从 Unix 纪元开始的周期序号
pub fn period_since_epoch(date: DateTime<Utc>) -> i64 {
    date.timestamp().div_euclid(HOURS_PER_PERIOD * 3600)
}

/// 毫秒时间戳字符串，持久化格式
pub fn to_millis_string(date: DateTime<Utc>) -> String {
    date.timestamp_millis().to_string()
}

/// 解析毫秒时间戳字符串，格式不对返回 None
pub fn parse_millis_string(value: &str) -> Option<DateTime<Utc>> {
    let millis = value.trim().parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_days_between_uses_calendar_days() {
        // 不足 24 小时但跨了日期
        assert_eq!(
            days_between(at("2020-05-18T23:50:00Z"), at("2020-05-19T00:10:00Z")),
            1
        );
        // 同一天相差很多小时
        assert_eq!(
            days_between(at("2020-05-19T00:10:00Z"), at("2020-05-19T23:10:00Z")),
            0
        );
        assert_eq!(
            days_between(at("2020-05-20T04:10:00Z"), at("2020-05-18T04:10:00Z")),
            -2
        );
    }

    #[test]
    fn test_period_since_epoch_buckets() {
        let morning = period_since_epoch(at("2020-05-19T06:10:00Z"));
        let late_morning = period_since_epoch(at("2020-05-19T11:10:00Z"));
        let evening = period_since_epoch(at("2020-05-19T13:10:00Z"));
        assert_eq!(morning, late_morning);
        assert_eq!(evening, morning + 1);
        assert_eq!(period_since_epoch(at("1970-01-01T11:59:59Z")), 0);
    }

    #[test]
    fn test_millis_string_roundtrip_and_garbage() {
        let date = at("2020-05-19T07:10:00Z");
        assert_eq!(parse_millis_string(&to_millis_string(date)), Some(date));
        assert_eq!(parse_millis_string("not a number"), None);
    }

    #[test]
    fn test_now_millis_survives_persistence() {
        let clock = ManualClock::new(at("2020-05-19T07:10:00.123456789Z"));
        let now = clock.now_millis();

        assert_eq!(now, at("2020-05-19T07:10:00.123Z"));
        assert_eq!(parse_millis_string(&to_millis_string(now)), Some(now));
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(at("2020-05-19T07:10:00Z"));
        clock.advance(Duration::days(1));
        assert_eq!(clock.now(), at("2020-05-20T07:10:00Z"));
        clock.set(at("2021-01-01T00:00:00Z"));
        assert_eq!(clock.now(), at("2021-01-01T00:00:00Z"));
    }
}
