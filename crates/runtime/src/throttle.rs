use chrono::{DateTime, Duration, Utc};

/// # Summary
/// 信息类通知的限流器：同一原因在最小间隔内只放行一次，
/// 原因变化立即放行。每个运行时持有自己的实例，key 隐含在归属上。
///
/// # Invariants
/// - 只约束 HOLD 类通知；BUY/SELL 信号从不经过限流。
/// - 时间判断完全由调用方传入的 tick 时间戳驱动。
#[derive(Debug)]
pub struct SignalThrottle {
    min_interval: Duration,
    last_reason: Option<String>,
    last_at: Option<DateTime<Utc>>,
}

impl SignalThrottle {
    pub fn new(min_interval_ms: i64) -> Self {
        Self {
            min_interval: Duration::milliseconds(min_interval_ms),
            last_reason: None,
            last_at: None,
        }
    }

    /// # Summary
    /// 判定该原因此刻是否应当对外发布。
    ///
    /// # Logic
    /// 1. 原因与上次不同 → 放行。
    /// 2. 原因相同但距上次放行已超过最小间隔 → 放行。
    /// 3. 否则压制。放行时记录原因与时间。
    pub fn should_emit(&mut self, reason: &str, now: DateTime<Utc>) -> bool {
        let emit = match (&self.last_reason, self.last_at) {
            (Some(last), Some(at)) => last != reason || now - at >= self.min_interval,
            _ => true,
        };
        if emit {
            self.last_reason = Some(reason.to_string());
            self.last_at = Some(now);
        }
        emit
    }

    /// 清除记忆。在进场成交或窗口失效后调用，让下一个 HOLD 立即可见。
    pub fn reset(&mut self) {
        self.last_reason = None;
        self.last_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }

    #[test]
    fn test_same_reason_suppressed_within_interval() {
        let mut t = SignalThrottle::new(2000);
        assert!(t.should_emit("warming_up", at(0)));
        assert!(!t.should_emit("warming_up", at(500)));
        assert!(!t.should_emit("warming_up", at(1999)));
        assert!(t.should_emit("warming_up", at(2000)));
    }

    #[test]
    fn test_reason_change_emits_immediately() {
        let mut t = SignalThrottle::new(2000);
        assert!(t.should_emit("warming_up", at(0)));
        assert!(t.should_emit("cooldown", at(10)));
        assert!(!t.should_emit("cooldown", at(20)));
    }

    #[test]
    fn test_reset_clears_memory() {
        let mut t = SignalThrottle::new(2000);
        assert!(t.should_emit("cooldown", at(0)));
        t.reset();
        assert!(t.should_emit("cooldown", at(1)));
    }
}
