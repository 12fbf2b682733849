use serde::{Deserialize, Serialize};

/// # Summary
/// 策略运行时的全局节奏配置。
/// 所有时间间隔均以 tick 时间戳驱动，便于测试完全掌控时钟。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // 配置热加载的最小间隔（秒）
    pub settings_refresh_secs: i64,
    // HOLD 类通知的最小重复间隔（毫秒）
    pub hold_throttle_ms: i64,
    // 每个运行时任务的 tick 队列容量
    pub tick_queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            settings_refresh_secs: 10,
            hold_throttle_ms: 2500,
            tick_queue_capacity: 1024,
        }
    }
}
