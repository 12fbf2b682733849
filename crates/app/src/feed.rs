use chrono::Utc;
use kagi_core::common::PriceTick;
use kagi_core::strategy::entity::RuntimeKey;
use kagi_scheduler::scheduler::StrategyScheduler;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// # Summary
/// 演示行情源的参数。
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_base_price")]
    pub base_price: Decimal,
    // 围绕基准价上下摆动的最大偏移
    #[serde(default = "default_amplitude")]
    pub amplitude: Decimal,
    // 每个 tick 的价格步长
    #[serde(default = "default_step")]
    pub step: Decimal,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_base_price() -> Decimal {
    Decimal::ONE_HUNDRED
}

fn default_amplitude() -> Decimal {
    Decimal::TEN
}

fn default_step() -> Decimal {
    Decimal::ONE
}

fn default_interval_ms() -> u64 {
    500
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            base_price: default_base_price(),
            amplitude: default_amplitude(),
            step: default_step(),
            interval_ms: default_interval_ms(),
        }
    }
}

/// # Summary
/// 启动合成行情协程：价格在 `base ± amplitude` 之间确定性锯齿摆动，
/// 逐 tick 投递给所有运行中的策略。没有真实交易所通道时用它联调全链路。
pub fn spawn(
    scheduler: Arc<StrategyScheduler>,
    keys: Vec<RuntimeKey>,
    config: FeedConfig,
) -> JoinHandle<()> {
    info!(
        "demo feed starting symbol={} base={} amplitude={} step={} interval_ms={}",
        config.symbol, config.base_price, config.amplitude, config.step, config.interval_ms
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(config.interval_ms.max(1)));
        let floor = config.base_price - config.amplitude;
        let ceiling = config.base_price + config.amplitude;
        let mut price = config.base_price;
        let mut rising = true;

        loop {
            interval.tick().await;

            price = if rising {
                price + config.step
            } else {
                price - config.step
            };
            if price >= ceiling {
                rising = false;
            } else if price <= floor {
                rising = true;
            }

            let tick = PriceTick::new(config.symbol.clone(), price, Utc::now());
            for key in &keys {
                scheduler.on_price_update(key, tick.clone());
            }
        }
    })
}
