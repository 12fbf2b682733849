use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kagi_core::live::error::LiveError;
use kagi_core::live::port::LivePublisher;
use kagi_core::strategy::entity::{RuntimeKey, Signal};
use rust_decimal::Decimal;
use tracing::{debug, info, trace};

/// # Summary
/// 把实时推送落到结构化日志的 LivePublisher。
/// 没有外接 UI 的部署形态下，日志流就是观察策略行为的窗口。
pub struct TracingLivePublisher;

#[async_trait]
impl LivePublisher for TracingLivePublisher {
    async fn push_state(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        active: bool,
    ) -> Result<(), LiveError> {
        info!("live state key={} symbol={} active={}", key, symbol, active);
        Ok(())
    }

    async fn push_signal(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        signal: &Signal,
    ) -> Result<(), LiveError> {
        info!(
            "live signal key={} symbol={} kind={:?} reason={} score={:?}",
            key, symbol, signal.kind, signal.reason, signal.score
        );
        Ok(())
    }

    // 行情流量大，价格推送只在 trace 级别可见
    async fn push_price_tick(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        price: Decimal,
        _time: DateTime<Utc>,
    ) -> Result<(), LiveError> {
        trace!("live tick key={} symbol={} price={}", key, symbol, price);
        Ok(())
    }

    async fn clear_tp_sl(&self, key: &RuntimeKey, symbol: &str) -> Result<(), LiveError> {
        debug!("live clear tp/sl key={} symbol={}", key, symbol);
        Ok(())
    }

    async fn clear_price_lines(&self, key: &RuntimeKey, symbol: &str) -> Result<(), LiveError> {
        debug!("live clear price lines key={} symbol={}", key, symbol);
        Ok(())
    }
}
