//! StrategyRuntime 状态机集成测试：
//! 预热/进出场/冷却/热加载/故障注入的完整路径。

use chrono::{DateTime, Duration, Utc};
use kagi_core::common::{AccountId, PriceTick};
use kagi_core::config::RuntimeConfig;
use kagi_core::strategy::entity::{Decision, RuntimeKey, RuntimePhase, SignalKind, StrategyKind};
use kagi_core::strategy::port::DecisionFn;
use kagi_core::test_utils::{
    EntryPlan, InMemorySettingsSource, LiveEvent, MockExecutionGateway, RecordingLivePublisher,
    test_snapshot,
};
use kagi_runtime::runtime::{RuntimeError, StrategyRuntime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn key() -> RuntimeKey {
    RuntimeKey::new(AccountId("u1".to_string()), StrategyKind::WindowScalping)
}

fn always_enter() -> DecisionFn {
    Arc::new(|_, _| Decision::enter(dec!(50)))
}

fn never_enter() -> DecisionFn {
    Arc::new(|_, _| Decision::no_signal("no_edge"))
}

struct Harness {
    source: Arc<InMemorySettingsSource>,
    gateway: Arc<MockExecutionGateway>,
    live: Arc<RecordingLivePublisher>,
    base: DateTime<Utc>,
}

impl Harness {
    fn new() -> Self {
        Self {
            source: Arc::new(InMemorySettingsSource::new()),
            gateway: Arc::new(MockExecutionGateway::new()),
            live: Arc::new(RecordingLivePublisher::new()),
            base: Utc::now(),
        }
    }

    async fn start(&self, decision: DecisionFn) -> Result<StrategyRuntime, RuntimeError> {
        StrategyRuntime::start(
            key(),
            decision,
            self.source.clone(),
            self.gateway.clone(),
            self.live.clone(),
            &RuntimeConfig::default(),
        )
        .await
    }

    async fn tick(&self, rt: &mut StrategyRuntime, price: Decimal, secs: i64) {
        self.tick_symbol(rt, "BTCUSDT", price, secs).await;
    }

    async fn tick_symbol(&self, rt: &mut StrategyRuntime, symbol: &str, price: Decimal, secs: i64) {
        rt.on_price_update(PriceTick::new(
            symbol,
            price,
            self.base + Duration::seconds(secs),
        ))
        .await;
    }
}

#[tokio::test]
async fn test_start_fails_without_settings() {
    let h = Harness::new();
    let result = h.start(never_enter()).await;
    assert!(matches!(result, Err(RuntimeError::Settings(_))));
}

#[tokio::test]
async fn test_warms_up_until_window_full() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 3));
    let mut rt = h.start(never_enter()).await.unwrap();
    assert_eq!(rt.state().phase(), RuntimePhase::WarmingUp);

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(101), 1).await;
    assert_eq!(rt.state().phase(), RuntimePhase::WarmingUp);
    assert_eq!(rt.state().warmups(), 2);

    h.tick(&mut rt, dec!(102), 2).await;
    assert_eq!(rt.state().phase(), RuntimePhase::Flat);
    assert_eq!(rt.state().ticks(), 3);
    // 观望决策不触碰网关
    assert_eq!(h.gateway.entry_calls(), 0);
    assert!(h.live.count_holds_with_reason("warming_up") >= 1);
}

#[tokio::test]
async fn test_window_evicts_oldest_beyond_capacity() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 3));
    let mut rt = h.start(never_enter()).await.unwrap();

    let mut secs = 0;
    for p in [dec!(10), dec!(10), dec!(10), dec!(11)] {
        h.tick(&mut rt, p, secs).await;
        secs += 1;
    }
    assert_eq!(rt.state().window_prices(), vec![dec!(10), dec!(10), dec!(11)]);
}

#[tokio::test]
async fn test_entry_fills_and_clears_window() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 2));
    let mut rt = h.start(always_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(100), 1).await;

    assert_eq!(rt.state().phase(), RuntimePhase::InPosition);
    assert_eq!(rt.state().entries(), 1);
    let pos = rt.state().position().unwrap();
    assert_eq!(pos.entry_price, dec!(100));
    assert_eq!(pos.tp, dec!(110));
    assert_eq!(pos.sl, dec!(95));
    assert!(pos.is_long);
    assert!(pos.order_ref.is_some());
    // 成交后窗口清空，避免同一条件立即复燃
    assert!(rt.state().window_prices().is_empty());
    assert_eq!(h.live.count_signals(SignalKind::Buy), 1);
}

#[tokio::test]
async fn test_exit_fires_once_on_tp_hit() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 2));
    let mut rt = h.start(always_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(100), 1).await;
    assert_eq!(rt.state().phase(), RuntimePhase::InPosition);

    // TP=110 未触及，持仓原样保留
    h.tick(&mut rt, dec!(105), 2).await;
    assert_eq!(rt.state().phase(), RuntimePhase::InPosition);
    let pos = rt.state().position().unwrap();
    assert_eq!(pos.entry_price, dec!(100));
    assert_eq!(pos.qty, dec!(1));

    h.tick(&mut rt, dec!(110), 3).await;
    assert_eq!(rt.state().exits(), 1);
    assert!(rt.state().position().is_none());
    assert_eq!(rt.state().phase(), RuntimePhase::WarmingUp);
    assert_eq!(h.live.count_signals(SignalKind::Sell), 1);
    assert!(h.live.events().contains(&LiveEvent::ClearTpSl));
}

#[tokio::test]
async fn test_exit_fires_on_sl_hit() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 2));
    let mut rt = h.start(always_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(100), 1).await;
    h.tick(&mut rt, dec!(94), 2).await;

    assert_eq!(rt.state().exits(), 1);
    assert!(rt.state().position().is_none());
    let sells: Vec<_> = h
        .live
        .events()
        .into_iter()
        .filter(|e| matches!(e, LiveEvent::Signal { kind: SignalKind::Sell, .. }))
        .collect();
    assert_eq!(
        sells,
        vec![LiveEvent::Signal {
            kind: SignalKind::Sell,
            reason: "sl".to_string()
        }]
    );
}

#[tokio::test]
async fn test_cooldown_overrides_entry_intent() {
    let h = Harness::new();
    let mut snapshot = test_snapshot("BTCUSDT", 2);
    snapshot.cooldown_secs = 60;
    h.source.put(key(), snapshot);
    let mut rt = h.start(always_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(100), 1).await;
    h.tick(&mut rt, dec!(110), 2).await;
    assert_eq!(rt.state().exits(), 1);
    assert_eq!(h.gateway.entry_calls(), 1);

    // 冷却期内窗口再次充满，进场意图被覆盖为观望
    h.tick(&mut rt, dec!(100), 3).await;
    h.tick(&mut rt, dec!(100), 4).await;
    assert_eq!(h.gateway.entry_calls(), 1);
    assert!(rt.state().position().is_none());
    assert!(h.live.count_holds_with_reason("cooldown") >= 1);

    // 冷却结束后放行
    h.tick(&mut rt, dec!(100), 63).await;
    assert_eq!(h.gateway.entry_calls(), 2);
    assert_eq!(rt.state().phase(), RuntimePhase::InPosition);
}

#[tokio::test]
async fn test_entry_fault_leaves_state_flat_and_retries() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 2));
    h.gateway.plan_entry(EntryPlan::Fault);
    let mut rt = h.start(always_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(100), 1).await;
    // 故障即单 tick no-op：空仓、窗口保留
    assert!(rt.state().position().is_none());
    assert_eq!(rt.state().phase(), RuntimePhase::Flat);
    assert_eq!(h.live.count_holds_with_reason("entry_failed"), 1);

    // 条件复现时自然重试成交
    h.tick(&mut rt, dec!(100), 2).await;
    assert_eq!(h.gateway.entry_calls(), 2);
    assert_eq!(rt.state().phase(), RuntimePhase::InPosition);
}

#[tokio::test]
async fn test_entry_rejection_reported_as_hold() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 2));
    h.gateway
        .plan_entry(EntryPlan::Reject("insufficient_balance".to_string()));
    let mut rt = h.start(always_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(100), 1).await;
    assert!(rt.state().position().is_none());
    assert_eq!(h.live.count_holds_with_reason("insufficient_balance"), 1);
    assert_eq!(rt.state().entries(), 0);
}

#[tokio::test]
async fn test_invalid_price_is_rejected() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 3));
    let mut rt = h.start(never_enter()).await.unwrap();

    h.tick(&mut rt, Decimal::ZERO, 0).await;
    h.tick(&mut rt, dec!(-5), 1).await;
    assert!(rt.state().window_prices().is_empty());
    assert_eq!(rt.state().ticks(), 2);
    assert_eq!(rt.state().warmups(), 0);
}

#[tokio::test]
async fn test_foreign_symbol_is_ignored() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 3));
    let mut rt = h.start(never_enter()).await.unwrap();

    h.tick_symbol(&mut rt, "ETHUSDT", dec!(100), 0).await;
    assert!(rt.state().window_prices().is_empty());
    assert_eq!(h.live.count_signals(SignalKind::Hold), 1); // 仅 "started"

    // 大小写与空白不影响匹配
    h.tick_symbol(&mut rt, " btcusdt ", dec!(100), 1).await;
    assert_eq!(rt.state().window_prices(), vec![dec!(100)]);
}

#[tokio::test]
async fn test_hold_signals_are_throttled() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 5));
    let mut rt = h.start(never_enter()).await.unwrap();

    // 默认限流 2500ms：间隔内的同因重复被压制
    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(100), 1).await;
    h.tick(&mut rt, dec!(100), 2).await;
    assert_eq!(h.live.count_holds_with_reason("warming_up"), 1);
    h.tick(&mut rt, dec!(100), 3).await;
    assert_eq!(h.live.count_holds_with_reason("warming_up"), 2);
}

#[tokio::test]
async fn test_unchanged_reload_keeps_window() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 3));
    let mut rt = h.start(never_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(101), 1).await;
    // 刷新间隔已过，指纹未变，窗口不受影响
    h.tick(&mut rt, dec!(102), 11).await;
    assert_eq!(rt.state().window_prices(), vec![dec!(100), dec!(101), dec!(102)]);
    assert!(h.source.load_calls() >= 2);
}

#[tokio::test]
async fn test_symbol_change_clears_window_when_flat() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 3));
    let mut rt = h.start(never_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(101), 1).await;

    h.source.put(key(), test_snapshot("ETHUSDT", 3));
    // 这个 tick 触发热加载换标的；自身还带着旧标的，被闸门拦下
    h.tick(&mut rt, dec!(102), 11).await;
    assert_eq!(rt.state().symbol(), "ETHUSDT");
    assert!(rt.state().window_prices().is_empty());

    h.tick_symbol(&mut rt, "ETHUSDT", dec!(2000), 12).await;
    assert_eq!(rt.state().window_prices(), vec![dec!(2000)]);
}

#[tokio::test]
async fn test_foreign_symbol_tick_still_drives_reload() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 3));
    let mut rt = h.start(never_enter()).await.unwrap();

    h.source.put(key(), test_snapshot("ETHUSDT", 3));
    // 重载先于符号闸门：别家标的的 tick 也会推动重载时钟并落地换标的，
    // 自身随后仍被闸门拦下
    h.tick_symbol(&mut rt, "DOGEUSDT", dec!(1), 11).await;
    assert_eq!(rt.state().symbol(), "ETHUSDT");
    assert!(rt.state().window_prices().is_empty());

    h.tick_symbol(&mut rt, "ETHUSDT", dec!(2000), 12).await;
    assert_eq!(rt.state().window_prices(), vec![dec!(2000)]);
}

#[tokio::test]
async fn test_window_resize_restarts_warmup() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 3));
    let mut rt = h.start(never_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(101), 1).await;

    h.source.put(key(), test_snapshot("BTCUSDT", 5));
    h.tick(&mut rt, dec!(102), 11).await;
    // 容量变化重建空窗口，本 tick 的价格是新窗口的第一笔
    assert_eq!(rt.state().window_prices(), vec![dec!(102)]);
    assert_eq!(rt.state().phase(), RuntimePhase::WarmingUp);
}

#[tokio::test]
async fn test_symbol_change_deferred_while_in_position() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 2));
    let mut rt = h.start(always_enter()).await.unwrap();

    h.tick(&mut rt, dec!(100), 0).await;
    h.tick(&mut rt, dec!(100), 1).await;
    assert_eq!(rt.state().phase(), RuntimePhase::InPosition);

    h.source.put(key(), test_snapshot("ETHUSDT", 2));
    // 持仓中换标的被推迟，仓位与标的保持不变
    h.tick(&mut rt, dec!(105), 12).await;
    assert_eq!(rt.state().symbol(), "BTCUSDT");
    assert_eq!(rt.state().phase(), RuntimePhase::InPosition);

    // 平仓后的下一次重载把变更补上
    h.tick(&mut rt, dec!(110), 13).await;
    assert!(rt.state().position().is_none());
    h.tick(&mut rt, dec!(100), 23).await;
    assert_eq!(rt.state().symbol(), "ETHUSDT");
    assert!(rt.state().window_prices().is_empty());
}

#[tokio::test]
async fn test_reload_outage_keeps_trading_on_last_good() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 2));
    let mut rt = h.start(always_enter()).await.unwrap();

    h.source.fail_next(1);
    h.tick(&mut rt, dec!(100), 11).await;
    h.tick(&mut rt, dec!(100), 12).await;
    // 重载故障不影响交易路径
    assert_eq!(rt.state().phase(), RuntimePhase::InPosition);
    assert_eq!(rt.settings().symbol, "BTCUSDT");
}

#[tokio::test]
async fn test_shutdown_publishes_inactive_state() {
    let h = Harness::new();
    h.source.put(key(), test_snapshot("BTCUSDT", 2));
    let mut rt = h.start(never_enter()).await.unwrap();
    assert_eq!(h.live.count_states(true), 1);

    rt.shutdown().await;
    assert_eq!(h.live.count_states(false), 1);
    assert!(h.live.events().contains(&LiveEvent::ClearPriceLines));
}
