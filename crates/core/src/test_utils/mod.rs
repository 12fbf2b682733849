//! 供各 crate 集成测试使用的内存版协作者实现。
//! 仅在 `test-utils` feature 下编译，不进入生产依赖图。

#![allow(clippy::unwrap_used)]

use crate::common::{NetworkType, TimeFrame};
use crate::live::error::LiveError;
use crate::live::port::LivePublisher;
use crate::settings::entity::SettingsSnapshot;
use crate::settings::error::SettingsError;
use crate::settings::port::SettingsSource;
use crate::strategy::entity::{Position, RuntimeKey, Signal, SignalKind};
use crate::trade::entity::{EntryOutcome, ExitOutcome, OrderId};
use crate::trade::port::{ExecutionGateway, TradeError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// # Summary
/// 构造一份各字段均合法的测试快照。
pub fn test_snapshot(symbol: &str, window_size: usize) -> SettingsSnapshot {
    SettingsSnapshot {
        symbol: symbol.to_string(),
        exchange: "BINANCE".to_string(),
        network: NetworkType::Testnet,
        timeframe: TimeFrame::Minute1,
        window_size,
        cooldown_secs: 0,
        take_profit_pct: Decimal::TEN,
        stop_loss_pct: Decimal::from(5),
        capital_quote: Some(Decimal::ONE_HUNDRED),
        risk_per_trade_pct: None,
        max_exposure_quote: None,
        params: BTreeMap::new(),
    }
}

/// # Summary
/// 基于 DashMap 的内存配置源，支持注入瞬态故障。
pub struct InMemorySettingsSource {
    entries: DashMap<RuntimeKey, SettingsSnapshot>,
    // 剩余的强制失败次数
    fail_next: AtomicUsize,
    load_calls: AtomicUsize,
}

impl Default for InMemorySettingsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySettingsSource {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            fail_next: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, key: RuntimeKey, snapshot: SettingsSnapshot) {
        self.entries.insert(key, snapshot);
    }

    /// 让接下来 `n` 次 load 返回存储故障
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsSource for InMemorySettingsSource {
    async fn load_settings(&self, key: &RuntimeKey) -> Result<SettingsSnapshot, SettingsError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SettingsError::Store("injected outage".to_string()));
        }
        self.entries
            .get(key)
            .map(|e| e.clone())
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))
    }
}

/// 下一次进场调用的剧本。
#[derive(Debug, Clone)]
pub enum EntryPlan {
    // 按快照的 TP/SL 百分比正常成交
    Fill,
    // 业务拒绝
    Reject(String),
    // 通道故障
    Fault,
}

/// 下一次离场调用的剧本。
#[derive(Debug, Clone)]
pub enum ExitPlan {
    // 按持仓的 TP/SL 真实判定是否触及
    Auto,
    // 通道故障
    Fault,
}

/// # Summary
/// 可编排剧本的执行网关。默认进场即成交、离场按 TP/SL 判定，
/// 队列中的剧本按序消费，耗尽后回到默认行为。
pub struct MockExecutionGateway {
    entry_plans: Mutex<VecDeque<EntryPlan>>,
    exit_plans: Mutex<VecDeque<ExitPlan>>,
    entry_calls: AtomicUsize,
    exit_calls: AtomicUsize,
}

impl Default for MockExecutionGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutionGateway {
    pub fn new() -> Self {
        Self {
            entry_plans: Mutex::new(VecDeque::new()),
            exit_plans: Mutex::new(VecDeque::new()),
            entry_calls: AtomicUsize::new(0),
            exit_calls: AtomicUsize::new(0),
        }
    }

    pub fn plan_entry(&self, plan: EntryPlan) {
        self.entry_plans.lock().unwrap().push_back(plan);
    }

    pub fn plan_exit(&self, plan: ExitPlan) {
        self.exit_plans.lock().unwrap().push_back(plan);
    }

    pub fn entry_calls(&self) -> usize {
        self.entry_calls.load(Ordering::SeqCst)
    }

    pub fn exit_calls(&self) -> usize {
        self.exit_calls.load(Ordering::SeqCst)
    }
}

fn pct(p: Decimal) -> Decimal {
    p / Decimal::ONE_HUNDRED
}

#[async_trait]
impl ExecutionGateway for MockExecutionGateway {
    async fn execute_entry(
        &self,
        _key: &RuntimeKey,
        _symbol: &str,
        price: Decimal,
        _score: Decimal,
        _time: DateTime<Utc>,
        settings: &SettingsSnapshot,
    ) -> Result<EntryOutcome, TradeError> {
        self.entry_calls.fetch_add(1, Ordering::SeqCst);
        let plan = self
            .entry_plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(EntryPlan::Fill);
        match plan {
            EntryPlan::Fill => {
                let tp = price * (Decimal::ONE + pct(settings.take_profit_pct));
                let sl = price * (Decimal::ONE - pct(settings.stop_loss_pct));
                Ok(EntryOutcome::filled(
                    price,
                    Decimal::ONE,
                    tp,
                    sl,
                    OrderId(Uuid::new_v4().to_string()),
                ))
            }
            EntryPlan::Reject(reason) => Ok(EntryOutcome::rejected(reason)),
            EntryPlan::Fault => Err(TradeError::BrokerIntegration(
                "injected entry fault".to_string(),
            )),
        }
    }

    async fn execute_exit_if_hit(
        &self,
        _key: &RuntimeKey,
        _symbol: &str,
        price: Decimal,
        _time: DateTime<Utc>,
        position: &Position,
    ) -> Result<ExitOutcome, TradeError> {
        self.exit_calls.fetch_add(1, Ordering::SeqCst);
        let plan = self
            .exit_plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ExitPlan::Auto);
        match plan {
            ExitPlan::Auto => {
                let (tp_hit, sl_hit) = if position.is_long {
                    (price >= position.tp, price <= position.sl)
                } else {
                    (price <= position.tp, price >= position.sl)
                };
                if tp_hit || sl_hit {
                    Ok(ExitOutcome::filled(tp_hit, sl_hit, price))
                } else {
                    Ok(ExitOutcome::not_hit())
                }
            }
            ExitPlan::Fault => Err(TradeError::BrokerIntegration(
                "injected exit fault".to_string(),
            )),
        }
    }
}

/// 录制下来的单条推送事件。
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    State { active: bool },
    Signal { kind: SignalKind, reason: String },
    Tick { price: Decimal },
    ClearTpSl,
    ClearPriceLines,
}

/// # Summary
/// 把所有推送录制到内存的 LivePublisher，供测试断言通知行为。
pub struct RecordingLivePublisher {
    events: Mutex<Vec<LiveEvent>>,
}

impl Default for RecordingLivePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingLivePublisher {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<LiveEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_signals(&self, kind: SignalKind) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, LiveEvent::Signal { kind: k, .. } if *k == kind))
            .count()
    }

    pub fn count_holds_with_reason(&self, reason: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| {
                matches!(e, LiveEvent::Signal { kind: SignalKind::Hold, reason: r } if r == reason)
            })
            .count()
    }

    pub fn count_states(&self, active: bool) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, LiveEvent::State { active: a } if *a == active))
            .count()
    }

    fn record(&self, event: LiveEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl LivePublisher for RecordingLivePublisher {
    async fn push_state(
        &self,
        _key: &RuntimeKey,
        _symbol: &str,
        active: bool,
    ) -> Result<(), LiveError> {
        self.record(LiveEvent::State { active });
        Ok(())
    }

    async fn push_signal(
        &self,
        _key: &RuntimeKey,
        _symbol: &str,
        signal: &Signal,
    ) -> Result<(), LiveError> {
        self.record(LiveEvent::Signal {
            kind: signal.kind,
            reason: signal.reason.clone(),
        });
        Ok(())
    }

    async fn push_price_tick(
        &self,
        _key: &RuntimeKey,
        _symbol: &str,
        price: Decimal,
        _time: DateTime<Utc>,
    ) -> Result<(), LiveError> {
        self.record(LiveEvent::Tick { price });
        Ok(())
    }

    async fn clear_tp_sl(&self, _key: &RuntimeKey, _symbol: &str) -> Result<(), LiveError> {
        self.record(LiveEvent::ClearTpSl);
        Ok(())
    }

    async fn clear_price_lines(&self, _key: &RuntimeKey, _symbol: &str) -> Result<(), LiveError> {
        self.record(LiveEvent::ClearPriceLines);
        Ok(())
    }
}
