use crate::throttle::SignalThrottle;
use crate::watcher::{ReloadOutcome, SettingsWatcher};
use crate::window::PriceWindow;
use chrono::{DateTime, Duration, Utc};
use kagi_core::common::{NetworkType, PriceTick};
use kagi_core::config::RuntimeConfig;
use kagi_core::live::error::LiveError;
use kagi_core::live::port::LivePublisher;
use kagi_core::settings::entity::SettingsSnapshot;
use kagi_core::settings::error::SettingsError;
use kagi_core::settings::port::SettingsSource;
use kagi_core::strategy::entity::{Decision, Position, RuntimeKey, RuntimePhase, Signal};
use kagi_core::strategy::port::DecisionFn;
use kagi_core::trade::port::ExecutionGateway;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// # Summary
/// 运行时层的统一错误类型。只有启动期会对外暴露错误；
/// 运行期的一切故障都在 tick 内部消化。
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// # Summary
/// 单个策略运行时的全部可变状态。
///
/// # Invariants
/// - 活跃期间被唯一的 StrategyRuntime 独占（所有权即互斥）。
/// - `position` 为 `Some` 当且仅当状态机处于 `InPosition` 阶段。
/// - 窗口长度永远不超过配置容量。
#[derive(Debug)]
pub struct RuntimeState {
    symbol: String,
    exchange: String,
    network: NetworkType,
    started_at: DateTime<Utc>,
    ticks: u64,
    warmups: u64,
    entries: u64,
    exits: u64,
    window: PriceWindow,
    position: Option<Position>,
    last_trade_closed_at: Option<DateTime<Utc>>,
}

impl RuntimeState {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn network(&self) -> NetworkType {
        self.network
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn window_prices(&self) -> Vec<Decimal> {
        self.window.to_vec()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn warmups(&self) -> u64 {
        self.warmups
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn exits(&self) -> u64 {
        self.exits
    }

    /// 由窗口填充度与持仓推导当前阶段。
    pub fn phase(&self) -> RuntimePhase {
        if self.position.is_some() {
            RuntimePhase::InPosition
        } else if self.window.is_full() {
            RuntimePhase::Flat
        } else {
            RuntimePhase::WarmingUp
        }
    }
}

/// # Summary
/// 每个 (账户, 策略种类) 一个的决策状态机。
/// 持有价格窗口、持仓状态与配置看守，通过注入的纯决策函数产生
/// 进场意图，经执行网关落地，并向实时通道发布遥测。
///
/// # Invariants
/// - `on_price_update` 通过 `&mut self` 独占执行：窗口变更、仓位迁移
///   与外部调用构成单 tick 的原子单元，同 key 从不交错。
/// - 网关与推送通道的故障绝不向上传播撕毁运行时。
pub struct StrategyRuntime {
    key: RuntimeKey,
    decision: DecisionFn,
    watcher: SettingsWatcher,
    gateway: Arc<dyn ExecutionGateway>,
    live: Arc<dyn LivePublisher>,
    throttle: SignalThrottle,
    state: RuntimeState,
}

impl StrategyRuntime {
    /// # Summary
    /// 装载配置并初始化运行时。
    ///
    /// # Logic
    /// 1. 经 SettingsWatcher 首次装载（规范化 + 校验），失败即同步报错。
    /// 2. 以快照中的 symbol/exchange/network 初始化空窗口、无持仓的状态。
    /// 3. 发布激活状态与 HOLD("started") 通知。
    ///
    /// # Returns
    /// * `Err(RuntimeError::Settings)` - 配置缺失或不可运行，启动失败。
    pub async fn start(
        key: RuntimeKey,
        decision: DecisionFn,
        source: Arc<dyn SettingsSource>,
        gateway: Arc<dyn ExecutionGateway>,
        live: Arc<dyn LivePublisher>,
        config: &RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        let now = Utc::now();
        let watcher =
            SettingsWatcher::load(source, key.clone(), config.settings_refresh_secs, now).await?;

        let snapshot = watcher.snapshot();
        let state = RuntimeState {
            symbol: snapshot.symbol.clone(),
            exchange: snapshot.exchange.clone(),
            network: snapshot.network,
            started_at: now,
            ticks: 0,
            warmups: 0,
            entries: 0,
            exits: 0,
            window: PriceWindow::new(snapshot.window_size),
            position: None,
            last_trade_closed_at: None,
        };

        info!(
            "runtime started key={} symbol={} exchange={} network={} window={}",
            key, state.symbol, state.exchange, state.network, snapshot.window_size
        );

        let runtime = Self {
            key,
            decision,
            watcher,
            gateway,
            live,
            throttle: SignalThrottle::new(config.hold_throttle_ms),
            state,
        };

        swallow(
            runtime
                .live
                .push_state(&runtime.key, &runtime.state.symbol, true)
                .await,
        );
        swallow(
            runtime
                .live
                .push_signal(
                    &runtime.key,
                    &runtime.state.symbol,
                    &Signal::hold("started", now),
                )
                .await,
        );

        Ok(runtime)
    }

    pub fn key(&self) -> &RuntimeKey {
        &self.key
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn settings(&self) -> &SettingsSnapshot {
        self.watcher.snapshot()
    }

    /// # Summary
    /// 核心状态迁移：处理一个价格更新。
    ///
    /// # Logic
    /// 1. 拒绝非正价格（限流告警，不改状态）。
    /// 2. 按需热加载配置（换标的清窗口，持仓中推迟换标的）。
    ///    重载在符号闸门之前：非当前标的的 tick 同样推动重载时钟、
    ///    落地配置变更，换标的后不必等旧标的再来一笔行情。
    /// 3. 符号闸门：非当前标的的 tick 直接忽略，
    ///    换标的后旧标的的余波 tick 在这里被拦下。
    /// 4. 持仓中先做离场检查（TP/SL 触达经网关确认）。
    /// 5. 空仓时做进场检查（预热 → 决策函数 → 冷却覆盖 → 网关进场）。
    ///
    /// 网关与推送故障均就地消化，本方法从不失败。
    pub async fn on_price_update(&mut self, tick: PriceTick) {
        self.state.ticks += 1;
        let now = tick.timestamp;

        if tick.price <= Decimal::ZERO {
            if self.throttle.should_emit("invalid_price", now) {
                warn!(
                    "invalid price key={} price={}",
                    self.key, tick.price
                );
            }
            return;
        }

        self.refresh_settings(now).await;

        // 同一条行情通道喂多个运行时，别人的 tick 不处理
        if !tick.symbol.trim().eq_ignore_ascii_case(&self.state.symbol) {
            return;
        }

        swallow(
            self.live
                .push_price_tick(&self.key, &self.state.symbol, tick.price, now)
                .await,
        );

        if self.state.position.is_some() {
            self.check_exit(tick.price, now).await;
        }
        if self.state.position.is_none() {
            self.check_entry(tick.price, now).await;
        }
    }

    /// # Summary
    /// 协作式停止时的收尾：清理图表标线、发布停用状态、落统计日志。
    pub async fn shutdown(&mut self) {
        info!(
            "runtime stopped key={} symbol={} ticks={} warmups={} entries={} exits={} in_position={}",
            self.key,
            self.state.symbol,
            self.state.ticks,
            self.state.warmups,
            self.state.entries,
            self.state.exits,
            self.state.position.is_some()
        );

        swallow(self.live.clear_tp_sl(&self.key, &self.state.symbol).await);
        swallow(
            self.live
                .clear_price_lines(&self.key, &self.state.symbol)
                .await,
        );
        swallow(
            self.live
                .push_state(&self.key, &self.state.symbol, false)
                .await,
        );
    }

    // =====================================================
    // 热加载
    // =====================================================

    async fn refresh_settings(&mut self, now: DateTime<Utc>) {
        match self.watcher.poll(now).await {
            ReloadOutcome::NotDue | ReloadOutcome::Unchanged | ReloadOutcome::Failed => {}
            ReloadOutcome::Changed(fresh) => {
                let symbol_changed = fresh.symbol != self.state.symbol;

                // 持仓与旧标的绑定，换标的推迟到平仓后的下一次重载
                if symbol_changed && self.state.position.is_some() {
                    warn!(
                        "symbol change deferred while position open key={} old={} new={}",
                        self.key, self.state.symbol, fresh.symbol
                    );
                    return;
                }

                info!(
                    "settings updated key={} symbol={} window={} cooldown={}s",
                    self.key, fresh.symbol, fresh.window_size, fresh.cooldown_secs
                );

                if symbol_changed {
                    self.state.symbol = fresh.symbol.clone();
                    // 旧标的的窗口数据全部失效
                    self.state.window.clear();
                    self.throttle.reset();
                }
                self.state.exchange = fresh.exchange.clone();
                self.state.network = fresh.network;
                self.state.window.set_capacity(fresh.window_size);

                self.watcher.apply(fresh);
            }
        }
    }

    // =====================================================
    // 离场
    // =====================================================

    async fn check_exit(&mut self, price: Decimal, now: DateTime<Utc>) {
        let Some(position) = self.state.position.clone() else {
            return;
        };

        match self
            .gateway
            .execute_exit_if_hit(&self.key, &self.state.symbol, price, now, &position)
            .await
        {
            Ok(outcome) if outcome.executed => {
                self.state.exits += 1;
                self.state.position = None;
                self.state.last_trade_closed_at = Some(now);

                let reason = if outcome.tp_hit { "tp" } else { "sl" };
                info!(
                    "exit filled key={} symbol={} price={} qty={} reason={}",
                    self.key, self.state.symbol, price, position.qty, reason
                );

                swallow(
                    self.live
                        .push_signal(
                            &self.key,
                            &self.state.symbol,
                            &Signal::sell(reason, now),
                        )
                        .await,
                );
                swallow(self.live.clear_tp_sl(&self.key, &self.state.symbol).await);
                swallow(
                    self.live
                        .clear_price_lines(&self.key, &self.state.symbol)
                        .await,
                );
            }
            // 未触及或业务拒绝：持仓原样保留，下一个 tick 继续检查
            Ok(_) => {}
            // 离场条件绝不静默丢弃：故障只记日志，下一个 tick 自然重试
            Err(e) => {
                error!("exit check failed key={} err={}", self.key, e);
            }
        }
    }

    // =====================================================
    // 进场
    // =====================================================

    async fn check_entry(&mut self, price: Decimal, now: DateTime<Utc>) {
        self.state.window.push(price);

        if !self.state.window.is_full() {
            self.state.warmups += 1;
            debug!(
                "warming up key={} {}/{}",
                self.key,
                self.state.window.len(),
                self.state.window.capacity()
            );
            self.hold_throttled("warming_up", now).await;
            return;
        }

        let snapshot = self.watcher.snapshot().clone();
        let prices = self.state.window.to_vec();

        let mut decision = (self.decision)(&prices, &snapshot);
        // 冷却期内无条件覆盖决策函数的进场意图
        if matches!(decision, Decision::Enter { .. }) && self.in_cooldown(&snapshot, now) {
            decision = Decision::no_signal("cooldown");
        }

        match decision {
            Decision::NoSignal { reason } => {
                self.hold_throttled(&reason, now).await;
            }
            Decision::Enter { score } => {
                match self
                    .gateway
                    .execute_entry(&self.key, &self.state.symbol, price, score, now, &snapshot)
                    .await
                {
                    Ok(outcome) if outcome.executed => {
                        self.state.entries += 1;
                        self.state.position = Some(Position {
                            // 现货模式只做多
                            is_long: true,
                            entry_price: outcome.entry_price,
                            qty: outcome.qty,
                            tp: outcome.tp,
                            sl: outcome.sl,
                            order_ref: outcome.order_ref.clone(),
                            opened_at: now,
                        });

                        info!(
                            "entry filled key={} symbol={} price={} qty={} tp={} sl={} score={}",
                            self.key,
                            self.state.symbol,
                            outcome.entry_price,
                            outcome.qty,
                            outcome.tp,
                            outcome.sl,
                            score
                        );

                        swallow(
                            self.live
                                .push_signal(
                                    &self.key,
                                    &self.state.symbol,
                                    &Signal::buy(score, "entry", now),
                                )
                                .await,
                        );

                        // 清空窗口，防止同一条件在下个 tick 立即重复触发
                        self.state.window.clear();
                        self.throttle.reset();
                    }
                    Ok(outcome) => {
                        // 业务拒绝转为 HOLD，不自动重试
                        self.hold_throttled(&outcome.reason, now).await;
                    }
                    Err(e) => {
                        // 故障视为单 tick no-op，状态不变，条件复现时自然重试
                        error!("entry failed key={} err={}", self.key, e);
                        self.hold_throttled("entry_failed", now).await;
                    }
                }
            }
        }
    }

    fn in_cooldown(&self, snapshot: &SettingsSnapshot, now: DateTime<Utc>) -> bool {
        if snapshot.cooldown_secs == 0 {
            return false;
        }
        let Some(closed_at) = self.state.last_trade_closed_at else {
            return false;
        };
        now - closed_at < Duration::seconds(i64::from(snapshot.cooldown_secs))
    }

    async fn hold_throttled(&mut self, reason: &str, now: DateTime<Utc>) {
        if self.throttle.should_emit(reason, now) {
            swallow(
                self.live
                    .push_signal(&self.key, &self.state.symbol, &Signal::hold(reason, now))
                    .await,
            );
        }
    }
}

/// 推送通道 fire-and-forget：失败只留调试日志，绝不影响交易路径。
fn swallow(result: Result<(), LiveError>) {
    if let Err(e) = result {
        debug!("live push dropped: {}", e);
    }
}
