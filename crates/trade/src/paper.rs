use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kagi_core::common::AccountId;
use kagi_core::settings::entity::SettingsSnapshot;
use kagi_core::strategy::entity::{Position, RuntimeKey};
use kagi_core::trade::entity::{EntryOutcome, ExitOutcome, OrderId};
use kagi_core::trade::port::{ExecutionGateway, TradeError};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;
use uuid::Uuid;

const QTY_SCALE: u32 = 8;
const PRICE_SCALE: u32 = 8;

/// # Summary
/// 纸面交易网关：账户余额与成交全部在内存中模拟，
/// 不连任何真实交易所，用于回测联调与演示运行。
///
/// # Logic
/// 1. 进场做完整的业务裁决（现货只做多、仓位 sizing、余额检查），
///    拒绝以 `EntryOutcome::rejected` 返回，从不抛错。
/// 2. TP/SL 绝对价位由快照中的百分比一次性算出，随成交回报返回。
/// 3. 成交即时借贷账户余额，DashMap 的分段锁保证单账户原子更新。
///
/// # Invariants
/// - 同一账户的余额变更通过 entry 锁串行化。
/// - 对同一 tick 重复调用是安全的：余额不足时自然拒绝。
pub struct PaperGateway {
    // 各账户的可用余额（计价货币）
    balances: DashMap<AccountId, Decimal>,
}

impl Default for PaperGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperGateway {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    /// 注入初始资金。
    pub fn deposit(&self, account: AccountId, amount: Decimal) {
        let mut balance = self.balances.entry(account).or_insert(Decimal::ZERO);
        *balance += amount;
    }

    pub fn balance(&self, account: &AccountId) -> Decimal {
        self.balances
            .get(account)
            .map(|b| *b)
            .unwrap_or(Decimal::ZERO)
    }

    /// # Summary
    /// 决定这笔进场投入多少计价货币。
    ///
    /// # Logic
    /// 1. 配了固定投入 `capital_quote` 就用它。
    /// 2. 否则按 `risk_per_trade_pct` 取可用余额的百分比。
    /// 3. 两种路径都受 `max_exposure_quote` 上限约束。
    fn resolve_quote_amount(&self, account: &AccountId, settings: &SettingsSnapshot) -> Decimal {
        let amount = match settings.capital_quote {
            Some(capital) if capital > Decimal::ZERO => capital,
            _ => match settings.risk_per_trade_pct {
                Some(risk) if risk > Decimal::ZERO => {
                    let balance = self.balance(account);
                    (balance * risk)
                        .checked_div(Decimal::ONE_HUNDRED)
                        .unwrap_or(Decimal::ZERO)
                }
                _ => Decimal::ZERO,
            },
        };
        match settings.max_exposure_quote {
            Some(cap) if cap > Decimal::ZERO => amount.min(cap),
            _ => amount,
        }
    }
}

fn pct_factor(pct: Decimal) -> Decimal {
    pct.checked_div(Decimal::ONE_HUNDRED).unwrap_or(Decimal::ZERO)
}

#[async_trait]
impl ExecutionGateway for PaperGateway {
    async fn execute_entry(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        price: Decimal,
        score: Decimal,
        _time: DateTime<Utc>,
        settings: &SettingsSnapshot,
    ) -> Result<EntryOutcome, TradeError> {
        if symbol.trim().is_empty() {
            return Ok(EntryOutcome::rejected("symbol_empty"));
        }
        if price <= Decimal::ZERO {
            return Ok(EntryOutcome::rejected("price_invalid"));
        }
        // 现货只做多，非正评分的信号不进场
        if score <= Decimal::ZERO {
            return Ok(EntryOutcome::rejected("spot_long_only"));
        }

        let quote_amount = self.resolve_quote_amount(&key.account, settings);
        if quote_amount <= Decimal::ZERO {
            return Ok(EntryOutcome::rejected("no_sizing_configured"));
        }

        let qty = quote_amount
            .checked_div(price)
            .unwrap_or(Decimal::ZERO)
            .round_dp_with_strategy(QTY_SCALE, RoundingStrategy::ToZero);
        if qty <= Decimal::ZERO {
            return Ok(EntryOutcome::rejected("qty_zero"));
        }

        let tp = (price * (Decimal::ONE + pct_factor(settings.take_profit_pct)))
            .round_dp(PRICE_SCALE);
        let sl = (price * (Decimal::ONE - pct_factor(settings.stop_loss_pct)))
            .round_dp(PRICE_SCALE);
        if tp <= price {
            return Ok(EntryOutcome::rejected("tp_not_above_entry"));
        }
        if sl >= price || sl <= Decimal::ZERO {
            return Ok(EntryOutcome::rejected("sl_not_below_entry"));
        }

        let cost = qty * price;
        {
            let mut balance = self
                .balances
                .entry(key.account.clone())
                .or_insert(Decimal::ZERO);
            if *balance < cost {
                return Ok(EntryOutcome::rejected("insufficient_balance"));
            }
            *balance -= cost;
        }

        let order_ref = OrderId(Uuid::new_v4().to_string());
        info!(
            "paper entry key={} symbol={} qty={} price={} quote={} tp={} sl={} score={}",
            key, symbol, qty, price, cost, tp, sl, score
        );

        Ok(EntryOutcome::filled(price, qty, tp, sl, order_ref))
    }

    async fn execute_exit_if_hit(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        price: Decimal,
        _time: DateTime<Utc>,
        position: &Position,
    ) -> Result<ExitOutcome, TradeError> {
        if price <= Decimal::ZERO {
            return Ok(ExitOutcome::rejected("price_invalid"));
        }
        if position.qty <= Decimal::ZERO {
            return Ok(ExitOutcome::rejected("qty_invalid"));
        }
        // 现货仓位恒为多头
        if !position.is_long {
            return Ok(ExitOutcome::rejected("spot_long_only"));
        }

        let tp_hit = price >= position.tp;
        let sl_hit = price <= position.sl;
        if !tp_hit && !sl_hit {
            return Ok(ExitOutcome::not_hit());
        }

        let proceeds = (position.qty * price).round_dp(PRICE_SCALE);
        {
            let mut balance = self
                .balances
                .entry(key.account.clone())
                .or_insert(Decimal::ZERO);
            *balance += proceeds;
        }

        info!(
            "paper exit key={} symbol={} qty={} price={} proceeds={} tp_hit={} sl_hit={}",
            key, symbol, position.qty, price, proceeds, tp_hit, sl_hit
        );

        Ok(ExitOutcome::filled(tp_hit, sl_hit, price))
    }
}
