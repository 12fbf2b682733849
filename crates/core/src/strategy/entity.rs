use crate::common::AccountId;
use crate::trade::entity::OrderId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 策略种类枚举。原型系统中每个种类是一个独立的生命周期模块，
/// 本系统中它们只是同一个运行时上不同的决策函数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Scalping,
    WindowScalping,
    MeanReversion,
    Momentum,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Scalping => write!(f, "scalping"),
            StrategyKind::WindowScalping => write!(f, "window_scalping"),
            StrategyKind::MeanReversion => write!(f, "mean_reversion"),
            StrategyKind::Momentum => write!(f, "momentum"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scalping" => Ok(StrategyKind::Scalping),
            "window_scalping" => Ok(StrategyKind::WindowScalping),
            "mean_reversion" => Ok(StrategyKind::MeanReversion),
            "momentum" => Ok(StrategyKind::Momentum),
            _ => Err(format!("Unknown StrategyKind: {}", s)),
        }
    }
}

/// # Summary
/// 正在运行的策略实例的唯一身份：(账户, 策略种类)。
///
/// # Invariants
/// - 同一个 RuntimeKey 在任意时刻至多对应一个活跃的运行时任务。
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RuntimeKey {
    pub account: AccountId,
    pub kind: StrategyKind,
}

impl RuntimeKey {
    pub fn new(account: AccountId, kind: StrategyKind) -> Self {
        Self { account, kind }
    }
}

impl std::fmt::Display for RuntimeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.account, self.kind)
    }
}

/// # Summary
/// 决策函数的输出：要么给出带评分的进场意图，要么给出带原因的观望。
///
/// # Invariants
/// - `Enter` 只表达意图，是否成交由交易执行网关裁决。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    NoSignal { reason: String },
    Enter { score: Decimal },
}

impl Decision {
    pub fn no_signal(reason: impl Into<String>) -> Self {
        Decision::NoSignal {
            reason: reason.into(),
        }
    }

    pub fn enter(score: Decimal) -> Self {
        Decision::Enter { score }
    }
}

/// # Summary
/// 信号的业务分类。
///
/// # Invariants
/// - 区分交易动作与纯信息通知。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    // 进场买入
    Buy,
    // 离场卖出
    Sell,
    // 观望（纯信息）
    Hold,
}

/// # Summary
/// 运行时对外发布的领域信号。
/// Buy/Sell 代表真实的仓位变动，Hold 仅用于 UI 状态展示。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    // 产生信号的业务原因 (e.g. "warming_up", "cooldown", "tp_sl_exit")
    pub reason: String,
    // 决策评分，仅进场信号携带；离场由 TP/SL 触达裁决，没有评分
    pub score: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn hold(reason: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: SignalKind::Hold,
            reason: reason.into(),
            score: None,
            timestamp,
        }
    }

    pub fn buy(score: Decimal, reason: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: SignalKind::Buy,
            reason: reason.into(),
            score: Some(score),
            timestamp,
        }
    }

    pub fn sell(reason: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: SignalKind::Sell,
            reason: reason.into(),
            score: None,
            timestamp,
        }
    }
}


/// # Summary
/// 一笔已确认的持仓。由执行网关的成交回报创建，在离场成交后销毁。
///
/// # Invariants
/// - 每个运行时状态中至多存在一笔未平仓的 Position。
/// - `tp` / `sl` 为进场时一次性确定的绝对价位。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    // 多空方向（现货模式下恒为 true）
    pub is_long: bool,
    pub entry_price: Decimal,
    pub qty: Decimal,
    pub tp: Decimal,
    pub sl: Decimal,
    // 执行网关返回的订单引用
    pub order_ref: Option<OrderId>,
    pub opened_at: DateTime<Utc>,
}

/// # Summary
/// 运行时状态机的可观测阶段，由窗口填充度与持仓情况推导。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimePhase {
    // 窗口未满，只积累数据
    WarmingUp,
    // 窗口已满且空仓，等待进场条件
    Flat,
    // 持仓中，只做离场检查
    InPosition,
}
