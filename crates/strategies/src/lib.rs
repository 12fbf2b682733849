//! 具体策略的决策函数库。
//! 每个策略只是一个纯函数 `(窗口, 快照) -> Decision`，
//! 生命周期、并发与执行全部由通用运行时承担。

pub mod mean_reversion;
pub mod momentum;
pub mod scalping;
pub mod window_scalping;

use kagi_core::strategy::entity::StrategyKind;
use kagi_core::strategy::port::DecisionFn;
use std::sync::Arc;

/// # Summary
/// 按策略种类取对应的决策函数。
pub fn decision_for(kind: StrategyKind) -> DecisionFn {
    match kind {
        StrategyKind::Scalping => Arc::new(scalping::decide),
        StrategyKind::WindowScalping => Arc::new(window_scalping::decide),
        StrategyKind::MeanReversion => Arc::new(mean_reversion::decide),
        StrategyKind::Momentum => Arc::new(momentum::decide),
    }
}

pub(crate) mod math {
    use rust_decimal::Decimal;

    /// 把评分收敛到 [0, 100]。
    pub fn clamp_score(score: Decimal) -> Decimal {
        score.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    }

    /// 百分比变化 `(to - from) / from * 100`，分母非正时返回 None。
    pub fn change_pct(from: Decimal, to: Decimal) -> Option<Decimal> {
        if from <= Decimal::ZERO {
            return None;
        }
        (to - from)
            .checked_div(from)
            .map(|r| r * Decimal::ONE_HUNDRED)
    }
}
