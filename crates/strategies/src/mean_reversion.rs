use crate::math::clamp_score;
use kagi_core::settings::entity::SettingsSnapshot;
use kagi_core::strategy::entity::Decision;
use rust_decimal::Decimal;

/// # Summary
/// 均值回归：价格显著跌破窗口均值时买入，赌其回归。
///
/// # Logic
/// 1. 求窗口算术均值（SMA）。
/// 2. 当前价低于均值的偏离百分比 `(sma - price) / sma`。
/// 3. 偏离达到 `deviation_pct` 才进场，评分即偏离幅度。
///
/// # 参数
/// * `deviation_pct` - 触发进场的最小向下偏离（百分比）。
pub fn decide(prices: &[Decimal], settings: &SettingsSnapshot) -> Decision {
    let Some(price) = prices.last().copied() else {
        return Decision::no_signal("window_empty");
    };

    let sum: Decimal = prices.iter().copied().sum();
    let Some(sma) = sum.checked_div(Decimal::from(prices.len())) else {
        return Decision::no_signal("window_empty");
    };
    if sma <= Decimal::ZERO {
        return Decision::no_signal("window_invalid");
    }

    let Some(below_pct) = (sma - price)
        .checked_div(sma)
        .map(|r| r * Decimal::ONE_HUNDRED)
    else {
        return Decision::no_signal("window_invalid");
    };

    let deviation_pct = settings.param("deviation_pct").unwrap_or(Decimal::ZERO);
    if deviation_pct <= Decimal::ZERO {
        return Decision::no_signal("threshold_unset");
    }

    if below_pct >= deviation_pct {
        Decision::enter(clamp_score(below_pct))
    } else {
        Decision::no_signal("near_mean")
    }
}
