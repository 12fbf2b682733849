use crate::math::clamp_score;
use kagi_core::settings::entity::SettingsSnapshot;
use kagi_core::strategy::entity::Decision;
use rust_decimal::Decimal;

/// # Summary
/// 持续动量：窗口内上涨步数占比足够高时顺势进场。
///
/// # Logic
/// 1. 统计相邻价对中上涨的步数。
/// 2. 上涨占比 `rising / (len - 1)` 达到 `min_rising_pct` 才进场。
/// 3. 评分即上涨占比（0..100）。
///
/// # 参数
/// * `min_rising_pct` - 触发进场的最小上涨步数占比（百分比）。
pub fn decide(prices: &[Decimal], settings: &SettingsSnapshot) -> Decision {
    if prices.len() < 2 {
        return Decision::no_signal("window_empty");
    }

    let steps = prices.len() - 1;
    let rising = prices.windows(2).filter(|w| w[1] > w[0]).count();

    let Some(rising_pct) = Decimal::from(rising)
        .checked_div(Decimal::from(steps))
        .map(|r| r * Decimal::ONE_HUNDRED)
    else {
        return Decision::no_signal("window_empty");
    };

    let min_rising_pct = settings.param("min_rising_pct").unwrap_or(Decimal::ZERO);
    if min_rising_pct <= Decimal::ZERO {
        return Decision::no_signal("threshold_unset");
    }

    if rising_pct >= min_rising_pct {
        Decision::enter(clamp_score(rising_pct))
    } else {
        Decision::no_signal("momentum_weak")
    }
}
