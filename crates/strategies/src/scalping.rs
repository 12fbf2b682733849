use crate::math::{change_pct, clamp_score};
use kagi_core::settings::entity::SettingsSnapshot;
use kagi_core::strategy::entity::Decision;
use rust_decimal::Decimal;

/// # Summary
/// 动量剥头皮：窗口首尾价差超过阈值即追涨进场。
///
/// # Logic
/// 1. 首尾价差百分比 `(last - first) / first`。
/// 2. 阈值未配置或非正时永不进场。
/// 3. 现货只做多：只有上行突破触发进场，评分即涨幅。
///
/// # 参数
/// * `price_change_threshold_pct` - 触发进场的最小涨幅（百分比）。
pub fn decide(prices: &[Decimal], settings: &SettingsSnapshot) -> Decision {
    let (Some(first), Some(last)) = (prices.first().copied(), prices.last().copied()) else {
        return Decision::no_signal("window_empty");
    };

    let Some(diff_pct) = change_pct(first, last) else {
        return Decision::no_signal("window_invalid");
    };

    let threshold_pct = settings
        .param("price_change_threshold_pct")
        .unwrap_or(Decimal::ZERO);
    if threshold_pct <= Decimal::ZERO {
        return Decision::no_signal("threshold_unset");
    }

    if diff_pct >= threshold_pct {
        Decision::enter(clamp_score(diff_pct))
    } else {
        Decision::no_signal("below_threshold")
    }
}
