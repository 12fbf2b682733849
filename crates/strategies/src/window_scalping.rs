use crate::math::{change_pct, clamp_score};
use kagi_core::settings::entity::SettingsSnapshot;
use kagi_core::strategy::entity::Decision;
use rust_decimal::Decimal;

/// # Summary
/// 窗口低位抄底：在窗口价格区间的下沿买入。
///
/// # Logic
/// 1. 求窗口内最高价与最低价，区间退化（低价非正或宽度为零）直接观望。
/// 2. 区间幅度 `(high - low) / low` 不足 `min_range_pct` 时观望，
///    过窄的区间里任何位置都没有意义。
/// 3. 当前价在区间中的相对位置 `pos = (price - low) / range`，
///    落在 `entry_from_low_pct` 定义的下沿区内才进场。
/// 4. 评分随位置贴近下沿线性升高，最低点得满分。
///
/// # 参数
/// * `min_range_pct` - 区间最小幅度（百分比），缺省 0。
/// * `entry_from_low_pct` - 下沿区占区间的百分比，缺省 0（永不进场）。
pub fn decide(prices: &[Decimal], settings: &SettingsSnapshot) -> Decision {
    let Some(price) = prices.last().copied() else {
        return Decision::no_signal("window_empty");
    };
    let Some(high) = prices.iter().max().copied() else {
        return Decision::no_signal("window_empty");
    };
    let Some(low) = prices.iter().min().copied() else {
        return Decision::no_signal("window_empty");
    };

    if low <= Decimal::ZERO {
        return Decision::no_signal("window_invalid");
    }
    let range = high - low;
    if range <= Decimal::ZERO {
        return Decision::no_signal("range_zero");
    }

    let min_range_pct = settings.param("min_range_pct").unwrap_or(Decimal::ZERO);
    let range_pct = change_pct(low, high).unwrap_or(Decimal::ZERO);
    if range_pct < min_range_pct {
        return Decision::no_signal("range_too_small");
    }

    // 区间内相对位置，0 = 最低点，1 = 最高点
    let Some(pos) = (price - low).checked_div(range) else {
        return Decision::no_signal("range_zero");
    };

    let entry_from_low_pct = settings
        .param("entry_from_low_pct")
        .unwrap_or(Decimal::ZERO);
    let low_zone = (entry_from_low_pct / Decimal::ONE_HUNDRED).clamp(Decimal::ZERO, Decimal::ONE);

    if low_zone <= Decimal::ZERO || pos > low_zone {
        return Decision::no_signal("above_entry_zone");
    }

    let score = match pos.checked_div(low_zone) {
        Some(ratio) => clamp_score((Decimal::ONE - ratio) * Decimal::ONE_HUNDRED),
        None => Decimal::ONE_HUNDRED,
    };
    Decision::enter(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kagi_core::test_utils::test_snapshot;
    use rust_decimal_macros::dec;

    fn settings(min_range_pct: Decimal, entry_from_low_pct: Decimal) -> SettingsSnapshot {
        let mut s = test_snapshot("BTCUSDT", 4);
        s.params.insert("min_range_pct".to_string(), min_range_pct);
        s.params
            .insert("entry_from_low_pct".to_string(), entry_from_low_pct);
        s
    }

    #[test]
    fn test_enters_at_window_low_with_full_score() {
        let s = settings(dec!(1), dec!(20));
        // low=100 high=110，当前价正好在最低点
        let d = decide(&[dec!(110), dec!(105), dec!(103), dec!(100)], &s);
        assert_eq!(d, Decision::enter(dec!(100)));
    }

    #[test]
    fn test_score_decays_toward_zone_edge() {
        let s = settings(dec!(1), dec!(50));
        // range=[100,110] pos=0.25 lowZone=0.5 → score=(1-0.5)*100
        let d = decide(&[dec!(110), dec!(100), dec!(102.5)], &s);
        assert_eq!(d, Decision::enter(dec!(50.0)));
    }

    #[test]
    fn test_holds_above_entry_zone() {
        let s = settings(dec!(1), dec!(20));
        let d = decide(&[dec!(100), dec!(110), dec!(108)], &s);
        assert_eq!(d, Decision::no_signal("above_entry_zone"));
    }

    #[test]
    fn test_holds_when_range_too_small() {
        let s = settings(dec!(5), dec!(20));
        // 区间幅度 1% < 5%
        let d = decide(&[dec!(100), dec!(101), dec!(100)], &s);
        assert_eq!(d, Decision::no_signal("range_too_small"));
    }

    #[test]
    fn test_holds_on_degenerate_window() {
        let s = settings(dec!(0), dec!(20));
        assert_eq!(
            decide(&[dec!(100), dec!(100)], &s),
            Decision::no_signal("range_zero")
        );
        assert_eq!(decide(&[], &s), Decision::no_signal("window_empty"));
    }

    #[test]
    fn test_zero_zone_never_enters() {
        let s = settings(dec!(0), dec!(0));
        let d = decide(&[dec!(110), dec!(100)], &s);
        assert_eq!(d, Decision::no_signal("above_entry_zone"));
    }
}
