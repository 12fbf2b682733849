use crate::common::{NetworkType, TimeFrame};
use crate::settings::error::SettingsError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// # Summary
/// 策略配置的不可变快照。每次重载整体替换，运行时从不就地修改。
///
/// # Invariants
/// - `params` 使用 BTreeMap，保证指纹编码时的键序稳定。
/// - 字段的规范化与校验只发生在配置源边界（SettingsWatcher 装载处），
///   而不是实体的生命周期钩子内。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    // 目标证券代码
    pub symbol: String,
    // 交易所名称
    pub exchange: String,
    // 网络类型
    pub network: NetworkType,
    // 行情时间周期
    pub timeframe: TimeFrame,
    // 价格窗口容量
    pub window_size: usize,
    // 平仓后的进场冷却时间（秒，0 表示无冷却）
    pub cooldown_secs: u32,
    // 止盈百分比 (0, 100)
    pub take_profit_pct: Decimal,
    // 止损百分比 (0, 100)
    pub stop_loss_pct: Decimal,
    // 单笔固定投入的计价货币金额
    pub capital_quote: Option<Decimal>,
    // 单笔风险占可用余额的百分比
    pub risk_per_trade_pct: Option<Decimal>,
    // 单笔敞口上限（计价货币）
    pub max_exposure_quote: Option<Decimal>,
    // 策略专属参数，键名由各决策函数约定
    pub params: BTreeMap<String, Decimal>,
}

impl SettingsSnapshot {
    /// # Summary
    /// 读取策略专属参数。
    pub fn param(&self, name: &str) -> Option<Decimal> {
        self.params.get(name).copied()
    }

    /// # Summary
    /// 边界规范化：清理外部存储可能带入的格式噪音。
    ///
    /// # Logic
    /// 1. symbol 去空白并统一大写。
    /// 2. exchange 去空白。
    pub fn normalize(&mut self) {
        self.symbol = self.symbol.trim().to_uppercase();
        self.exchange = self.exchange.trim().to_string();
    }

    /// # Summary
    /// 校验快照是否具备可运行的最小条件。
    ///
    /// # Returns
    /// * 不满足时返回 `SettingsError::Invalid`，由调用方决定是致命
    ///   （启动期）还是降级沿用旧快照（热加载期）。
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.symbol.is_empty() {
            return Err(SettingsError::Invalid("symbol is empty".to_string()));
        }
        if self.window_size < 2 {
            return Err(SettingsError::Invalid(format!(
                "window_size must be >= 2, got {}",
                self.window_size
            )));
        }
        let hundred = Decimal::ONE_HUNDRED;
        if self.take_profit_pct <= Decimal::ZERO || self.take_profit_pct >= hundred {
            return Err(SettingsError::Invalid(format!(
                "take_profit_pct out of (0, 100): {}",
                self.take_profit_pct
            )));
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= hundred {
            return Err(SettingsError::Invalid(format!(
                "stop_loss_pct out of (0, 100): {}",
                self.stop_loss_pct
            )));
        }
        Ok(())
    }

    /// # Summary
    /// 对所有影响行为的字段做确定性编码，用于廉价地判断
    /// “配置是否发生了有意义的变化”，避免逐字段深比较。
    ///
    /// # Logic
    /// 1. 按固定顺序用 `|` 拼接核心字段。
    /// 2. `params` 依 BTreeMap 键序追加 `k=v` 对。
    ///
    /// # Returns
    /// 稳定的指纹字符串，相同行为的快照必然产生相同指纹。
    pub fn fingerprint(&self) -> String {
        let mut fp = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.symbol,
            self.exchange,
            self.network,
            self.timeframe,
            self.window_size,
            self.cooldown_secs,
            self.take_profit_pct,
            self.stop_loss_pct,
            opt(self.capital_quote),
            opt(self.risk_per_trade_pct),
            opt(self.max_exposure_quote),
        );
        for (k, v) in &self.params {
            fp.push('|');
            fp.push_str(k);
            fp.push('=');
            fp.push_str(&v.to_string());
        }
        fp
    }
}

fn opt(v: Option<Decimal>) -> String {
    match v {
        Some(d) => d.to_string(),
        None => "null".to_string(),
    }
}
