use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 订单的系统内唯一标识。
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// # Summary
/// 进场请求的裁决结果。
/// `executed == false` 表示业务规则拒绝（资金、风控等），原因在 `reason`；
/// 网关层的意外故障不走这里，而是以 `TradeError` 返回。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub executed: bool,
    pub reason: String,
    pub entry_price: Decimal,
    pub qty: Decimal,
    pub tp: Decimal,
    pub sl: Decimal,
    pub order_ref: Option<OrderId>,
}

impl EntryOutcome {
    /// # Logic
    /// 构造一笔成交回报：运行时据此建立 Position。
    pub fn filled(
        entry_price: Decimal,
        qty: Decimal,
        tp: Decimal,
        sl: Decimal,
        order_ref: OrderId,
    ) -> Self {
        Self {
            executed: true,
            reason: "executed".to_string(),
            entry_price,
            qty,
            tp,
            sl,
            order_ref: Some(order_ref),
        }
    }

    /// # Logic
    /// 构造一次业务拒绝：运行时转化为 HOLD，不自动重试。
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            executed: false,
            reason: reason.into(),
            entry_price: Decimal::ZERO,
            qty: Decimal::ZERO,
            tp: Decimal::ZERO,
            sl: Decimal::ZERO,
            order_ref: None,
        }
    }
}

/// # Summary
/// 离场检查的裁决结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitOutcome {
    pub executed: bool,
    pub tp_hit: bool,
    pub sl_hit: bool,
    pub exit_price: Decimal,
    pub reason: String,
}

impl ExitOutcome {
    pub fn filled(tp_hit: bool, sl_hit: bool, exit_price: Decimal) -> Self {
        Self {
            executed: true,
            tp_hit,
            sl_hit,
            exit_price,
            reason: "executed".to_string(),
        }
    }

    /// 价格尚未触及 TP/SL，属于正常路径而非错误。
    pub fn not_hit() -> Self {
        Self {
            executed: false,
            tp_hit: false,
            sl_hit: false,
            exit_price: Decimal::ZERO,
            reason: "not_hit".to_string(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            executed: false,
            tp_hit: false,
            sl_hit: false,
            exit_price: Decimal::ZERO,
            reason: reason.into(),
        }
    }
}
