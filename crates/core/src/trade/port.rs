use crate::settings::entity::SettingsSnapshot;
use crate::strategy::entity::{Position, RuntimeKey};
use crate::trade::entity::{EntryOutcome, ExitOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// # Summary
/// 交易执行环节中可能发生的意外错误。
/// 业务层面的拒绝（余额不足、风控拦截）不属于错误，
/// 以 `EntryOutcome::rejected` / `ExitOutcome::rejected` 表达。
#[derive(Error, Debug)]
pub enum TradeError {
    #[error("Broker channel error: {0}")]
    BrokerIntegration(String),
    #[error("Internal trade error: {0}")]
    Internal(String),
}

/// # Summary
/// 交易执行网关端口。运行时产生进出场意图后经此端口落地为真实订单，
/// 它是策略状态机向订单子系统发送请求的唯一门户。
///
/// # Invariants
/// - 实现类必须保证线程安全 (`Send` + `Sync`)。
/// - 每个符合条件的 tick 都可能调用一次，重复成交保护由实现负责，
///   运行时不做去重。
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// # Summary
    /// 尝试按市价进场。TP/SL 由实现依据快照中的百分比计算并随回报返回。
    ///
    /// # Arguments
    /// * `key` - 发起意图的运行时身份。
    /// * `symbol` - 交易标的。
    /// * `price` - 触发进场的最新价。
    /// * `score` - 决策函数给出的信号评分。
    /// * `time` - 触发 tick 的时间戳。
    /// * `settings` - 当前配置快照（仓位 sizing 与 TP/SL 百分比来源）。
    ///
    /// # Returns
    /// * `Ok(EntryOutcome)` - 成交或业务拒绝。
    /// * `Err(TradeError)` - 通道故障，调用方按单 tick no-op 处理。
    async fn execute_entry(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        price: Decimal,
        score: Decimal,
        time: DateTime<Utc>,
        settings: &SettingsSnapshot,
    ) -> Result<EntryOutcome, TradeError>;

    /// # Summary
    /// 检查当前价是否触及持仓的 TP/SL，若触及则按市价离场。
    ///
    /// # Arguments
    /// * `position` - 当前持仓（方向、数量与 TP/SL 价位均来自进场回报）。
    ///
    /// # Returns
    /// * `Ok(ExitOutcome)` - 已离场 / 未触及 / 业务拒绝。
    /// * `Err(TradeError)` - 通道故障，下一个 tick 自然重试。
    async fn execute_exit_if_hit(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        price: Decimal,
        time: DateTime<Utc>,
        position: &Position,
    ) -> Result<ExitOutcome, TradeError>;
}
