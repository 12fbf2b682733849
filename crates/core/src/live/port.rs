use crate::live::error::LiveError;
use crate::strategy::entity::{RuntimeKey, Signal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// # Summary
/// 实时遥测推送端口（图表状态、信号、价格线）。
/// fire-and-forget 语义：任何失败都不允许阻塞或中断交易路径。
///
/// # Invariants
/// - 实现类必须保证线程安全 (`Send` + `Sync`)。
/// - 调用方吞掉所有错误，实现无需自行重试。
#[async_trait]
pub trait LivePublisher: Send + Sync {
    /// 推送运行时激活/停用状态
    async fn push_state(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        active: bool,
    ) -> Result<(), LiveError>;

    /// 推送交易/观望信号
    async fn push_signal(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        signal: &Signal,
    ) -> Result<(), LiveError>;

    /// 推送单个价格点（供图表实时绘制）
    async fn push_price_tick(
        &self,
        key: &RuntimeKey,
        symbol: &str,
        price: Decimal,
        time: DateTime<Utc>,
    ) -> Result<(), LiveError>;

    /// 清除图表上的 TP/SL 线
    async fn clear_tp_sl(&self, key: &RuntimeKey, symbol: &str) -> Result<(), LiveError>;

    /// 清除图表上的全部价格标线
    async fn clear_price_lines(&self, key: &RuntimeKey, symbol: &str) -> Result<(), LiveError>;
}
