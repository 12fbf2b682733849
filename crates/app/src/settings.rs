use async_trait::async_trait;
use config::Config;
use kagi_core::common::{NetworkType, TimeFrame};
use kagi_core::settings::entity::SettingsSnapshot;
use kagi_core::settings::error::SettingsError;
use kagi_core::settings::port::SettingsSource;
use kagi_core::strategy::entity::RuntimeKey;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// 配置文件中每个 (账户, 策略种类) 小节的原始形态。
#[derive(Debug, Deserialize)]
struct RawStrategySettings {
    symbol: String,
    #[serde(default = "default_exchange")]
    exchange: String,
    #[serde(default = "default_network")]
    network: String,
    #[serde(default = "default_timeframe")]
    timeframe: String,
    window_size: usize,
    #[serde(default)]
    cooldown_secs: u32,
    take_profit_pct: Decimal,
    stop_loss_pct: Decimal,
    #[serde(default)]
    capital_quote: Option<Decimal>,
    #[serde(default)]
    risk_per_trade_pct: Option<Decimal>,
    #[serde(default)]
    max_exposure_quote: Option<Decimal>,
    #[serde(default)]
    params: BTreeMap<String, Decimal>,
}

fn default_exchange() -> String {
    "BINANCE".to_string()
}

fn default_network() -> String {
    "testnet".to_string()
}

fn default_timeframe() -> String {
    "1m".to_string()
}

/// # Summary
/// 基于配置文件的外部配置源。
/// 每次 `load_settings` 都重新读文件，配合运行时的热加载轮询，
/// 改文件即可在不重启的情况下调参。
///
/// # Invariants
/// - 小节路径为 `strategies.<account>.<kind>`。
/// - 文件缺失或小节缺失都映射为领域错误，不在这里兜底默认值。
pub struct FileSettingsSource {
    path: String,
}

impl FileSettingsSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsSource for FileSettingsSource {
    async fn load_settings(&self, key: &RuntimeKey) -> Result<SettingsSnapshot, SettingsError> {
        let cfg = Config::builder()
            .add_source(config::File::with_name(&self.path))
            .build()
            .map_err(|e| SettingsError::Store(e.to_string()))?;

        let section = format!("strategies.{}.{}", key.account, key.kind);
        let raw: RawStrategySettings = cfg.get(&section).map_err(|e| match e {
            config::ConfigError::NotFound(_) => SettingsError::NotFound(key.to_string()),
            other => SettingsError::Store(other.to_string()),
        })?;

        let network = NetworkType::from_str(&raw.network).map_err(SettingsError::Invalid)?;
        let timeframe = TimeFrame::from_str(&raw.timeframe).map_err(SettingsError::Invalid)?;

        Ok(SettingsSnapshot {
            symbol: raw.symbol,
            exchange: raw.exchange,
            network,
            timeframe,
            window_size: raw.window_size,
            cooldown_secs: raw.cooldown_secs,
            take_profit_pct: raw.take_profit_pct,
            stop_loss_pct: raw.stop_loss_pct,
            capital_quote: raw.capital_quote,
            risk_per_trade_pct: raw.risk_per_trade_pct,
            max_exposure_quote: raw.max_exposure_quote,
            params: raw.params,
        })
    }
}
