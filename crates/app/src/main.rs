mod feed;
mod live;
mod settings;

use feed::FeedConfig;
use kagi_core::common::AccountId;
use kagi_core::config::RuntimeConfig;
use kagi_core::strategy::entity::{RuntimeKey, StrategyKind};
use kagi_scheduler::scheduler::StrategyScheduler;
use kagi_strategies::decision_for;
use kagi_trade::paper::PaperGateway;
use live::TracingLivePublisher;
use rust_decimal::Decimal;
use serde::Deserialize;
use settings::FileSettingsSource;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

/// 要启动的一个策略运行时。
#[derive(Debug, Deserialize)]
struct StrategyEntry {
    account: String,
    kind: String,
}

/// # Summary
/// 应用级配置，来自 `kagi.toml` 与 `KAGI_*` 环境变量。
#[derive(Debug, Deserialize)]
struct AppConfig {
    // 策略参数文件路径（不含扩展名，交给 config 自动探测）
    #[serde(default = "default_settings_file")]
    settings_file: String,
    // 每个账户注入的纸面初始资金
    #[serde(default = "default_initial_balance")]
    initial_balance: Decimal,
    #[serde(default)]
    runtime: RuntimeConfig,
    #[serde(default)]
    strategies: Vec<StrategyEntry>,
    #[serde(default)]
    feed: FeedConfig,
}

fn default_settings_file() -> String {
    "settings".to_string()
}

fn default_initial_balance() -> Decimal {
    Decimal::from(1000)
}

fn load_app_config() -> Result<AppConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name("kagi").required(false))
        .add_source(config::Environment::with_prefix("KAGI").separator("__"))
        .build()?
        .try_deserialize()
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 StrategyScheduler。
///
/// # Logic
/// 1. 初始化全局日志。
/// 2. 装载应用配置。
/// 3. 实例化基础设施层（FileSettingsSource、PaperGateway、TracingLivePublisher）。
/// 4. 构造应用服务层（StrategyScheduler）并启动配置的策略。
/// 5. 启动演示行情源，挂起等待外部信号退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 初始化日志
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .init();
    info!("Kagi starting...");

    // 2. 装载应用配置
    let app_config = load_app_config()?;

    // 3. 实例化基础设施层
    let source = Arc::new(FileSettingsSource::new(app_config.settings_file.clone()));
    let gateway = Arc::new(PaperGateway::new());
    let live = Arc::new(TracingLivePublisher);

    // 每个账户注入一次初始资金
    let accounts: BTreeSet<&str> = app_config
        .strategies
        .iter()
        .map(|e| e.account.as_str())
        .collect();
    for account in accounts {
        gateway.deposit(
            AccountId(account.to_string()),
            app_config.initial_balance,
        );
    }

    // 4. 构造应用服务层并启动策略
    let scheduler = StrategyScheduler::new(
        source,
        gateway.clone(),
        live,
        app_config.runtime.clone(),
    );

    let mut started = Vec::new();
    for entry in &app_config.strategies {
        let kind = match StrategyKind::from_str(&entry.kind) {
            Ok(kind) => kind,
            Err(e) => {
                error!("skipping strategy entry: {}", e);
                continue;
            }
        };
        let key = RuntimeKey::new(AccountId(entry.account.clone()), kind);
        match scheduler.start(key.clone(), decision_for(kind)).await {
            Ok(()) => started.push(key),
            Err(e) => error!("failed to start key={}: {}", key, e),
        }
    }
    info!("{} strategies running", scheduler.running_count());

    // 5. 演示行情源 + 等待退出信号
    let feed_handle = feed::spawn(scheduler.clone(), started, app_config.feed.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting...");

    feed_handle.abort();
    scheduler.shutdown();
    // 给各协程一点时间完成收尾日志与推送
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    Ok(())
}
