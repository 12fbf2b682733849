use dashmap::DashMap;
use futures::FutureExt;
use kagi_core::common::PriceTick;
use kagi_core::config::RuntimeConfig;
use kagi_core::live::port::LivePublisher;
use kagi_core::settings::port::SettingsSource;
use kagi_core::strategy::entity::RuntimeKey;
use kagi_core::strategy::port::DecisionFn;
use kagi_core::trade::port::ExecutionGateway;
use kagi_runtime::runtime::{RuntimeError, StrategyRuntime};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// # Summary
/// Scheduler 层的统一错误类型。
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// 一个活跃任务在注册表中的句柄。
struct TaskEntry {
    // 本代任务的身份，清理时用于比较防止误删继任者
    task_id: Uuid,
    tick_tx: mpsc::Sender<PriceTick>,
    cancel_tx: watch::Sender<bool>,
}

/// # Summary
/// 策略调度器，系统的应用服务层门面 (Facade)。
/// 编译期仅依赖 `kagi-core` 中的 Trait 定义，所有具体实现通过构造函数注入。
/// 每个 (账户, 策略种类) 键至多对应一个 tokio 协程，
/// 协程独占运行时状态，行情经有界队列按序投递。
///
/// # Invariants
/// - 同一个 RuntimeKey 在注册表中至多一条记录。
/// - 停止是协作式的：协程在完整处理完当前 tick 后才退出并收尾。
/// - 协程退出时只清理属于自己那一代的注册表记录。
pub struct StrategyScheduler {
    // 外部配置源
    settings: Arc<dyn SettingsSource>,
    // 交易执行通道
    gateway: Arc<dyn ExecutionGateway>,
    // 实时推送通道
    live: Arc<dyn LivePublisher>,
    config: RuntimeConfig,
    // 活跃任务注册表，协程与调度器共享同一份
    tasks: Arc<DashMap<RuntimeKey, TaskEntry>>,
}

impl StrategyScheduler {
    /// # Summary
    /// 创建 StrategyScheduler 实例。
    ///
    /// # Arguments
    /// * `settings` - 外部配置源的具体实现。
    /// * `gateway` - 交易执行通道的具体实现。
    /// * `live` - 实时推送通道的具体实现。
    ///
    /// # Returns
    /// * `Arc<Self>` - 可共享的调度器实例。
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        gateway: Arc<dyn ExecutionGateway>,
        live: Arc<dyn LivePublisher>,
        config: RuntimeConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            gateway,
            live,
            config,
            tasks: Arc::new(DashMap::new()),
        })
    }

    /// # Summary
    /// 启动一个策略运行时。
    ///
    /// # Logic
    /// 1. 同步装载配置并构建运行时，配置缺失在这里立即失败。
    /// 2. 建立有界行情队列与取消信号，spawn 协程跑 tick 循环。
    /// 3. 注册新任务；若同 key 已有旧任务，向其发取消信号，
    ///    旧协程处理完当前 tick 后自行收尾。
    ///
    /// # Returns
    /// * `Err(SchedulerError::Runtime)` - 配置缺失或不可运行。
    pub async fn start(
        &self,
        key: RuntimeKey,
        decision: DecisionFn,
    ) -> Result<(), SchedulerError> {
        let runtime = StrategyRuntime::start(
            key.clone(),
            decision,
            self.settings.clone(),
            self.gateway.clone(),
            self.live.clone(),
            &self.config,
        )
        .await?;

        let task_id = Uuid::new_v4();
        let (tick_tx, tick_rx) = mpsc::channel(self.config.tick_queue_capacity);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        tokio::spawn(run_task(
            runtime,
            task_id,
            tick_rx,
            cancel_rx,
            self.tasks.clone(),
        ));

        let entry = TaskEntry {
            task_id,
            tick_tx,
            cancel_tx,
        };
        // 同 key 的旧任务被顶替，协作式地停掉
        if let Some(old) = self.tasks.insert(key.clone(), entry) {
            info!("superseding task key={}", key);
            let _ = old.cancel_tx.send(true);
        }

        info!("task started key={} task_id={}", key, task_id);
        Ok(())
    }

    /// # Summary
    /// 停止指定 key 的运行时。key 不存在时为幂等 no-op。
    pub fn stop(&self, key: &RuntimeKey) {
        if let Some((_, entry)) = self.tasks.remove(key) {
            info!("stopping task key={} task_id={}", key, entry.task_id);
            let _ = entry.cancel_tx.send(true);
        }
    }

    pub fn is_running(&self, key: &RuntimeKey) -> bool {
        self.tasks.contains_key(key)
    }

    pub fn running_count(&self) -> usize {
        self.tasks.len()
    }

    /// # Summary
    /// 投递一个行情 tick。非阻塞：队列满时丢弃并告警，
    /// 决不反压行情采集路径。
    pub fn on_price_update(&self, key: &RuntimeKey, tick: PriceTick) {
        if let Some(entry) = self.tasks.get(key) {
            match entry.tick_tx.try_send(tick) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("tick queue full, dropping key={}", key);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("tick queue closed key={}", key);
                }
            }
        }
    }

    /// # Summary
    /// 停止全部运行时。协程异步收尾，注册表立即清空。
    pub fn shutdown(&self) {
        let keys: Vec<RuntimeKey> = self.tasks.iter().map(|e| e.key().clone()).collect();
        info!("scheduler shutdown, stopping {} tasks", keys.len());
        for key in keys {
            self.stop(&key);
        }
    }
}

/// # Summary
/// 单个策略协程的 tick 循环。
///
/// # Logic
/// 1. biased select：取消信号优先于下一个 tick，
///    但已取出的 tick 总是完整处理完，绝不中途打断状态迁移。
/// 2. 每个 tick 包在 catch_unwind 里：决策函数 panic 只终结本任务，
///    收尾与注册表清理照常执行。
/// 3. 退出时只按 task_id 比较删除自己那一代的记录，
///    顶替场景下新任务的记录不受影响。
async fn run_task(
    mut runtime: StrategyRuntime,
    task_id: Uuid,
    mut tick_rx: mpsc::Receiver<PriceTick>,
    mut cancel_rx: watch::Receiver<bool>,
    tasks: Arc<DashMap<RuntimeKey, TaskEntry>>,
) {
    let key = runtime.key().clone();

    loop {
        tokio::select! {
            biased;
            changed = cancel_rx.changed() => {
                // 收到取消或发送端消失都视为停止
                if changed.is_err() || *cancel_rx.borrow() {
                    break;
                }
            }
            maybe_tick = tick_rx.recv() => {
                let Some(tick) = maybe_tick else {
                    break;
                };
                let handled = AssertUnwindSafe(runtime.on_price_update(tick))
                    .catch_unwind()
                    .await;
                if handled.is_err() {
                    error!("strategy task panicked key={} task_id={}", key, task_id);
                    break;
                }
            }
        }
    }

    runtime.shutdown().await;
    // 只删自己那一代，避免误删顶替后的继任者
    tasks.remove_if(&key, |_, entry| entry.task_id == task_id);
    info!("task exited key={} task_id={}", key, task_id);
}
