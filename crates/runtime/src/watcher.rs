use chrono::{DateTime, Duration, Utc};
use kagi_core::settings::entity::SettingsSnapshot;
use kagi_core::settings::error::SettingsError;
use kagi_core::settings::port::SettingsSource;
use kagi_core::strategy::entity::RuntimeKey;
use std::sync::Arc;
use tracing::warn;

/// # Summary
/// 一次 `poll` 的结果。
#[derive(Debug)]
pub enum ReloadOutcome {
    // 距上次重载未满间隔，直接使用缓存
    NotDue,
    // 已重载，指纹未变化
    Unchanged,
    // 已重载且指纹变化，由调用方决定是否 `apply`
    Changed(SettingsSnapshot),
    // 重载失败，沿用上一份完好快照
    Failed,
}

/// # Summary
/// 配置热加载看守：缓存当前快照，按固定间隔从外部配置源刷新，
/// 用指纹比较廉价地判断是否发生了有意义的变化。
///
/// # Invariants
/// - 每个运行时一个实例，间隔以 tick 时间戳计。
/// - 重载失败绝不中断交易：继续提供上一份完好快照（瞬态故障语义）。
/// - `Changed` 不自动生效；指纹只在调用方 `apply` 后才提交，
///   这样被推迟的变更会在后续 poll 中再次出现。
pub struct SettingsWatcher {
    source: Arc<dyn SettingsSource>,
    key: RuntimeKey,
    refresh_every: Duration,
    current: SettingsSnapshot,
    fingerprint: String,
    last_reload_at: DateTime<Utc>,
}

impl SettingsWatcher {
    /// # Summary
    /// 首次装载。规范化与校验发生在这里（配置源边界），
    /// 失败对启动是致命的，从不以默认值兜底。
    ///
    /// # Returns
    /// * `Err(SettingsError::NotFound)` - 该 key 无配置。
    /// * `Err(SettingsError::Invalid)` - 配置不具备可运行条件。
    pub async fn load(
        source: Arc<dyn SettingsSource>,
        key: RuntimeKey,
        refresh_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, SettingsError> {
        let mut snapshot = source.load_settings(&key).await?;
        snapshot.normalize();
        snapshot.validate()?;
        let fingerprint = snapshot.fingerprint();
        Ok(Self {
            source,
            key,
            refresh_every: Duration::seconds(refresh_secs.max(1)),
            current: snapshot,
            fingerprint,
            last_reload_at: now,
        })
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.current
    }

    /// # Summary
    /// 按需刷新。
    ///
    /// # Logic
    /// 1. 未到刷新时点 → `NotDue`。
    /// 2. 无论成败都推进重载时钟，避免故障时每个 tick 打一次存储。
    /// 3. 装载失败或校验失败 → 告警并 `Failed`（沿用旧快照）。
    /// 4. 指纹一致 → 静默替换缓存并 `Unchanged`。
    /// 5. 指纹变化 → `Changed(fresh)`，等待调用方裁决。
    pub async fn poll(&mut self, now: DateTime<Utc>) -> ReloadOutcome {
        if now - self.last_reload_at < self.refresh_every {
            return ReloadOutcome::NotDue;
        }
        self.last_reload_at = now;

        let mut fresh = match self.source.load_settings(&self.key).await {
            Ok(s) => s,
            Err(e) => {
                warn!("settings reload failed key={} err={}", self.key, e);
                return ReloadOutcome::Failed;
            }
        };
        fresh.normalize();
        if let Err(e) = fresh.validate() {
            warn!("settings reload invalid key={} err={}", self.key, e);
            return ReloadOutcome::Failed;
        }

        if fresh.fingerprint() == self.fingerprint {
            self.current = fresh;
            ReloadOutcome::Unchanged
        } else {
            ReloadOutcome::Changed(fresh)
        }
    }

    /// 提交一份新快照为当前配置。
    pub fn apply(&mut self, fresh: SettingsSnapshot) {
        self.fingerprint = fresh.fingerprint();
        self.current = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kagi_core::common::AccountId;
    use kagi_core::strategy::entity::StrategyKind;
    use kagi_core::test_utils::{InMemorySettingsSource, test_snapshot};

    fn key() -> RuntimeKey {
        RuntimeKey::new(AccountId("u1".to_string()), StrategyKind::WindowScalping)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_load_fails_when_settings_missing() {
        let source = Arc::new(InMemorySettingsSource::new());
        let result = SettingsWatcher::load(source, key(), 10, at(0)).await;
        assert!(matches!(result, Err(SettingsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_poll_respects_refresh_interval() {
        let source = Arc::new(InMemorySettingsSource::new());
        source.put(key(), test_snapshot("BTCUSDT", 5));
        let mut watcher = SettingsWatcher::load(source.clone(), key(), 10, at(0))
            .await
            .expect("load");

        assert!(matches!(watcher.poll(at(5)).await, ReloadOutcome::NotDue));
        assert_eq!(source.load_calls(), 1);
        assert!(matches!(watcher.poll(at(10)).await, ReloadOutcome::Unchanged));
        assert_eq!(source.load_calls(), 2);
    }

    #[tokio::test]
    async fn test_poll_detects_fingerprint_change() {
        let source = Arc::new(InMemorySettingsSource::new());
        source.put(key(), test_snapshot("BTCUSDT", 5));
        let mut watcher = SettingsWatcher::load(source.clone(), key(), 10, at(0))
            .await
            .expect("load");

        source.put(key(), test_snapshot("ETHUSDT", 5));
        match watcher.poll(at(10)).await {
            ReloadOutcome::Changed(fresh) => {
                assert_eq!(fresh.symbol, "ETHUSDT");
                // 未 apply 前指纹不提交，变更会再次出现
                source.put(key(), test_snapshot("ETHUSDT", 5));
                assert!(matches!(
                    watcher.poll(at(20)).await,
                    ReloadOutcome::Changed(_)
                ));
            }
            other => panic!("expected Changed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_last_good_snapshot() {
        let source = Arc::new(InMemorySettingsSource::new());
        source.put(key(), test_snapshot("BTCUSDT", 5));
        let mut watcher = SettingsWatcher::load(source.clone(), key(), 10, at(0))
            .await
            .expect("load");

        source.fail_next(1);
        assert!(matches!(watcher.poll(at(10)).await, ReloadOutcome::Failed));
        assert_eq!(watcher.snapshot().symbol, "BTCUSDT");
    }
}
