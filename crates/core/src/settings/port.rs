use crate::settings::entity::SettingsSnapshot;
use crate::settings::error::SettingsError;
use crate::strategy::entity::RuntimeKey;
use async_trait::async_trait;

/// # Summary
/// 策略配置的读取端口，由外部配置存储（CRUD 属于系统外协作者）实现。
///
/// # Invariants
/// - 实现类必须保证线程安全 (`Send` + `Sync`)。
/// - 每个运行时最多每 `settings_refresh_secs`（默认 10s）调用一次，
///   实现无需自带缓存。
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// # Summary
    /// 装载指定 (账户, 策略种类) 的当前配置快照。
    ///
    /// # Arguments
    /// * `key` - 运行时身份。
    ///
    /// # Returns
    /// * `Ok(SettingsSnapshot)` - 当前配置。
    /// * `Err(SettingsError::NotFound)` - 该 key 没有任何配置。
    async fn load_settings(&self, key: &RuntimeKey) -> Result<SettingsSnapshot, SettingsError>;
}
