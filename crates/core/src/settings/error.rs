use thiserror::Error;

/// # Summary
/// 配置域错误枚举。
///
/// # Invariants
/// - `NotFound` 对启动是致命的，从不以默认值兜底。
/// - `Store` 在热加载路径上视为瞬态，可降级沿用旧快照。
#[derive(Error, Debug)]
pub enum SettingsError {
    // 指定 key 不存在任何配置
    #[error("Settings not found for {0}")]
    NotFound(String),
    // 配置存在但不具备可运行条件
    #[error("Invalid settings: {0}")]
    Invalid(String),
    // 配置存储访问失败
    #[error("Settings store error: {0}")]
    Store(String),
}
