use thiserror::Error;

/// # Summary
/// 实时推送域错误枚举。
/// 推送失败对交易路径无害，调用方一律吞掉并记录调试日志。
#[derive(Error, Debug)]
pub enum LiveError {
    // 底层推送通道错误
    #[error("Transport error: {0}")]
    Transport(String),
    // 推送通道已关闭
    #[error("Channel closed")]
    Closed,
}
