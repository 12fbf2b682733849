use crate::settings::entity::SettingsSnapshot;
use crate::strategy::entity::Decision;
use rust_decimal::Decimal;
use std::sync::Arc;

/// # Summary
/// 可插拔的纯决策函数。
/// 原型系统中约 15 个近乎相同的策略模块，在这里坍缩为注入同一个
/// 运行时的不同函数：输入是按时间排序的价格窗口与当前配置快照，
/// 输出是进场决策。
///
/// # Invariants
/// - 必须是纯函数：不得持有可变状态，不得做任何 IO。
/// - 仅在窗口已满时被调用，实现无需自行检查长度。
pub type DecisionFn = Arc<dyn Fn(&[Decimal], &SettingsSnapshot) -> Decision + Send + Sync>;
