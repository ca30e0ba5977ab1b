use crate::operation::Operation;

/// 查询（Query）
///
/// 表达只读意图，不改变系统状态。
/// - 结果类型由 `Output` 关联给出；
/// - 与 [`Command`](crate::command::Command) 相对，`Query` 应避免副作用，
///   因此不携带上下文数据。
pub trait Query: Operation {
    /// 查询的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 查询返回的结果类型
    type Output: Send + Sync + 'static;
}
