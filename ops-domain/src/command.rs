use crate::context_data::ContextData;
use crate::operation::Operation;

/// 命令（Command）
///
/// 表达"意图"的写操作请求，通常会修改系统状态。
/// - `Output` 为命令产出的结果类型，无结果命令使用 `()`；
/// - 携带 [`ContextData`](crate::context_data::ContextData)，
///   供主处理器写入、后置处理器读取；
/// - 建议保持语义化的"动宾结构"命名，如 `CreateDocument`、`CloseOrder`。
///
/// 关联常量：
/// - `NAME`：命令的稳定名称，用于日志、追踪与路由。避免依赖 `type_name::<T>()`。
pub trait Command: Operation {
    /// 命令的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 命令产出的结果类型（无结果命令为 `()`）
    type Output: Send + Sync + 'static;

    /// 命令随行的上下文数据
    fn context(&self) -> &ContextData;
}
