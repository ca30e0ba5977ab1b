//! 操作模型基础库（ops-domain）
//!
//! 提供调度核心共享的操作模型抽象：
//! - 操作（`operation`）：命令/查询/内部事件共有的标识与创建时间元数据
//! - 命令（`command`）与查询（`query`）的能力边界
//! - 内部事件（`internal_event`）与"仅能发布一次"的状态机
//! - 命令上下文数据（`context_data`）：主处理器向后置处理器传值的通道
//!
//! 本 crate 不关心处理器如何注册与调度，仅定义模型与最小必要的错误类型；
//! 作用域、调度顺序与失败策略由 `ops-application` 提供。
//!
pub mod command;
pub mod context_data;
pub mod error;
pub mod internal_event;
pub mod operation;
pub mod query;
