//! 操作调度核心（ops-application）
//!
//! 在 `ops-domain` 的操作模型之上提供调度语义：
//! - 处理器注册表（`registry`）：按类型键维护各类别处理器
//! - 环境上下文（`context`）与作用域（`scope`）：
//!   任务本地的作用域栈、内部事件归集与聚合
//! - 三个调度器（`command_dispatcher`/`query_dispatcher`/
//!   `internal_event_dispatcher`）：相序编排、跨度与日志、失败策略
//! - 静态入口（`dispatch`）：`cmd.dispatch().await` 式的调用面
//!
//! 处理器解析、追踪与日志均可由宿主替换；本 crate 不含任何传输或存储实现。
//!
pub mod command_dispatcher;
pub mod command_handler;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event_handler;
pub mod internal_event_dispatcher;
pub mod query_dispatcher;
pub mod query_handler;
pub mod registry;
pub mod scope;
pub mod tracer;

pub use context::{OperationContext, Operations};
pub use dispatch::{DispatchCommand, DispatchQuery, EmitEvent};
pub use registry::HandlerRegistry;
