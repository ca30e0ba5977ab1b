//! 静态调度入口
//!
//! 以扩展 trait 挂在命令/查询/内部事件类型上，调用点形如
//! `cmd.dispatch().await`、`event.emit().await`：
//! 路由到当前逻辑流的环境作用域。无激活作用域时是记录在案的空操作——
//! 顶层"即发即忘"的操作被静默丢弃而非报错，也不触碰任何处理器。
//!
use crate::command_dispatcher::CommandDispatcher;
use crate::context::OperationContext;
use crate::error::OperationResult;
use crate::query_dispatcher::QueryDispatcher;
use async_trait::async_trait;
use ops_domain::command::Command;
use ops_domain::internal_event::{InternalEvent, SharedEvent};
use ops_domain::query::Query;
use std::sync::Arc;

/// 命令调度入口
#[async_trait]
pub trait DispatchCommand: Command + Sized {
    /// 无激活作用域或未注册主处理器时返回 `Ok(None)`
    async fn dispatch(self) -> OperationResult<Option<Self::Output>>;
}

#[async_trait]
impl<C> DispatchCommand for C
where
    C: Command,
{
    async fn dispatch(self) -> OperationResult<Option<Self::Output>> {
        let Some(context) = OperationContext::current() else {
            return Ok(None);
        };
        if context.current_scope().is_none() {
            return Ok(None);
        }
        CommandDispatcher::new(context).dispatch(self).await
    }
}

/// 查询调度入口
#[async_trait]
pub trait DispatchQuery: Query + Sized {
    /// 无激活作用域或未注册处理器时返回 `Ok(None)`
    async fn dispatch(self) -> OperationResult<Option<Self::Output>>;
}

#[async_trait]
impl<Q> DispatchQuery for Q
where
    Q: Query,
{
    async fn dispatch(self) -> OperationResult<Option<Self::Output>> {
        let Some(context) = OperationContext::current() else {
            return Ok(None);
        };
        if context.current_scope().is_none() {
            return Ok(None);
        }
        QueryDispatcher::new(context).dispatch(self).await
    }
}

/// 内部事件发布入口
///
/// 要求 `Clone`：入账的是事件的共享副本，原实例保留"已发布"标记，
/// 因此对同一实例的第二次 `emit` 会以 `EventAlreadyEmitted` 失败。
#[async_trait]
pub trait EmitEvent: InternalEvent + Clone {
    /// 无激活作用域时为空操作，且不置已发布标记
    async fn emit(&self) -> OperationResult<()>;
}

#[async_trait]
impl<E> EmitEvent for E
where
    E: InternalEvent + Clone,
{
    async fn emit(&self) -> OperationResult<()> {
        let Some(context) = OperationContext::current() else {
            return Ok(());
        };
        let Some(scope) = context.current_scope() else {
            return Ok(());
        };

        self.event_meta().mark_emitted(self.event_name())?;
        let shared: SharedEvent = Arc::new(self.clone());
        scope.inner().raise(shared).await
    }
}
