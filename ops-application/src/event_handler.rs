use crate::error::{OperationError, OperationResult};
use async_trait::async_trait;
use ops_domain::internal_event::InternalEvent;

/// 发布即时处理器（on-emission）
///
/// 事件被抛出的瞬间同步介入，充当校验闸门：
/// 失败会中止发布并传播到 `emit` 的调用方。
#[async_trait]
pub trait OnEmissionHandler<E>: Send + Sync
where
    E: InternalEvent,
{
    async fn handle(&self, event: &E) -> OperationResult<()>;
}

/// 成功后处理器（on-success）
///
/// 所属动作成功完成后，按事件抛出顺序逐一执行；
/// 单个处理器失败被记录并吞掉，其余处理器照常执行。
#[async_trait]
pub trait OnSuccessHandler<E>: Send + Sync
where
    E: InternalEvent,
{
    async fn handle(&self, event: &E) -> OperationResult<()>;
}

/// 失败后处理器（on-failure）
///
/// 所属动作失败后执行，可读取导致失败的错误；
/// 失败策略与 on-success 相同：记录并吞掉。
#[async_trait]
pub trait OnFailureHandler<E>: Send + Sync
where
    E: InternalEvent,
{
    async fn handle(&self, event: &E, error: &OperationError) -> OperationResult<()>;
}
