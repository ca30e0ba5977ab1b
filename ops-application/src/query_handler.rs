use crate::error::OperationResult;
use async_trait::async_trait;
use ops_domain::query::Query;

/// 查询处理器
///
/// 同一查询类型可注册多个，按注册顺序依次执行，
/// 后一个的结果覆盖前一个；任一失败立即向调用方传播。
#[async_trait]
pub trait QueryHandler<Q>: Send + Sync
where
    Q: Query,
{
    async fn handle(&self, query: &Q) -> OperationResult<Q::Output>;
}
