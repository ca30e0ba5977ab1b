//! 查询调度器
//!
//! 解析同一查询类型下的全部处理器并顺序执行，后一个的结果覆盖前一个；
//! 任一失败记录后立即传播，无回退。查询不打开嵌套作用域。
//!
use crate::context::OperationContext;
use crate::error::{OperationError, OperationResult};
use crate::tracer::SpanKind;
use ops_domain::operation::Operation;
use ops_domain::query::Query;
use std::sync::Arc;

pub struct QueryDispatcher {
    context: OperationContext,
}

impl QueryDispatcher {
    pub(crate) fn new(context: OperationContext) -> Self {
        Self { context }
    }

    /// 调度一个查询；未注册任何处理器时返回 `Ok(None)`
    pub async fn dispatch<Q>(&self, query: Q) -> OperationResult<Option<Q::Output>>
    where
        Q: Query,
    {
        let operations = Arc::clone(self.context.operations());
        let non_error = operations.config().enable_non_error_logging;

        let span = operations.tracer().open_span(Q::NAME, SpanKind::Query);
        if non_error {
            tracing::debug!(
                query = Q::NAME,
                operation_id = %query.operation_id(),
                "dispatching query"
            );
        }

        let mut result: Option<Q::Output> = None;
        for (name, handler) in operations.registry().query_handlers::<Q>() {
            if self.context.cancellation_token().is_cancelled() {
                let mut err = OperationError::cancelled();
                tracing::error!(query = Q::NAME, handler = name, "query dispatch cancelled");
                err.mark_logged();
                return Err(err);
            }

            let handler_span = operations.tracer().open_span(name, SpanKind::Handler);
            match handler.handle(&query).await {
                Ok(value) => {
                    if non_error {
                        tracing::debug!(
                            query = Q::NAME,
                            handler = name,
                            elapsed = ?handler_span.duration(),
                            "query handler finished"
                        );
                    }
                    result = Some(value);
                }
                Err(mut err) => {
                    if !err.is_logged() {
                        tracing::error!(
                            query = Q::NAME,
                            handler = name,
                            elapsed = ?handler_span.duration(),
                            error = %err,
                            "query handler failed"
                        );
                        err.mark_logged();
                    }
                    return Err(err);
                }
            }
        }

        if non_error {
            tracing::debug!(
                query = Q::NAME,
                elapsed = ?span.duration(),
                "query dispatch finished"
            );
        }
        Ok(result)
    }
}
