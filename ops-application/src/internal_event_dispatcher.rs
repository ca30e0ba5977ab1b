//! 内部事件调度器
//!
//! 按三相分发已抛出的内部事件，每次处理器调用开启独立跨度：
//! - 发布即时（on-emission）：处理器充当校验闸门，失败传播并中止剩余处理器；
//! - 成功后（on-success）/ 失败后（on-failure）：尽力而为，
//!   单个处理器失败被记录并吞掉，保证所有已注册的反应器都得到执行机会。
//!
use crate::context::Operations;
use crate::error::{OperationError, OperationResult};
use crate::tracer::SpanKind;
use ops_domain::internal_event::SharedEvent;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct InternalEventDispatcher {
    operations: Arc<Operations>,
    cancellation: CancellationToken,
}

impl InternalEventDispatcher {
    pub(crate) fn new(operations: Arc<Operations>, cancellation: CancellationToken) -> Self {
        Self {
            operations,
            cancellation,
        }
    }

    /// 发布即时相：失败传播到 `emit` 的调用方
    pub async fn dispatch_on_emission(&self, event: SharedEvent) -> OperationResult<()> {
        let handlers = self
            .operations
            .registry()
            .on_emission_handlers(event.as_any().type_id());

        for (name, handler) in handlers {
            if self.cancellation.is_cancelled() {
                let mut err = OperationError::cancelled();
                tracing::error!(
                    phase = "on_emission",
                    event = event.event_name(),
                    "internal event dispatch cancelled"
                );
                err.mark_logged();
                return Err(err);
            }

            let span = self.operations.tracer().open_span(name, SpanKind::Handler);
            self.log_start("on_emission", name, &event);

            match handler(event.clone()).await {
                Ok(()) => {
                    if self.operations.config().enable_non_error_logging {
                        tracing::debug!(
                            phase = "on_emission",
                            handler = name,
                            event = event.event_name(),
                            elapsed = ?span.duration(),
                            "internal event handler finished"
                        );
                    }
                }
                Err(mut err) => {
                    if !err.is_logged() {
                        tracing::error!(
                            phase = "on_emission",
                            handler = name,
                            event = event.event_name(),
                            elapsed = ?span.duration(),
                            error = %err,
                            "internal event handler failed"
                        );
                        err.mark_logged();
                    }
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// 成功后相：逐个执行，失败记录并吞掉
    pub async fn dispatch_on_success(&self, event: SharedEvent) {
        let handlers = self
            .operations
            .registry()
            .on_success_handlers(event.as_any().type_id());

        for (name, handler) in handlers {
            let span = self.operations.tracer().open_span(name, SpanKind::Handler);
            self.log_start("on_success", name, &event);

            if let Err(err) = handler(event.clone()).await {
                tracing::error!(
                    phase = "on_success",
                    handler = name,
                    event = event.event_name(),
                    elapsed = ?span.duration(),
                    error = %err,
                    "internal event handler failed"
                );
            } else if self.operations.config().enable_non_error_logging {
                tracing::debug!(
                    phase = "on_success",
                    handler = name,
                    event = event.event_name(),
                    elapsed = ?span.duration(),
                    "internal event handler finished"
                );
            }
        }
    }

    /// 失败后相：携带致因错误逐个执行，失败记录并吞掉
    pub async fn dispatch_on_failure(&self, event: SharedEvent, error: &OperationError) {
        let handlers = self
            .operations
            .registry()
            .on_failure_handlers(event.as_any().type_id());

        for (name, handler) in handlers {
            let span = self.operations.tracer().open_span(name, SpanKind::Handler);
            self.log_start("on_failure", name, &event);

            if let Err(err) = handler(event.clone(), error).await {
                tracing::error!(
                    phase = "on_failure",
                    handler = name,
                    event = event.event_name(),
                    elapsed = ?span.duration(),
                    error = %err,
                    "internal event handler failed"
                );
            } else if self.operations.config().enable_non_error_logging {
                tracing::debug!(
                    phase = "on_failure",
                    handler = name,
                    event = event.event_name(),
                    elapsed = ?span.duration(),
                    "internal event handler finished"
                );
            }
        }
    }

    fn log_start(&self, phase: &'static str, name: &str, event: &SharedEvent) {
        if self.operations.config().enable_non_error_logging {
            tracing::debug!(
                phase = phase,
                handler = name,
                event = event.event_name(),
                "invoking internal event handler"
            );
        }
    }
}
