//! 命令调度器
//!
//! 编排一次命令调度的完整相序：
//! 前置处理器 → (逐个主处理器：嵌套作用域 + 事件相) → 后置处理器。
//! 前置失败立即中止；主处理器失败在补发失败相与后置通知后传播；
//! 后置失败仅记录，不改变命令结局。
//!
use crate::command_handler::{CommandOutcome, PreCommandHandler};
use crate::context::OperationContext;
use crate::error::{OperationError, OperationResult};
use crate::tracer::SpanKind;
use ops_domain::command::Command;
use ops_domain::internal_event::SharedEvent;
use ops_domain::operation::Operation;
use std::sync::Arc;

pub struct CommandDispatcher {
    context: OperationContext,
}

impl CommandDispatcher {
    pub(crate) fn new(context: OperationContext) -> Self {
        Self { context }
    }

    /// 调度一个命令
    ///
    /// 所有主处理器按注册顺序执行，结果"后写覆盖"；
    /// 未注册任何主处理器时返回 `Ok(None)`。
    pub async fn dispatch<C>(&self, command: C) -> OperationResult<Option<C::Output>>
    where
        C: Command,
    {
        let operations = Arc::clone(self.context.operations());
        let non_error = operations.config().enable_non_error_logging;

        let span = operations.tracer().open_span(C::NAME, SpanKind::Command);
        if non_error {
            tracing::debug!(
                command = C::NAME,
                operation_id = %command.operation_id(),
                "dispatching command"
            );
        }

        for (name, handler) in operations.registry().pre_command_handlers::<C>() {
            if let Err(mut err) = self.invoke_pre(name, handler.as_ref(), &command).await {
                if !err.is_logged() {
                    tracing::error!(
                        command = C::NAME,
                        handler = name,
                        error = %err,
                        "pre-command handler failed"
                    );
                    err.mark_logged();
                }
                return Err(err);
            }
        }

        let mut result: Option<C::Output> = None;
        for (name, handler) in operations.registry().command_handlers::<C>() {
            if let Err(mut err) = self.ensure_not_cancelled() {
                if !err.is_logged() {
                    tracing::error!(
                        command = C::NAME,
                        handler = name,
                        "command dispatch cancelled"
                    );
                    err.mark_logged();
                }
                return Err(err);
            }

            let scope = self.context.open_scope();
            let handler_span = operations.tracer().open_span(name, SpanKind::Handler);
            if non_error {
                tracing::debug!(command = C::NAME, handler = name, "invoking command handler");
            }

            let outcome = scope.dispatch_operations(|| handler.handle(&command)).await;
            let events = scope.events();
            drop(scope);

            match outcome {
                Ok(value) => {
                    if non_error {
                        tracing::debug!(
                            command = C::NAME,
                            handler = name,
                            elapsed = ?handler_span.duration(),
                            "command handler finished"
                        );
                    }
                    self.run_post_handlers::<C>(&command, &events, Ok(&value)).await;
                    result = Some(value);
                }
                Err(mut err) => {
                    if !err.is_logged() {
                        tracing::error!(
                            command = C::NAME,
                            handler = name,
                            elapsed = ?handler_span.duration(),
                            error = %err,
                            "command handler failed"
                        );
                        err.mark_logged();
                    }
                    self.run_post_handlers::<C>(&command, &events, Err(&err)).await;
                    return Err(err);
                }
            }
        }

        if non_error {
            tracing::debug!(
                command = C::NAME,
                elapsed = ?span.duration(),
                "command dispatch finished"
            );
        }
        Ok(result)
    }

    async fn invoke_pre<C>(
        &self,
        name: &str,
        handler: &dyn PreCommandHandler<C>,
        command: &C,
    ) -> OperationResult<()>
    where
        C: Command,
    {
        self.ensure_not_cancelled()?;

        let operations = self.context.operations();
        let span = operations.tracer().open_span(name, SpanKind::Handler);
        handler.handle(command).await?;

        if operations.config().enable_non_error_logging {
            tracing::debug!(
                command = C::NAME,
                handler = name,
                elapsed = ?span.duration(),
                "pre-command handler finished"
            );
        }
        Ok(())
    }

    async fn run_post_handlers<C>(
        &self,
        command: &C,
        events: &[SharedEvent],
        outcome: CommandOutcome<'_, C::Output>,
    ) where
        C: Command,
    {
        let operations = self.context.operations();
        for (name, handler) in operations.registry().post_command_handlers::<C>() {
            let span = operations.tracer().open_span(name, SpanKind::Handler);

            if let Err(err) = handler.handle(command, events, outcome).await {
                tracing::error!(
                    command = C::NAME,
                    handler = name,
                    elapsed = ?span.duration(),
                    error = %err,
                    "post-command handler failed"
                );
            } else if operations.config().enable_non_error_logging {
                tracing::debug!(
                    command = C::NAME,
                    handler = name,
                    elapsed = ?span.duration(),
                    "post-command handler finished"
                );
            }
        }
    }

    fn ensure_not_cancelled(&self) -> OperationResult<()> {
        if self.context.cancellation_token().is_cancelled() {
            return Err(OperationError::cancelled());
        }
        Ok(())
    }
}
