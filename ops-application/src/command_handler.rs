use crate::error::{OperationError, OperationResult};
use async_trait::async_trait;
use ops_domain::command::Command;
use ops_domain::internal_event::SharedEvent;

/// 后置处理器可见的命令结局：成功的结果值，或导致失败的错误
pub type CommandOutcome<'a, T> = Result<&'a T, &'a OperationError>;

/// 前置命令处理器
///
/// 在任何作用域建立之前顺序执行；任一失败立即中止整个命令调度，
/// 余下的前置处理器与主处理器均被跳过。
#[async_trait]
pub trait PreCommandHandler<C>: Send + Sync
where
    C: Command,
{
    async fn handle(&self, cmd: &C) -> OperationResult<()>;
}

/// 主命令处理器
///
/// 同一命令类型可注册多个，按注册顺序依次执行；
/// 每个处理器在各自的嵌套作用域内运行，产出的结果以"后写覆盖"为准。
#[async_trait]
pub trait CommandHandler<C>: Send + Sync
where
    C: Command,
{
    async fn handle(&self, cmd: &C) -> OperationResult<C::Output>;
}

/// 后置命令处理器
///
/// 主处理器（无论成败）完成后执行，可读取其作用域收集到的全部内部事件
/// 与结局。后置处理器自身的失败被记录并吞掉，不改变命令的原始结局。
#[async_trait]
pub trait PostCommandHandler<C>: Send + Sync
where
    C: Command,
{
    async fn handle(
        &self,
        cmd: &C,
        events: &[SharedEvent],
        outcome: CommandOutcome<'_, C::Output>,
    ) -> OperationResult<()>;
}
