//! 操作模型统一错误定义
//!
//! 仅覆盖模型自身可产生的错误（事件重复发布、类型还原失败），
//! 调度层错误在 `ops-application` 中包装本类型。
//!
use thiserror::Error;

/// 统一错误类型（模型层最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("event already emitted: {event}")]
    EventAlreadyEmitted { event: &'static str },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
