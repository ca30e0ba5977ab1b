//! 调度层统一错误定义
//!
//! 在模型层错误之上补充处理器失败与取消两类来源，并携带 `logged` 标记：
//! 某一调度层记录过的失败在向外传播时不再重复记录，
//! 外层宿主据此区分"调度核心已记录"与"完全未处理"的错误。
//!
use ops_domain::error::DomainError;
use thiserror::Error;

/// 错误种类
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OperationErrorKind {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("handler: {0}")]
    Handler(anyhow::Error),

    #[error("operation cancelled")]
    Cancelled,
}

/// 调度层统一错误
///
/// `logged` 由首个记录该失败的调度层置位，替代在异常附加数据中
/// 传递"已处理"标记的做法；各层在记录前显式检查。
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct OperationError {
    kind: OperationErrorKind,
    logged: bool,
}

impl OperationError {
    pub fn new(kind: OperationErrorKind) -> Self {
        Self {
            kind,
            logged: false,
        }
    }

    /// 处理器内部失败的便捷构造
    pub fn handler(err: impl Into<anyhow::Error>) -> Self {
        Self::new(OperationErrorKind::Handler(err.into()))
    }

    pub fn cancelled() -> Self {
        Self::new(OperationErrorKind::Cancelled)
    }

    pub fn kind(&self) -> &OperationErrorKind {
        &self.kind
    }

    /// 是否已由某一调度层记录
    pub fn is_logged(&self) -> bool {
        self.logged
    }

    pub fn mark_logged(&mut self) {
        self.logged = true;
    }
}

impl From<OperationErrorKind> for OperationError {
    fn from(kind: OperationErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<DomainError> for OperationError {
    fn from(err: DomainError) -> Self {
        Self::new(OperationErrorKind::Domain(err))
    }
}

impl From<anyhow::Error> for OperationError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(OperationErrorKind::Handler(err))
    }
}

/// 统一 Result 类型别名
pub type OperationResult<T> = Result<T, OperationError>;
