use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{DomainError, DomainResult};
use crate::operation::{Operation, OperationMeta};

/// 内部事件元数据
///
/// 在操作元数据之上附加"已发布"标记：
/// - 标记只能完成一次 `false → true` 的迁移，且不可逆；
/// - 重复标记返回 [`DomainError::EventAlreadyEmitted`]。
#[derive(Debug)]
pub struct EventMeta {
    operation: OperationMeta,
    emitted: AtomicBool,
}

impl EventMeta {
    pub fn new() -> Self {
        Self {
            operation: OperationMeta::new(),
            emitted: AtomicBool::new(false),
        }
    }

    pub fn operation(&self) -> &OperationMeta {
        &self.operation
    }

    pub fn was_emitted(&self) -> bool {
        self.emitted.load(Ordering::Acquire)
    }

    /// 将事件置为已发布；重复调用返回 `EventAlreadyEmitted`
    pub fn mark_emitted(&self, event: &'static str) -> DomainResult<()> {
        self.emitted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DomainError::EventAlreadyEmitted { event })?;
        Ok(())
    }
}

impl Default for EventMeta {
    fn default() -> Self {
        Self::new()
    }
}

// AtomicBool 不支持派生 Clone；克隆时保留当前标记值，
// 使得"已发布"的副本与原件状态一致。
impl Clone for EventMeta {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            emitted: AtomicBool::new(self.was_emitted()),
        }
    }
}

/// 内部事件（InternalEvent）
///
/// 在操作执行过程中被抛出、由所属作用域收集的事件：
/// - 发布后不可变，且同一实例仅能发布一次；
/// - 以 [`SharedEvent`] 形式在调度管线中流转，
///   按运行时类型（`as_any`）路由到对应处理器。
pub trait InternalEvent: Operation + fmt::Debug {
    fn event_meta(&self) -> &EventMeta;

    /// 事件的稳定名称（用于日志与错误信息）
    fn event_name(&self) -> &'static str;

    /// 运行时类型视图，供按 `TypeId` 路由与还原
    fn as_any(&self) -> &dyn Any;
}

/// 以共享指针在调度管线中流转的事件
pub type SharedEvent = Arc<dyn InternalEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_emitted_transitions_once() {
        let meta = EventMeta::new();
        assert!(!meta.was_emitted());

        meta.mark_emitted("DocumentCreated").unwrap();
        assert!(meta.was_emitted());

        let err = meta.mark_emitted("DocumentCreated").unwrap_err();
        match err {
            DomainError::EventAlreadyEmitted { event } => assert_eq!(event, "DocumentCreated"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn clone_preserves_emitted_flag() {
        let meta = EventMeta::new();
        meta.mark_emitted("DocumentCreated").unwrap();

        let copy = meta.clone();
        assert!(copy.was_emitted());
        assert!(copy.mark_emitted("DocumentCreated").is_err());
    }

    #[test]
    fn clone_of_unemitted_meta_stays_unemitted() {
        let meta = EventMeta::new();
        let copy = meta.clone();
        assert!(!copy.was_emitted());
        copy.mark_emitted("DocumentCreated").unwrap();
        // 原件不受副本影响
        assert!(!meta.was_emitted());
    }
}
