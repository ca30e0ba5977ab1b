//! 操作上下文作用域（OperationContextScope）
//!
//! 一次处理器调用的事件归集单元，可嵌套成栈：
//! - 作用域持有期间抛出的内部事件被记录在本作用域，永不迁移；
//! - 事件抛出时沿父链向上通知观察者，使外层聚合能看到嵌套作用域的事件；
//! - `dispatch_operations` 包住动作执行，动作期间打开发布即时分发，
//!   动作结束后按抛出顺序补发成功/失败相；
//! - 守卫 drop 时弹栈，恰好一次。
//!
use crate::context::{OperationContext, Operations};
use crate::error::OperationResult;
use crate::internal_event_dispatcher::InternalEventDispatcher;
use ops_domain::internal_event::SharedEvent;
use std::any::TypeId;
use std::collections::HashSet;
use std::future::Future;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio_util::sync::CancellationToken;

type ObserverFn = Arc<dyn Fn(&SharedEvent) + Send + Sync>;

struct Observer {
    id: u64,
    callback: ObserverFn,
}

/// 作用域内部状态
///
/// 单一逻辑流内只有该流自身写入；互斥锁仅为跨线程安全兜底。
pub(crate) struct ScopeInner {
    parent: Option<Arc<ScopeInner>>,
    operations: Arc<Operations>,
    cancellation: CancellationToken,
    events: Mutex<Vec<SharedEvent>>,
    observers: Mutex<Vec<Observer>>,
    next_observer_id: AtomicU64,
    emission_dispatch: AtomicBool,
}

impl ScopeInner {
    pub(crate) fn new(
        parent: Option<Arc<ScopeInner>>,
        operations: Arc<Operations>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            parent,
            operations,
            cancellation,
            events: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            next_observer_id: AtomicU64::new(0),
            emission_dispatch: AtomicBool::new(false),
        }
    }

    fn events_snapshot(&self) -> Vec<SharedEvent> {
        self.events.lock().expect("scope events lock poisoned").clone()
    }

    fn subscribe(&self, callback: ObserverFn) -> u64 {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.observers
            .lock()
            .expect("scope observers lock poisoned")
            .push(Observer { id, callback });
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.observers
            .lock()
            .expect("scope observers lock poisoned")
            .retain(|o| o.id != id);
    }

    // 事件入账：记录到本作用域，沿父链通知观察者；
    // 若本作用域正处于 dispatch_operations 中，再走发布即时分发。
    pub(crate) async fn raise(self: &Arc<Self>, event: SharedEvent) -> OperationResult<()> {
        self.events
            .lock()
            .expect("scope events lock poisoned")
            .push(event.clone());

        let mut current = Some(Arc::clone(self));
        while let Some(scope) = current {
            let callbacks: Vec<ObserverFn> = scope
                .observers
                .lock()
                .expect("scope observers lock poisoned")
                .iter()
                .map(|o| o.callback.clone())
                .collect();
            for callback in callbacks {
                callback(&event);
            }
            current = scope.parent.clone();
        }

        if self.emission_dispatch.load(Ordering::Acquire) {
            let dispatcher =
                InternalEventDispatcher::new(self.operations.clone(), self.cancellation.clone());
            dispatcher.dispatch_on_emission(event).await?;
        }

        Ok(())
    }
}

/// 作用域的非持有视图
///
/// 处理器代码经由 [`OperationContext::current_scope`] 获得，
/// 可读取事件、订阅发布通知、进行聚合，但不掌握作用域的生命周期。
#[derive(Clone)]
pub struct ScopeRef {
    inner: Arc<ScopeInner>,
}

impl ScopeRef {
    pub(crate) fn new(inner: Arc<ScopeInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<ScopeInner> {
        &self.inner
    }

    /// 本作用域当前已收集的内部事件（按抛出顺序）
    pub fn events(&self) -> Vec<SharedEvent> {
        self.inner.events_snapshot()
    }

    /// 订阅事件抛出通知（本作用域及其嵌套作用域内的每次抛出）
    ///
    /// 返回的订阅随 drop 解除。
    pub fn on_event<F>(&self, callback: F) -> EventSubscription
    where
        F: Fn(&SharedEvent) + Send + Sync + 'static,
    {
        let id = self.inner.subscribe(Arc::new(callback));
        EventSubscription {
            scope: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// 包住动作执行：动作期间打开发布即时分发；
    /// 动作成功则按抛出顺序补发成功相，失败则补发失败相后再传播。
    pub async fn dispatch_operations<F, Fut, T>(&self, action: F) -> OperationResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = OperationResult<T>>,
    {
        self.inner.emission_dispatch.store(true, Ordering::Release);
        let result = action().await;
        self.inner.emission_dispatch.store(false, Ordering::Release);

        let events = self.inner.events_snapshot();
        let dispatcher = InternalEventDispatcher::new(
            self.inner.operations.clone(),
            self.inner.cancellation.clone(),
        );

        match result {
            Ok(value) => {
                for event in events {
                    dispatcher.dispatch_on_success(event).await;
                }
                Ok(value)
            }
            Err(err) => {
                for event in events {
                    dispatcher.dispatch_on_failure(event, &err).await;
                }
                Err(err)
            }
        }
    }

    /// 聚合动作期间抛出的指定类型事件
    ///
    /// 仅捕获运行时类型命中 `event_types` 的事件（含嵌套作用域抛出的），
    /// 其余类型照常入账但不进入批次；动作成功后把批次交给 `process`。
    /// 捕获不会触发成功/失败相分发。
    pub async fn aggregate_events<F, Fut, T, P, PFut>(
        &self,
        event_types: &[TypeId],
        action: F,
        process: P,
    ) -> OperationResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = OperationResult<T>>,
        P: FnOnce(Vec<SharedEvent>) -> PFut,
        PFut: Future<Output = OperationResult<()>>,
    {
        let filter: HashSet<TypeId> = event_types.iter().copied().collect();
        let captured = Arc::new(Mutex::new(Vec::new()));

        let subscription = self.on_event({
            let captured = Arc::clone(&captured);
            move |event| {
                if filter.contains(&event.as_any().type_id()) {
                    captured
                        .lock()
                        .expect("aggregation batch lock poisoned")
                        .push(event.clone());
                }
            }
        });

        let result = action().await;
        drop(subscription);

        let batch = std::mem::take(
            &mut *captured.lock().expect("aggregation batch lock poisoned"),
        );

        match result {
            Ok(value) => {
                process(batch).await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }
}

/// 作用域守卫
///
/// 由 [`OperationContext::open_scope`] 打开；drop 时从环境栈中弹出，
/// 控制权回到父作用域（或回到"无作用域"）。
pub struct OperationContextScope {
    context: OperationContext,
    scope: ScopeRef,
}

impl OperationContextScope {
    pub(crate) fn new(context: OperationContext, scope: ScopeRef) -> Self {
        Self { context, scope }
    }
}

impl Deref for OperationContextScope {
    type Target = ScopeRef;

    fn deref(&self) -> &Self::Target {
        &self.scope
    }
}

impl Drop for OperationContextScope {
    fn drop(&mut self) {
        self.context.close_scope(self.scope.inner());
    }
}

/// 事件抛出通知的订阅凭据；drop 即解除订阅
pub struct EventSubscription {
    scope: Weak<ScopeInner>,
    id: u64,
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.upgrade() {
            scope.unsubscribe(self.id);
        }
    }
}
