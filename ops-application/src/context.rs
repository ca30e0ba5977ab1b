//! 调度运行时与环境上下文
//!
//! - [`Operations`]：注册表、追踪器与配置装配成的运行时；
//!   `enter` 为一条逻辑流安装环境上下文并打开根作用域。
//! - [`OperationContext`]：随任务本地存储流转的逐流状态，
//!   持有作用域栈与取消令牌；跨 `await` 点跟随逻辑调用链，
//!   并发流之间互不可见。
//!
use crate::config::OperationsConfig;
use crate::registry::HandlerRegistry;
use crate::scope::{OperationContextScope, ScopeInner, ScopeRef};
use crate::tracer::{Tracer, TracingTracer};
use bon::Builder;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

tokio::task_local! {
    static CURRENT: OperationContext;
}

/// 调度运行时
///
/// 一般在启动期装配一次，之后以 `Arc` 共享给各入口：
/// ```rust,no_run
/// use ops_application::context::Operations;
/// use ops_application::registry::HandlerRegistry;
/// use std::sync::Arc;
///
/// let registry = HandlerRegistry::new();
/// // registry.register_command::<..., _>(...);
/// let ops = Arc::new(Operations::builder().registry(registry).build());
/// ```
#[derive(Builder)]
pub struct Operations {
    registry: HandlerRegistry,
    #[builder(default = default_tracer())]
    tracer: Arc<dyn Tracer>,
    #[builder(default)]
    config: OperationsConfig,
}

fn default_tracer() -> Arc<dyn Tracer> {
    Arc::new(TracingTracer)
}

impl Operations {
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub(crate) fn tracer(&self) -> &dyn Tracer {
        self.tracer.as_ref()
    }

    pub(crate) fn config(&self) -> &OperationsConfig {
        &self.config
    }

    /// 为 `fut` 安装环境上下文并打开根作用域
    ///
    /// `fut` 内部（含其 `await` 链）可通过 [`OperationContext::current`]
    /// 取到上下文并调度操作；并发的 `enter` 调用彼此隔离，
    /// `tokio::spawn` 出去的子任务不继承上下文。
    pub async fn enter<F>(self: &Arc<Self>, fut: F) -> F::Output
    where
        F: Future,
    {
        self.enter_with(CancellationToken::new(), fut).await
    }

    /// 同 [`enter`](Self::enter)，但携带调用方提供的取消令牌
    ///
    /// 取消是协作式的：调度器在相邻两次处理器调用之间观察令牌，
    /// 已打开的作用域不会被强行展开。
    pub async fn enter_with<F>(self: &Arc<Self>, cancellation: CancellationToken, fut: F) -> F::Output
    where
        F: Future,
    {
        let context = OperationContext::new(Arc::clone(self), cancellation);
        CURRENT
            .scope(context.clone(), async move {
                let _root = context.open_scope();
                fut.await
            })
            .await
    }
}

struct ContextInner {
    operations: Arc<Operations>,
    scopes: Mutex<Vec<Arc<ScopeInner>>>,
    cancellation: CancellationToken,
}

/// 环境操作上下文（逐逻辑流）
#[derive(Clone)]
pub struct OperationContext {
    inner: Arc<ContextInner>,
}

impl OperationContext {
    fn new(operations: Arc<Operations>, cancellation: CancellationToken) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                operations,
                scopes: Mutex::new(Vec::new()),
                cancellation,
            }),
        }
    }

    /// 当前逻辑流的环境上下文；不在任何 `enter` 内时为 `None`
    pub fn current() -> Option<OperationContext> {
        CURRENT.try_with(|ctx| ctx.clone()).ok()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.cancellation
    }

    pub(crate) fn operations(&self) -> &Arc<Operations> {
        &self.inner.operations
    }

    /// 打开一个新作用域并压入环境栈，返回守卫
    pub fn open_scope(&self) -> OperationContextScope {
        let parent = self.current_scope_inner();
        let scope = Arc::new(ScopeInner::new(
            parent,
            Arc::clone(&self.inner.operations),
            self.inner.cancellation.clone(),
        ));
        self.inner
            .scopes
            .lock()
            .expect("scope stack lock poisoned")
            .push(Arc::clone(&scope));
        OperationContextScope::new(self.clone(), ScopeRef::new(scope))
    }

    /// 当前（栈顶）作用域的非持有视图
    pub fn current_scope(&self) -> Option<ScopeRef> {
        self.current_scope_inner().map(ScopeRef::new)
    }

    pub(crate) fn current_scope_inner(&self) -> Option<Arc<ScopeInner>> {
        self.inner
            .scopes
            .lock()
            .expect("scope stack lock poisoned")
            .last()
            .cloned()
    }

    // 守卫 drop 时弹栈；嵌套守卫若被提前遗忘，连同其上的残留一并弹出，
    // 维持栈式纪律。
    pub(crate) fn close_scope(&self, scope: &Arc<ScopeInner>) {
        let mut scopes = self
            .inner
            .scopes
            .lock()
            .expect("scope stack lock poisoned");
        if let Some(pos) = scopes.iter().rposition(|s| Arc::ptr_eq(s, scope)) {
            scopes.truncate(pos);
        }
    }
}
