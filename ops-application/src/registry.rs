//! 处理器注册表（HandlerRegistry）
//!
//! 以操作的 `TypeId` 为键维护各类别处理器集合：
//! - 命令三段（前置/主/后置）与查询以"装箱的 trait 对象"存放，
//!   调度入口静态已知具体类型，解析时按类型还原；
//! - 内部事件三相（发布/成功/失败）以类型擦除的异步闭包存放，
//!   因为事件在管线中仅以 `Arc<dyn InternalEvent>` 流转，
//!   需在调用点按运行时类型还原。
//!
//! 同一键下的处理器按注册顺序保存与解析；未注册返回空集合，不视为错误。
//!
use crate::command_handler::{CommandHandler, PostCommandHandler, PreCommandHandler};
use crate::error::OperationResult;
use crate::event_handler::{OnEmissionHandler, OnFailureHandler, OnSuccessHandler};
use crate::query_handler::QueryHandler;
use dashmap::DashMap;
use ops_domain::command::Command;
use ops_domain::error::DomainError;
use ops_domain::internal_event::{InternalEvent, SharedEvent};
use ops_domain::query::Query;
use std::any::{Any, TypeId, type_name};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 发布/成功两相的事件处理闭包
pub(crate) type EventHandlerFn =
    Arc<dyn Fn(SharedEvent) -> BoxFuture<'static, OperationResult<()>> + Send + Sync>;

/// 失败相的事件处理闭包（额外借入导致失败的错误）
pub(crate) type EventFailureHandlerFn = Arc<
    dyn for<'a> Fn(SharedEvent, &'a crate::error::OperationError) -> BoxFuture<'a, OperationResult<()>>
        + Send
        + Sync,
>;

/// 注册条目：处理器类型名 + 装箱的 trait 对象
struct RegisteredHandler {
    name: &'static str,
    handler: Box<dyn Any + Send + Sync>,
}

/// 处理器注册表
#[derive(Default)]
pub struct HandlerRegistry {
    pre_command: DashMap<TypeId, Vec<RegisteredHandler>>,
    command: DashMap<TypeId, Vec<RegisteredHandler>>,
    post_command: DashMap<TypeId, Vec<RegisteredHandler>>,
    query: DashMap<TypeId, Vec<RegisteredHandler>>,
    on_emission: DashMap<TypeId, Vec<(&'static str, EventHandlerFn)>>,
    on_success: DashMap<TypeId, Vec<(&'static str, EventHandlerFn)>>,
    on_failure: DashMap<TypeId, Vec<(&'static str, EventFailureHandlerFn)>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册前置命令处理器
    pub fn register_pre_command<C, H>(&self, handler: Arc<H>)
    where
        C: Command,
        H: PreCommandHandler<C> + 'static,
    {
        let erased: Arc<dyn PreCommandHandler<C>> = handler;
        self.pre_command
            .entry(TypeId::of::<C>())
            .or_default()
            .push(RegisteredHandler {
                name: type_name::<H>(),
                handler: Box::new(erased),
            });
    }

    /// 注册主命令处理器
    pub fn register_command<C, H>(&self, handler: Arc<H>)
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let erased: Arc<dyn CommandHandler<C>> = handler;
        self.command
            .entry(TypeId::of::<C>())
            .or_default()
            .push(RegisteredHandler {
                name: type_name::<H>(),
                handler: Box::new(erased),
            });
    }

    /// 注册后置命令处理器
    pub fn register_post_command<C, H>(&self, handler: Arc<H>)
    where
        C: Command,
        H: PostCommandHandler<C> + 'static,
    {
        let erased: Arc<dyn PostCommandHandler<C>> = handler;
        self.post_command
            .entry(TypeId::of::<C>())
            .or_default()
            .push(RegisteredHandler {
                name: type_name::<H>(),
                handler: Box::new(erased),
            });
    }

    /// 注册查询处理器
    pub fn register_query<Q, H>(&self, handler: Arc<H>)
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let erased: Arc<dyn QueryHandler<Q>> = handler;
        self.query
            .entry(TypeId::of::<Q>())
            .or_default()
            .push(RegisteredHandler {
                name: type_name::<H>(),
                handler: Box::new(erased),
            });
    }

    /// 注册发布即时处理器
    pub fn register_on_emission<E, H>(&self, handler: Arc<H>)
    where
        E: InternalEvent,
        H: OnEmissionHandler<E> + 'static,
    {
        let f: EventHandlerFn = Arc::new(move |event| {
            let handler = handler.clone();
            Box::pin(async move {
                match event.as_any().downcast_ref::<E>() {
                    Some(ev) => handler.handle(ev).await,
                    None => Err(DomainError::TypeMismatch {
                        expected: type_name::<E>(),
                        found: event.event_name(),
                    }
                    .into()),
                }
            })
        });
        self.on_emission
            .entry(TypeId::of::<E>())
            .or_default()
            .push((type_name::<H>(), f));
    }

    /// 注册成功后处理器
    pub fn register_on_success<E, H>(&self, handler: Arc<H>)
    where
        E: InternalEvent,
        H: OnSuccessHandler<E> + 'static,
    {
        let f: EventHandlerFn = Arc::new(move |event| {
            let handler = handler.clone();
            Box::pin(async move {
                match event.as_any().downcast_ref::<E>() {
                    Some(ev) => handler.handle(ev).await,
                    None => Err(DomainError::TypeMismatch {
                        expected: type_name::<E>(),
                        found: event.event_name(),
                    }
                    .into()),
                }
            })
        });
        self.on_success
            .entry(TypeId::of::<E>())
            .or_default()
            .push((type_name::<H>(), f));
    }

    /// 注册失败后处理器
    pub fn register_on_failure<E, H>(&self, handler: Arc<H>)
    where
        E: InternalEvent,
        H: OnFailureHandler<E> + 'static,
    {
        let f: EventFailureHandlerFn = Arc::new(move |event, error| {
            let handler = handler.clone();
            Box::pin(async move {
                match event.as_any().downcast_ref::<E>() {
                    Some(ev) => handler.handle(ev, error).await,
                    None => Err(DomainError::TypeMismatch {
                        expected: type_name::<E>(),
                        found: event.event_name(),
                    }
                    .into()),
                }
            })
        });
        self.on_failure
            .entry(TypeId::of::<E>())
            .or_default()
            .push((type_name::<H>(), f));
    }

    pub(crate) fn pre_command_handlers<C: Command>(
        &self,
    ) -> Vec<(&'static str, Arc<dyn PreCommandHandler<C>>)> {
        Self::resolve(&self.pre_command, TypeId::of::<C>())
    }

    pub(crate) fn command_handlers<C: Command>(
        &self,
    ) -> Vec<(&'static str, Arc<dyn CommandHandler<C>>)> {
        Self::resolve(&self.command, TypeId::of::<C>())
    }

    pub(crate) fn post_command_handlers<C: Command>(
        &self,
    ) -> Vec<(&'static str, Arc<dyn PostCommandHandler<C>>)> {
        Self::resolve(&self.post_command, TypeId::of::<C>())
    }

    pub(crate) fn query_handlers<Q: Query>(&self) -> Vec<(&'static str, Arc<dyn QueryHandler<Q>>)> {
        Self::resolve(&self.query, TypeId::of::<Q>())
    }

    pub(crate) fn on_emission_handlers(
        &self,
        event_type: TypeId,
    ) -> Vec<(&'static str, EventHandlerFn)> {
        self.on_emission
            .get(&event_type)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    pub(crate) fn on_success_handlers(
        &self,
        event_type: TypeId,
    ) -> Vec<(&'static str, EventHandlerFn)> {
        self.on_success
            .get(&event_type)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    pub(crate) fn on_failure_handlers(
        &self,
        event_type: TypeId,
    ) -> Vec<(&'static str, EventFailureHandlerFn)> {
        self.on_failure
            .get(&event_type)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    // 从装箱条目中按注册顺序还原出具体类别的处理器集合。
    // 键与值由同一泛型注册方法写入，正常情况下还原不会失败；
    // 还原失败的条目被跳过（视同未注册）。
    fn resolve<T: Clone + 'static>(
        map: &DashMap<TypeId, Vec<RegisteredHandler>>,
        key: TypeId,
    ) -> Vec<(&'static str, T)> {
        map.get(&key)
            .map(|entry| {
                entry
                    .iter()
                    .filter_map(|h| {
                        h.handler
                            .downcast_ref::<T>()
                            .map(|t| (h.name, t.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
