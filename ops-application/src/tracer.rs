//! 追踪协议（Tracer）
//!
//! 调度核心按"每次操作一个跨度、每次处理器调用一个跨度"的粒度开启跨度，
//! 仅度量耗时，不施加超时。默认实现落在 `tracing` 上；
//! 宿主可注入自己的实现以对接外部追踪系统。
//!
use std::time::{Duration, Instant};

/// 跨度类别
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanKind {
    Command,
    Query,
    InternalEvent,
    Handler,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Command => "command",
            SpanKind::Query => "query",
            SpanKind::InternalEvent => "internal_event",
            SpanKind::Handler => "handler",
        }
    }
}

/// 追踪跨度：随 drop 关闭，期间可随时读取已流逝时长
pub trait OperationSpan: Send {
    fn duration(&self) -> Duration;
}

/// 追踪服务
pub trait Tracer: Send + Sync {
    fn open_span(&self, name: &str, kind: SpanKind) -> Box<dyn OperationSpan>;
}

/// 基于 `tracing` 的默认实现
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTracer;

struct TracingSpan {
    _span: tracing::Span,
    started: Instant,
}

impl OperationSpan for TracingSpan {
    fn duration(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Tracer for TracingTracer {
    fn open_span(&self, name: &str, kind: SpanKind) -> Box<dyn OperationSpan> {
        let span = tracing::debug_span!("operation", name = %name, kind = kind.as_str());
        Box::new(TracingSpan {
            _span: span,
            started: Instant::now(),
        })
    }
}
