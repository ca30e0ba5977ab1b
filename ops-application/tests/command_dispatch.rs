use async_trait::async_trait;
use ops_application::command_handler::{
    CommandHandler, CommandOutcome, PostCommandHandler, PreCommandHandler,
};
use ops_application::context::Operations;
use ops_application::dispatch::{DispatchCommand, DispatchQuery, EmitEvent};
use ops_application::error::{OperationError, OperationErrorKind, OperationResult};
use ops_application::event_handler::OnSuccessHandler;
use ops_application::query_handler::QueryHandler;
use ops_application::registry::HandlerRegistry;
use ops_domain::command::Command;
use ops_domain::internal_event::SharedEvent;
use ops_macros::{command, internal_event, query};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// 调用痕迹：按发生顺序记录各处理器的执行
#[derive(Clone, Default)]
struct Trace {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Trace {
    fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

#[command(output = u64)]
#[derive(Debug)]
struct CreateDocument {
    title: String,
}

#[internal_event]
#[derive(Debug, Clone)]
struct DocumentCreated {
    document_id: u64,
}

struct NoopPre {
    trace: Trace,
}

#[async_trait]
impl PreCommandHandler<CreateDocument> for NoopPre {
    async fn handle(&self, _cmd: &CreateDocument) -> OperationResult<()> {
        self.trace.push("pre");
        Ok(())
    }
}

struct FailingPre {
    trace: Trace,
}

#[async_trait]
impl PreCommandHandler<CreateDocument> for FailingPre {
    async fn handle(&self, _cmd: &CreateDocument) -> OperationResult<()> {
        self.trace.push("pre_fail");
        Err(OperationError::handler(anyhow::anyhow!("pre rejected")))
    }
}

struct CreateDocumentHandler {
    trace: Trace,
    document_id: u64,
}

#[async_trait]
impl CommandHandler<CreateDocument> for CreateDocumentHandler {
    async fn handle(&self, cmd: &CreateDocument) -> OperationResult<u64> {
        self.trace.push(format!("handler:{}", self.document_id));
        DocumentCreated::new(self.document_id).emit().await?;
        cmd.context().insert("document_id", self.document_id);
        Ok(self.document_id)
    }
}

struct FailingHandler {
    trace: Trace,
}

#[async_trait]
impl CommandHandler<CreateDocument> for FailingHandler {
    async fn handle(&self, _cmd: &CreateDocument) -> OperationResult<u64> {
        self.trace.push("handler_fail");
        DocumentCreated::new(99).emit().await?;
        Err(OperationError::handler(anyhow::anyhow!("storage rejected")))
    }
}

struct DocumentCreatedOnSuccess {
    trace: Trace,
}

#[async_trait]
impl OnSuccessHandler<DocumentCreated> for DocumentCreatedOnSuccess {
    async fn handle(&self, event: &DocumentCreated) -> OperationResult<()> {
        self.trace.push(format!("on_success:{}", event.document_id));
        Ok(())
    }
}

struct RecordingPost {
    trace: Trace,
}

#[async_trait]
impl PostCommandHandler<CreateDocument> for RecordingPost {
    async fn handle(
        &self,
        cmd: &CreateDocument,
        events: &[SharedEvent],
        outcome: CommandOutcome<'_, u64>,
    ) -> OperationResult<()> {
        let from_context = cmd
            .context()
            .get::<u64>("document_id")
            .map(|v| *v)
            .unwrap_or(0);
        match outcome {
            Ok(result) => self.trace.push(format!(
                "post:events={}:ctx={}:ok={}",
                events.len(),
                from_context,
                result
            )),
            Err(err) => self.trace.push(format!(
                "post:events={}:err={}",
                events.len(),
                err
            )),
        }
        Ok(())
    }
}

struct FailingPost {
    trace: Trace,
}

#[async_trait]
impl PostCommandHandler<CreateDocument> for FailingPost {
    async fn handle(
        &self,
        _cmd: &CreateDocument,
        _events: &[SharedEvent],
        _outcome: CommandOutcome<'_, u64>,
    ) -> OperationResult<()> {
        self.trace.push("post_fail");
        Err(OperationError::handler(anyhow::anyhow!("post exploded")))
    }
}

fn runtime(registry: HandlerRegistry) -> Arc<Operations> {
    Arc::new(Operations::builder().registry(registry).build())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn successful_dispatch_runs_phases_in_order() {
    let trace = Trace::default();
    let registry = HandlerRegistry::new();
    registry.register_pre_command::<CreateDocument, _>(Arc::new(NoopPre {
        trace: trace.clone(),
    }));
    registry.register_command::<CreateDocument, _>(Arc::new(CreateDocumentHandler {
        trace: trace.clone(),
        document_id: 7,
    }));
    registry.register_on_success::<DocumentCreated, _>(Arc::new(DocumentCreatedOnSuccess {
        trace: trace.clone(),
    }));
    registry.register_post_command::<CreateDocument, _>(Arc::new(RecordingPost {
        trace: trace.clone(),
    }));

    let ops = runtime(registry);
    let result = ops
        .enter(async { CreateDocument::new("minutes".to_string()).dispatch().await })
        .await
        .unwrap();

    assert_eq!(result, Some(7));
    assert_eq!(
        trace.entries(),
        vec![
            "pre",
            "handler:7",
            "on_success:7",
            "post:events=1:ctx=7:ok=7"
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_handler_notifies_post_and_rethrows() {
    let trace = Trace::default();
    let registry = HandlerRegistry::new();
    registry.register_command::<CreateDocument, _>(Arc::new(FailingHandler {
        trace: trace.clone(),
    }));
    registry.register_post_command::<CreateDocument, _>(Arc::new(RecordingPost {
        trace: trace.clone(),
    }));

    let ops = runtime(registry);
    let err = ops
        .enter(async { CreateDocument::new("minutes".to_string()).dispatch().await })
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), OperationErrorKind::Handler(_)));
    assert!(err.is_logged());
    assert_eq!(
        trace.entries(),
        vec!["handler_fail", "post:events=1:err=handler: storage rejected"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn post_handler_failure_does_not_mask_outcome() {
    let trace = Trace::default();
    let registry = HandlerRegistry::new();
    registry.register_command::<CreateDocument, _>(Arc::new(FailingHandler {
        trace: trace.clone(),
    }));
    registry.register_post_command::<CreateDocument, _>(Arc::new(FailingPost {
        trace: trace.clone(),
    }));

    let ops = runtime(registry);
    let err = ops
        .enter(async { CreateDocument::new("minutes".to_string()).dispatch().await })
        .await
        .unwrap_err();

    // 原始失败原样传播，后置处理器的失败被吞掉
    match err.kind() {
        OperationErrorKind::Handler(source) => {
            assert!(source.to_string().contains("storage rejected"));
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
    assert_eq!(trace.entries(), vec!["handler_fail", "post_fail"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn post_handler_failure_does_not_fail_successful_command() {
    let trace = Trace::default();
    let registry = HandlerRegistry::new();
    registry.register_command::<CreateDocument, _>(Arc::new(CreateDocumentHandler {
        trace: trace.clone(),
        document_id: 7,
    }));
    registry.register_post_command::<CreateDocument, _>(Arc::new(FailingPost {
        trace: trace.clone(),
    }));

    let ops = runtime(registry);
    let result = ops
        .enter(async { CreateDocument::new("minutes".to_string()).dispatch().await })
        .await
        .unwrap();

    assert_eq!(result, Some(7));
    assert_eq!(trace.entries(), vec!["handler:7", "post_fail"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pre_failure_skips_main_and_post_handlers() {
    let trace = Trace::default();
    let registry = HandlerRegistry::new();
    registry.register_pre_command::<CreateDocument, _>(Arc::new(FailingPre {
        trace: trace.clone(),
    }));
    registry.register_pre_command::<CreateDocument, _>(Arc::new(NoopPre {
        trace: trace.clone(),
    }));
    registry.register_command::<CreateDocument, _>(Arc::new(CreateDocumentHandler {
        trace: trace.clone(),
        document_id: 7,
    }));
    registry.register_post_command::<CreateDocument, _>(Arc::new(RecordingPost {
        trace: trace.clone(),
    }));

    let ops = runtime(registry);
    let err = ops
        .enter(async { CreateDocument::new("minutes".to_string()).dispatch().await })
        .await
        .unwrap_err();

    assert!(err.is_logged());
    // 后续前置、主处理器与后置处理器全部跳过
    assert_eq!(trace.entries(), vec!["pre_fail"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn all_main_handlers_run_and_last_result_wins() {
    let trace = Trace::default();
    let registry = HandlerRegistry::new();
    registry.register_command::<CreateDocument, _>(Arc::new(CreateDocumentHandler {
        trace: trace.clone(),
        document_id: 1,
    }));
    registry.register_command::<CreateDocument, _>(Arc::new(CreateDocumentHandler {
        trace: trace.clone(),
        document_id: 2,
    }));
    registry.register_post_command::<CreateDocument, _>(Arc::new(RecordingPost {
        trace: trace.clone(),
    }));

    let ops = runtime(registry);
    let result = ops
        .enter(async { CreateDocument::new("minutes".to_string()).dispatch().await })
        .await
        .unwrap();

    assert_eq!(result, Some(2));
    // 每个主处理器各有一轮后置通知，各自只带自己作用域里的事件；
    // 第二轮读到的上下文数据已被第二个处理器覆盖
    assert_eq!(
        trace.entries(),
        vec![
            "handler:1",
            "post:events=1:ctx=1:ok=1",
            "handler:2",
            "post:events=1:ctx=2:ok=2"
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dispatch_without_scope_is_a_noop() {
    let trace = Trace::default();
    let registry = HandlerRegistry::new();
    registry.register_command::<CreateDocument, _>(Arc::new(CreateDocumentHandler {
        trace: trace.clone(),
        document_id: 7,
    }));
    let _ops = runtime(registry);

    // 不经过 enter：没有环境上下文，也就没有激活的作用域
    let result = CreateDocument::new("minutes".to_string())
        .dispatch()
        .await
        .unwrap();

    assert_eq!(result, None);
    assert!(trace.entries().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dispatch_without_registered_handler_returns_none() {
    let ops = runtime(HandlerRegistry::new());
    let result = ops
        .enter(async { CreateDocument::new("minutes".to_string()).dispatch().await })
        .await
        .unwrap();

    assert_eq!(result, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_token_aborts_dispatch_before_handlers() {
    let trace = Trace::default();
    let registry = HandlerRegistry::new();
    registry.register_command::<CreateDocument, _>(Arc::new(CreateDocumentHandler {
        trace: trace.clone(),
        document_id: 7,
    }));

    let token = CancellationToken::new();
    token.cancel();

    let ops = runtime(registry);
    let err = ops
        .enter_with(token, async {
            CreateDocument::new("minutes".to_string()).dispatch().await
        })
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), OperationErrorKind::Cancelled));
    assert!(trace.entries().is_empty());
}

#[query(output = u64)]
#[derive(Debug)]
struct CountDocuments {
    owner: String,
}

struct FixedCount {
    value: u64,
}

#[async_trait]
impl QueryHandler<CountDocuments> for FixedCount {
    async fn handle(&self, _query: &CountDocuments) -> OperationResult<u64> {
        Ok(self.value)
    }
}

struct FailingCount;

#[async_trait]
impl QueryHandler<CountDocuments> for FailingCount {
    async fn handle(&self, _query: &CountDocuments) -> OperationResult<u64> {
        Err(OperationError::handler(anyhow::anyhow!("projection down")))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn query_last_handler_result_wins() {
    let registry = HandlerRegistry::new();
    registry.register_query::<CountDocuments, _>(Arc::new(FixedCount { value: 3 }));
    registry.register_query::<CountDocuments, _>(Arc::new(FixedCount { value: 5 }));

    let ops = runtime(registry);
    let result = ops
        .enter(async {
            CountDocuments::new("alice".to_string())
                .dispatch()
                .await
        })
        .await
        .unwrap();

    assert_eq!(result, Some(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn query_failure_rethrows_immediately() {
    let registry = HandlerRegistry::new();
    registry.register_query::<CountDocuments, _>(Arc::new(FailingCount));
    registry.register_query::<CountDocuments, _>(Arc::new(FixedCount { value: 5 }));

    let ops = runtime(registry);
    let err = ops
        .enter(async {
            CountDocuments::new("alice".to_string())
                .dispatch()
                .await
        })
        .await
        .unwrap_err();

    assert!(err.is_logged());
    assert!(matches!(err.kind(), OperationErrorKind::Handler(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn query_without_scope_is_a_noop() {
    let result = CountDocuments::new("alice".to_string())
        .dispatch()
        .await
        .unwrap();
    assert_eq!(result, None);
}
