use async_trait::async_trait;
use ops_application::command_handler::{
    CommandHandler, CommandOutcome, PostCommandHandler, PreCommandHandler,
};
use ops_application::context::Operations;
use ops_application::dispatch::{DispatchCommand, DispatchQuery, EmitEvent};
use ops_application::error::{OperationError, OperationResult};
use ops_application::event_handler::{OnEmissionHandler, OnSuccessHandler};
use ops_application::query_handler::QueryHandler;
use ops_application::registry::HandlerRegistry;
use ops_domain::command::Command;
use ops_domain::internal_event::SharedEvent;
use ops_macros::{command, internal_event, query};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[command(output = u64)]
#[derive(Debug)]
struct CreateDocument {
    title: String,
}

#[query(output = usize)]
#[derive(Debug)]
struct CountDocuments {}

#[internal_event]
#[derive(Debug, Clone)]
struct DocumentCreated {
    document_id: u64,
    title: String,
}

#[derive(Default, Clone)]
struct DocumentStore {
    next_id: Arc<AtomicU64>,
    inner: Arc<Mutex<HashMap<u64, String>>>,
}

struct ValidateTitle;

#[async_trait]
impl PreCommandHandler<CreateDocument> for ValidateTitle {
    async fn handle(&self, cmd: &CreateDocument) -> OperationResult<()> {
        if cmd.title.trim().is_empty() {
            return Err(OperationError::handler(anyhow::anyhow!(
                "document title must not be empty"
            )));
        }
        Ok(())
    }
}

struct CreateDocumentHandler {
    store: DocumentStore,
}

#[async_trait]
impl CommandHandler<CreateDocument> for CreateDocumentHandler {
    async fn handle(&self, cmd: &CreateDocument) -> OperationResult<u64> {
        let document_id = self.store.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.store
            .inner
            .lock()
            .expect("document store lock poisoned")
            .insert(document_id, cmd.title.clone());

        DocumentCreated::new(document_id, cmd.title.clone())
            .emit()
            .await?;
        cmd.context().insert("document_id", document_id);

        Ok(document_id)
    }
}

struct AuditGate;

#[async_trait]
impl OnEmissionHandler<DocumentCreated> for AuditGate {
    async fn handle(&self, event: &DocumentCreated) -> OperationResult<()> {
        tracing::info!(document_id = event.document_id, "document creation audited");
        Ok(())
    }
}

struct IndexDocument;

#[async_trait]
impl OnSuccessHandler<DocumentCreated> for IndexDocument {
    async fn handle(&self, event: &DocumentCreated) -> OperationResult<()> {
        tracing::info!(
            document_id = event.document_id,
            title = %event.title,
            "document indexed"
        );
        Ok(())
    }
}

struct SummarizeCreation;

#[async_trait]
impl PostCommandHandler<CreateDocument> for SummarizeCreation {
    async fn handle(
        &self,
        cmd: &CreateDocument,
        events: &[SharedEvent],
        outcome: CommandOutcome<'_, u64>,
    ) -> OperationResult<()> {
        let document_id = cmd.context().get::<u64>("document_id");
        match outcome {
            Ok(result) => tracing::info!(
                title = %cmd.title,
                result = *result,
                events = events.len(),
                context_id = document_id.map(|v| *v),
                "document creation finished"
            ),
            Err(err) => tracing::warn!(
                title = %cmd.title,
                events = events.len(),
                error = %err,
                "document creation failed"
            ),
        }
        Ok(())
    }
}

struct CountDocumentsHandler {
    store: DocumentStore,
}

#[async_trait]
impl QueryHandler<CountDocuments> for CountDocumentsHandler {
    async fn handle(&self, _query: &CountDocuments) -> OperationResult<usize> {
        Ok(self
            .store
            .inner
            .lock()
            .expect("document store lock poisoned")
            .len())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demo=info,ops_application=debug".into()),
        )
        .init();

    let store = DocumentStore::default();

    let registry = HandlerRegistry::new();
    registry.register_pre_command::<CreateDocument, _>(Arc::new(ValidateTitle));
    registry.register_command::<CreateDocument, _>(Arc::new(CreateDocumentHandler {
        store: store.clone(),
    }));
    registry.register_post_command::<CreateDocument, _>(Arc::new(SummarizeCreation));
    registry.register_on_emission::<DocumentCreated, _>(Arc::new(AuditGate));
    registry.register_on_success::<DocumentCreated, _>(Arc::new(IndexDocument));
    registry.register_query::<CountDocuments, _>(Arc::new(CountDocumentsHandler {
        store: store.clone(),
    }));

    let ops = Arc::new(Operations::builder().registry(registry).build());

    ops.enter(async {
        // 建档
        let id = CreateDocument::new("meeting minutes".to_string())
            .dispatch()
            .await
            .unwrap();
        println!("created: {id:?}");

        let id = CreateDocument::new("quarterly report".to_string())
            .dispatch()
            .await
            .unwrap();
        println!("created: {id:?}");

        // 空标题被前置校验拒绝
        let rejected = CreateDocument::new("   ".to_string()).dispatch().await;
        println!("rejected: {}", rejected.is_err());

        // 检索
        let count = CountDocuments::new().dispatch().await.unwrap();
        println!("documents: {count:?}");
    })
    .await;
}
