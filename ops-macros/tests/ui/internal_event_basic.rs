use ops_macros::internal_event;

#[internal_event]
#[derive(Debug, Clone)]
struct DocumentCreated {
    document_id: u64,
}

fn assert_event<E>(_e: &E)
where
    E: ops_domain::internal_event::InternalEvent + Clone,
{
}

fn main() {
    let event = DocumentCreated::new(42);
    assert_eq!(event.document_id, 42);
    assert!(!event.meta.was_emitted());
    assert_event(&event);

    use ops_domain::internal_event::InternalEvent;
    assert_eq!(event.event_name(), "DocumentCreated");
}
