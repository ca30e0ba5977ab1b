use ops_macros::query;

#[query(output = Option<String>)]
#[derive(Debug)]
struct FindDocumentTitle {
    document_id: u64,
}

fn assert_query<Q>(_q: &Q)
where
    Q: ops_domain::query::Query<Output = Option<String>>,
{
}

fn main() {
    let q = FindDocumentTitle::new(7);
    assert_eq!(q.document_id, 7);
    assert_query(&q);
}
