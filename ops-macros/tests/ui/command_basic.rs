use ops_macros::command;

#[command(output = u64)]
#[derive(Debug)]
struct CreateDocument {
    title: String,
}

#[command]
#[derive(Debug)]
struct ArchiveDocument {
    document_id: u64,
}

fn assert_command<C>(_c: &C)
where
    C: ops_domain::command::Command,
{
}

fn main() {
    let cmd = CreateDocument::new("hello".to_string());
    assert_eq!(cmd.title, "hello");
    assert_command(&cmd);

    // 无 output 参数时 Output = ()
    let archive = ArchiveDocument::new(42);
    assert_command(&archive);

    // 注入的上下文数据可写可读
    cmd.context.insert("document_id", 7_u64);
    assert_eq!(*cmd.context.get::<u64>("document_id").unwrap(), 7);
}
