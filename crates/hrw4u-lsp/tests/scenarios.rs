use hrw4u::Tables;
use hrw4u_lsp::{DocumentStore, Position, completion, diagnostics, hover};

const URI: &str = "file:///tmp/rules.hrw4u";

fn labels(tables: &Tables, store: &DocumentStore, line: u32, character: u32) -> Vec<String> {
    let doc = store.get(URI).unwrap();
    completion(tables, &doc, Position::new(line, character))
        .into_iter()
        .map(|item| item.label)
        .collect()
}

#[test]
fn test_origin_connection_is_section_restricted() {
    let tables = Tables::new();
    let store = DocumentStore::new();

    store.update(URI, "REMAP {\n    outbound.co\n}".to_string());
    let found = labels(&tables, &store, 1, 15);
    assert!(
        !found.iter().any(|l| l.starts_with("outbound.conn.")),
        "{found:?}"
    );
    assert!(found.iter().any(|l| l == "outbound.cookie."), "{found:?}");

    store.update(URI, "SEND_REQUEST {\n    outbound.co\n}".to_string());
    let found = labels(&tables, &store, 1, 15);
    assert!(found.iter().any(|l| l == "outbound.conn.dscp"), "{found:?}");
    assert!(found.iter().any(|l| l == "outbound.conn.mark"), "{found:?}");
}

#[test]
fn test_edit_cycle() {
    let tables = Tables::new();
    let store = DocumentStore::new();

    let doc = store.update(URI, "REMAP {\n    inbound.nope = \"x\";\n}".to_string());
    let found = diagnostics(&tables, &doc);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "unknown symbol 'inbound.nope'");

    let doc = store.update(URI, "REMAP {\n    inbound.req.X-Id = \"x\";\n}".to_string());
    assert!(diagnostics(&tables, &doc).is_empty());
    let markdown = hover(&tables, &doc, Position::new(1, 18)).unwrap().markdown;
    assert_eq!(
        markdown,
        "**X-Id** - HTTP Header\n\n**Maps to:** `%{CLIENT-HEADER:X-Id}`"
    );

    assert!(store.close(URI));
    assert!(store.get(URI).is_none());
    assert!(store.is_empty());
}
