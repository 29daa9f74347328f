//! hrw4u language server.
//!
//! Speaks LSP over stdio. Logs go to stderr, filtered by `RUST_LOG`.
//!
//! # Features
//!
//! - **Diagnostics**: syntax errors, unknown sections and symbols, variable errors
//! - **Hover**: sections, variables, functions, namespaces and fields
//! - **Completion**: table symbols, functions and variables, filtered by section

use hrw4u::Tables;
use hrw4u_lsp::{DocumentStore, completion, diagnostics, hover};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

struct Backend {
    client: Client,
    tables: Tables,
    documents: DocumentStore,
}

impl Backend {
    /// Replace the document state and republish its diagnostics.
    async fn refresh(&self, uri: Url, text: String) {
        let doc = self.documents.update(uri.as_str(), text);
        let diagnostics = diagnostics(&self.tables, &doc)
            .into_iter()
            .map(|d| Diagnostic {
                range: to_lsp_range(d.range),
                severity: Some(DiagnosticSeverity::ERROR),
                source: Some("hrw4u".to_string()),
                message: d.message,
                ..Default::default()
            })
            .collect();
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }
}

fn to_lsp_position(position: hrw4u_lsp::Position) -> Position {
    Position::new(position.line, position.character)
}

fn from_lsp_position(position: Position) -> hrw4u_lsp::Position {
    hrw4u_lsp::Position::new(position.line, position.character)
}

fn to_lsp_range(range: hrw4u_lsp::Range) -> Range {
    Range::new(to_lsp_position(range.start), to_lsp_position(range.end))
}

fn completion_kind(kind: hrw4u_lsp::CompletionKind) -> CompletionItemKind {
    match kind {
        hrw4u_lsp::CompletionKind::Section => CompletionItemKind::MODULE,
        hrw4u_lsp::CompletionKind::Variable => CompletionItemKind::VARIABLE,
        hrw4u_lsp::CompletionKind::Condition => CompletionItemKind::FIELD,
        hrw4u_lsp::CompletionKind::Operator => CompletionItemKind::PROPERTY,
        hrw4u_lsp::CompletionKind::Function => CompletionItemKind::FUNCTION,
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "hrw4u-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "hrw4u language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        tracing::debug!(uri = %doc.uri, "opened");
        self.refresh(doc.uri, doc.text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole text.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.refresh(params.text_document.uri, change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.close(uri.as_str());
        tracing::debug!(uri = %uri, open = self.documents.len(), "closed");
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position;
        let Some(doc) = self.documents.get(position.text_document.uri.as_str()) else {
            return Ok(None);
        };
        let items: Vec<CompletionItem> =
            completion(&self.tables, &doc, from_lsp_position(position.position))
                .into_iter()
                .map(|item| CompletionItem {
                    kind: Some(completion_kind(item.kind)),
                    detail: Some(item.detail),
                    documentation: item.documentation.map(|value| {
                        Documentation::MarkupContent(MarkupContent {
                            kind: MarkupKind::Markdown,
                            value,
                        })
                    }),
                    text_edit: Some(CompletionTextEdit::Edit(TextEdit::new(
                        to_lsp_range(item.replace),
                        item.insert_text,
                    ))),
                    label: item.label,
                    ..Default::default()
                })
                .collect();
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params;
        let Some(doc) = self.documents.get(position.text_document.uri.as_str()) else {
            return Ok(None);
        };
        Ok(
            hover(&self.tables, &doc, from_lsp_position(position.position)).map(|found| Hover {
                contents: HoverContents::Markup(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: found.markdown,
                }),
                range: Some(to_lsp_range(found.range)),
            }),
        )
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| Backend {
        client,
        tables: Tables::new(),
        documents: DocumentStore::new(),
    });

    Server::new(stdin, stdout, socket).serve(service).await;
}
