//! Completion candidates for the token being typed.

use crate::docs;
use crate::document::{DocumentState, Position, Range};
use hrw4u::{SectionType, TableEntry, TableKind, Tables};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompletionKind {
    Section,
    Variable,
    Condition,
    Operator,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    /// The directive the label maps to.
    pub detail: String,
    pub documentation: Option<String>,
    /// The partial token the item replaces.
    pub replace: Range,
    pub insert_text: String,
}

/// Candidates for the token before `position`, sorted by label.
pub fn completion(tables: &Tables, doc: &DocumentState, position: Position) -> Vec<CompletionItem> {
    let Some((prefix, start)) = doc.prefix_at(position) else {
        return Vec::new();
    };
    if doc.in_vars(position) {
        return Vec::new();
    }
    let replace = Range::on_line(position.line, start, start + prefix.chars().count());
    let mut items = Candidates::new(&prefix, replace);

    let Some(span) = doc.section_at(position) else {
        for section in SectionType::ALL {
            items.push(
                section.name(),
                CompletionKind::Section,
                section.hook().to_string(),
                Some(section.description()),
                None,
            );
        }
        items.push(
            "VARS",
            CompletionKind::Section,
            "variable declarations".to_string(),
            None,
            None,
        );
        return items.finish();
    };
    let section = span.section;
    let allowed = |entry: &&TableEntry| !entry.alias && section.is_none_or(|s| entry.allowed_in(s));

    for entry in tables.entries(TableKind::Condition).iter().filter(allowed) {
        for label in entry.labels() {
            let detail = condition_detail(tables, entry, &label);
            let doc = label_docs(entry, &label);
            items.push(&label, CompletionKind::Condition, detail, doc, None);
        }
    }
    for entry in tables.entries(TableKind::Operator).iter().filter(allowed) {
        for label in entry.labels() {
            let doc = label_docs(entry, &label);
            items.push(&label, CompletionKind::Operator, entry.target.display(), doc, None);
        }
    }
    for kind in [TableKind::Function, TableKind::StatementFunction] {
        for entry in tables.entries(kind).iter().filter(allowed) {
            let detail = match kind {
                TableKind::Function => format!("%{{{}}}", entry.target.primary()),
                _ => entry.target.display(),
            };
            items.push(
                entry.key,
                CompletionKind::Function,
                detail,
                docs::function(entry.key),
                Some(format!("{}()", entry.key)),
            );
        }
    }
    for var in doc.vars() {
        items.push(&var.name, CompletionKind::Variable, var.ty.clone(), None, None);
    }
    tracing::trace!(prefix = %prefix, section = ?section, "completion");
    items.finish()
}

fn condition_detail(tables: &Tables, entry: &TableEntry, label: &str) -> String {
    if entry.prefix && label == entry.key {
        return format!("%{{{}:...}}", entry.target.primary());
    }
    tables
        .lookup(TableKind::Condition, label)
        .map(|resolved| resolved.condition_ref())
        .unwrap_or_else(|| format!("%{{{}}}", entry.target.primary()))
}

/// Field documentation for `stem.FIELD` labels, namespace documentation for bare stems.
fn label_docs(entry: &TableEntry, label: &str) -> Option<&'static str> {
    if !entry.prefix {
        return None;
    }
    match label.strip_prefix(entry.key).filter(|f| !f.is_empty()) {
        Some(field) => docs::group(entry.suffix?).and_then(|g| docs::field(g, field)),
        None => docs::namespace(entry.key),
    }
}

/// Filters by the typed prefix and merges duplicate labels.
struct Candidates<'p> {
    prefix: &'p str,
    replace: Range,
    items: Vec<CompletionItem>,
    index: HashMap<String, usize>,
}

impl<'p> Candidates<'p> {
    fn new(prefix: &'p str, replace: Range) -> Self {
        Self {
            prefix,
            replace,
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn push(
        &mut self,
        label: &str,
        kind: CompletionKind,
        detail: String,
        documentation: Option<&str>,
        insert_text: Option<String>,
    ) {
        if !label.starts_with(self.prefix) {
            return;
        }
        if let Some(&i) = self.index.get(label) {
            let existing = &mut self.items[i];
            if !existing.detail.split(" | ").any(|d| d == detail) {
                existing.detail.push_str(" | ");
                existing.detail.push_str(&detail);
            }
            if existing.documentation.is_none() {
                existing.documentation = documentation.map(String::from);
            }
            return;
        }
        self.index.insert(label.to_string(), self.items.len());
        self.items.push(CompletionItem {
            label: label.to_string(),
            kind,
            detail,
            documentation: documentation.map(String::from),
            replace: self.replace,
            insert_text: insert_text.unwrap_or_else(|| label.to_string()),
        });
    }

    fn finish(mut self) -> Vec<CompletionItem> {
        self.items.sort_by(|a, b| a.label.cmp(&b.label));
        self.items
    }
}
