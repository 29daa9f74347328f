//! Longest-match lookup of a symbol written in any of its forms.
//!
//! The editor service calls [`match_pattern`] on whatever expression sits
//! under the cursor: a dotted symbol (`inbound.req.X-Foo`), an interpolation
//! (`{now.HOUR}`), a function (`cidr(24, 64)`) or a directive reference
//! (`%{CLIENT-HEADER:X-Foo}`). Namespace families are tried first, in a fixed
//! order, then exact and stem lookups in the tables.

use crate::sections::SectionType;
use crate::tables::{TableKind, Tables};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// A namespace whose fields share documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Family {
    Time,
    Identifier,
    Geo,
    Certificate,
    Connection,
    Header,
    Cookie,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Family::Time => "time",
            Family::Identifier => "identifier",
            Family::Geo => "geo",
            Family::Certificate => "certificate",
            Family::Connection => "connection",
            Family::Header => "header",
            Family::Cookie => "cookie",
        }
    }
}

static FAMILIES: LazyLock<Vec<(Family, Regex)>> = LazyLock::new(|| {
    [
        (Family::Time, r"^now\."),
        (Family::Identifier, r"^id\."),
        (Family::Geo, r"^geo\."),
        (
            Family::Certificate,
            r"^(?:inbound|outbound)\.conn\.(?:client|server)-cert\.(?:(?:SAN|san)\.)?",
        ),
        (Family::Connection, r"^(?:inbound|outbound)\.conn\."),
        (Family::Header, r"^(?:inbound|outbound)\.(?:req|resp)\."),
        (Family::Cookie, r"^(?:inbound|outbound)\.cookie\."),
    ]
    .into_iter()
    .map(|(family, pattern)| (family, Regex::new(pattern).expect("static regex")))
    .collect()
});

static PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^%\{([A-Z0-9_-]+)(?::([^}]*))?\}$").expect("static regex")
});

/// What an expression was matched to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternMatch {
    /// The expression in source spelling.
    pub expr: String,
    /// The matched key or namespace stem.
    pub prefix: String,
    /// Whatever follows a stem.
    pub suffix: Option<String>,
    pub family: Option<Family>,
    /// Table and key of the entry, if one matched.
    pub kind: Option<TableKind>,
    pub key: Option<String>,
    /// Directive the entry produces.
    pub target: Option<String>,
}

impl PatternMatch {
    /// Whether a character offset into `expr` falls in the matched prefix.
    pub fn in_prefix(&self, offset: usize) -> bool {
        offset < self.prefix.chars().count()
    }
}

/// Match `expr` outside any particular section.
pub fn match_pattern(tables: &Tables, expr: &str) -> Option<PatternMatch> {
    match_pattern_in(tables, expr, None)
}

/// Match `expr` as read in `section`, which settles directive references
/// such as `%{HEADER:X}` whose meaning depends on the section.
pub fn match_pattern_in(
    tables: &Tables,
    expr: &str,
    section: Option<SectionType>,
) -> Option<PatternMatch> {
    let expr = expr.trim();
    let expr = expr
        .strip_prefix('{')
        .and_then(|e| e.strip_suffix('}'))
        .unwrap_or(expr);
    if expr.is_empty() {
        return None;
    }
    if let Some(caps) = PERCENT.captures(expr) {
        let symbol = from_directive(tables, &caps[1], caps.get(2).map(|m| m.as_str()), section)?;
        return match_symbol(tables, &symbol);
    }
    let symbol = match expr.find('(') {
        Some(open) => &expr[..open],
        None => expr,
    };
    match_symbol(tables, symbol)
}

fn from_directive(
    tables: &Tables,
    tag: &str,
    arg: Option<&str>,
    section: Option<SectionType>,
) -> Option<String> {
    let reverse = tables.reverse();
    if let Some(name) = reverse.function(tag) {
        return Some(name.to_string());
    }
    let section = section.unwrap_or(SectionType::Remap);
    let hit = reverse.condition(tag, arg, section)?;
    let entry = tables.entry(TableKind::Condition, hit.key)?;
    Some(entry.surface(hit.suffix.as_deref()))
}

fn is_exact_key(tables: &Tables, symbol: &str) -> bool {
    TableKind::ALL
        .into_iter()
        .any(|kind| tables.entry(kind, symbol).is_some_and(|e| !e.prefix))
}

fn match_symbol(tables: &Tables, symbol: &str) -> Option<PatternMatch> {
    if !is_exact_key(tables, symbol)
        && let Some(found) = match_family(tables, symbol)
    {
        return Some(found);
    }
    match_table(tables, symbol)
}

fn match_family(tables: &Tables, symbol: &str) -> Option<PatternMatch> {
    let (family, stem) = FAMILIES
        .iter()
        .find_map(|(family, re)| re.find(symbol).map(|m| (*family, m.as_str())))?;
    let suffix = &symbol[stem.len()..];
    let mut found = PatternMatch {
        expr: symbol.to_string(),
        prefix: stem.to_string(),
        suffix: (!suffix.is_empty()).then(|| suffix.to_string()),
        family: Some(family),
        kind: None,
        key: None,
        target: None,
    };
    if let Some((kind, key, target)) = entry_for(tables, symbol) {
        found.kind = Some(kind);
        found.key = Some(key);
        found.target = Some(target);
    }
    Some(found)
}

fn match_table(tables: &Tables, symbol: &str) -> Option<PatternMatch> {
    let (kind, key, target) = entry_for(tables, symbol)?;
    let suffix = symbol
        .strip_prefix(key.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from);
    Some(PatternMatch {
        expr: symbol.to_string(),
        prefix: key.clone(),
        suffix,
        family: None,
        kind: Some(kind),
        key: Some(key),
        target: Some(target),
    })
}

/// Exact keys first, then stems; conditions, then operators, then functions.
fn entry_for(tables: &Tables, symbol: &str) -> Option<(TableKind, String, String)> {
    const ORDER: [TableKind; 4] = [
        TableKind::Condition,
        TableKind::Operator,
        TableKind::Function,
        TableKind::StatementFunction,
    ];
    let exact = ORDER.into_iter().find_map(|kind| {
        tables
            .entry(kind, symbol)
            .filter(|e| !e.prefix)
            .and_then(|_| tables.lookup(kind, symbol))
            .map(|resolved| (kind, resolved))
    });
    let (kind, resolved) = exact.or_else(|| {
        ORDER
            .into_iter()
            .find_map(|kind| tables.lookup(kind, symbol).map(|resolved| (kind, resolved)))
    })?;
    let target = match kind {
        TableKind::Condition | TableKind::Function => resolved.condition_ref(),
        TableKind::Operator | TableKind::StatementFunction => resolved.entry.target.display(),
    };
    Some((kind, resolved.entry.key.to_string(), target))
}
