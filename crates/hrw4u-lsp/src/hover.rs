//! Hover documentation.

use crate::docs;
use crate::document::{DocumentState, ModifierList, Position, Range, Token};
use hrw4u::{Family, PatternMatch, SectionType, TableKind, Tables};
use regex::Regex;
use serde::Serialize;

/// Markdown for the expression under the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hover {
    pub markdown: String,
    pub range: Range,
}

const KEYWORDS: &[&str] = &[
    "if", "elif", "else", "in", "with", "and", "or", "break", "true", "false", "VARS",
];

pub fn hover(tables: &Tables, doc: &DocumentState, position: Position) -> Option<Hover> {
    if let Some((pattern, range)) = doc.regex_at(position) {
        tracing::trace!(%pattern, "hover regex");
        return Some(Hover {
            markdown: regex(&pattern),
            range,
        });
    }
    if let Some(list) = doc.modifier_at(position) {
        tracing::trace!(modifier = %list.name, "hover modifier");
        return Some(Hover {
            markdown: modifier(&list),
            range: list.range,
        });
    }
    let token = doc.token_at(position)?;
    let section = doc.section_at(position).and_then(|s| s.section);
    let markdown = describe(tables, doc, &token, section)?;
    tracing::trace!(token = %token.text, "hover");
    Some(Hover {
        markdown,
        range: token.range,
    })
}

fn describe(
    tables: &Tables,
    doc: &DocumentState,
    token: &Token,
    section: Option<SectionType>,
) -> Option<String> {
    let text = token.text.as_str();
    if KEYWORDS.contains(&text) {
        return None;
    }
    if !token.percent {
        if let Some(section) = SectionType::from_name(text) {
            return Some(format!(
                "**{}** - HRW4U Section\n\n{}\n\n**Hook:** `{}`",
                section.name(),
                section.description(),
                section.hook()
            ));
        }
        if let Some(var) = doc.variable(text) {
            return Some(format!(
                "**{}** - HRW4U Variable\n\n**Type:** {}\n\n**Declared at:** Line {}",
                var.name,
                var.ty,
                var.range.start.line + 1
            ));
        }
        if let Some(markdown) = function(tables, text) {
            return Some(markdown);
        }
    }
    match doc.matched(tables, text, section) {
        Some(found) => Some(describe_match(tables, &found, token)),
        None if !token.percent && looks_like_symbol(text) => {
            Some(format!("**{text}** - HRW4U symbol"))
        }
        None => None,
    }
}

fn regex(pattern: &str) -> String {
    let mut out = format!(
        "**Regular Expression** - `/{pattern}/`\n\nMatched against the value on the left of `~`."
    );
    let elements: Vec<_> = docs::pattern_elements(pattern)
        .map(|(element, doc)| format!("- `{element}` {doc}"))
        .collect();
    if !elements.is_empty() {
        out.push_str("\n\n**Pattern elements:**\n");
        out.push_str(&elements.join("\n"));
    }
    // Patterns outside the syntax of the regex crate just go without a count.
    if let Ok(re) = Regex::new(pattern)
        && re.captures_len() > 1
    {
        let groups = re.captures_len() - 1;
        let read = match groups {
            1 => "`capture.1`".to_string(),
            n => format!("`capture.1` to `capture.{}`", n.min(9)),
        };
        out.push_str(&format!("\n\n**Capture groups:** {groups}, read back as {read}"));
    }
    out
}

fn modifier(list: &ModifierList) -> String {
    let (table, kind) = if list.statement {
        (docs::OPERATOR_MODIFIERS, "Operator Modifier")
    } else {
        (docs::CONDITION_MODIFIERS, "Condition Modifier")
    };
    let mut out = match docs::modifier(table, &list.name) {
        Some(found) => {
            let mut out = format!("**{}** - {kind}\n\n**{}:** {}", list.name, found.title, found.doc);
            if !found.name.eq_ignore_ascii_case(&list.name) {
                out.push_str(&format!("\n\n**Same as:** `{}`", found.name));
            }
            out
        }
        None => {
            let names: Vec<_> = table.iter().map(|m| m.name).collect();
            format!(
                "**{}** - Unknown {}\n\n**Available modifiers:** {}",
                list.name,
                kind.to_ascii_lowercase(),
                names.join(", ")
            )
        }
    };
    let others: Vec<_> = list
        .all
        .iter()
        .filter(|m| **m != list.name)
        .map(String::as_str)
        .collect();
    if !others.is_empty() {
        out.push_str(&format!("\n\n**Combined with:** {}", others.join(", ")));
    }
    out
}

fn looks_like_symbol(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '@')
}

fn function(tables: &Tables, name: &str) -> Option<String> {
    let (kind, entry) = [TableKind::Function, TableKind::StatementFunction]
        .into_iter()
        .find_map(|kind| tables.entry(kind, name).map(|e| (kind, e)))?;
    let target = match kind {
        TableKind::Function => format!("%{{{}}}", entry.target.primary()),
        _ => entry.target.display(),
    };
    let mut out = format!("**{}()** - HRW4U Function", entry.key);
    if let Some(doc) = docs::function(entry.key) {
        out.push_str("\n\n");
        out.push_str(doc);
    }
    out.push_str(&format!("\n\n**Maps to:** `{target}`"));
    Some(out)
}

fn describe_match(tables: &Tables, found: &PatternMatch, token: &Token) -> String {
    // Directive references have no cursor offset that lines up with `expr`.
    let in_prefix = found.suffix.is_none() || (!token.percent && found.in_prefix(token.offset));
    match found.family {
        Some(_) if in_prefix => namespace(&found.prefix),
        Some(family) => field(family, found),
        None if in_prefix && found.suffix.is_some() && docs::namespace(&found.prefix).is_some() => {
            namespace(&found.prefix)
        }
        None => entry(tables, found),
    }
}

fn namespace(stem: &str) -> String {
    let mut out = format!("**{stem}** - HRW4U Namespace");
    if let Some(doc) = docs::namespace(stem) {
        out.push_str("\n\n");
        out.push_str(doc);
    }
    if let Some(top) = docs::top_level(stem).filter(|top| *top != stem)
        && let Some(doc) = docs::namespace(top)
    {
        out.push_str(&format!("\n\n**{top}** {doc}"));
    }
    out
}

fn field(family: Family, found: &PatternMatch) -> String {
    let name = found.suffix.as_deref().unwrap_or_default();
    let mut out = match family {
        Family::Header if name.starts_with('@') => format!("**{name}** - ATS Internal Header"),
        Family::Header => format!("**{name}** - HTTP Header"),
        Family::Cookie => format!("**{name}** - HTTP Cookie"),
        _ => {
            let group = if family == Family::Certificate
                && found.prefix.to_ascii_lowercase().ends_with("san.")
            {
                "san"
            } else {
                family.name()
            };
            let mut out = format!("**{name}** - {} field", title(family));
            if let Some(doc) = docs::field(group, name) {
                out.push_str("\n\n");
                out.push_str(doc);
            }
            out
        }
    };
    if let Some(target) = &found.target {
        out.push_str(&format!("\n\n**Maps to:** `{target}`"));
    }
    out
}

fn title(family: Family) -> &'static str {
    match family {
        Family::Time => "Time",
        Family::Identifier => "Identifier",
        Family::Geo => "Geo",
        Family::Certificate => "Certificate",
        Family::Connection => "Connection",
        Family::Header => "Header",
        Family::Cookie => "Cookie",
    }
}

fn entry(tables: &Tables, found: &PatternMatch) -> String {
    let (Some(kind), Some(key)) = (found.kind, found.key.as_deref()) else {
        return format!("**{}** - HRW4U symbol", found.expr);
    };
    let entry = tables.entry(kind, key);
    let mut out = format!("**{}** - HRW4U {}", found.expr, kind.label());
    if let (Some(suffix), Some(group)) = (&found.suffix, entry.and_then(|e| e.suffix))
        && let Some(doc) = docs::group(group).and_then(|g| docs::field(g, suffix))
    {
        out.push_str(&format!("\n\n**{suffix}:** {doc}"));
    }
    if let Some(target) = &found.target {
        out.push_str(&format!("\n\n**Maps to:** `{target}`"));
    }
    if let Some(sections) = entry.and_then(|e| e.sections) {
        out.push_str(&format!("\n\n**Restricted in sections:** {sections}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hover_at(text: &str, line: u32, character: u32) -> Option<String> {
        let tables = Tables::new();
        let doc = DocumentState::new(text);
        hover(&tables, &doc, Position::new(line, character)).map(|h| h.markdown)
    }

    #[test]
    fn test_section() {
        insta::assert_snapshot!(hover_at("REMAP {\n}", 0, 2).unwrap(), @r"
        **REMAP** - HRW4U Section

        Runs during remap, as part of a remap.config rule

        **Hook:** `REMAP_PSEUDO_HOOK`
        ");
    }

    #[test]
    fn test_variable() {
        let text = "VARS {\n    seen: bool;\n}\nREMAP {\n    if seen { no-op; }\n}";
        assert_eq!(
            hover_at(text, 4, 8).unwrap(),
            "**seen** - HRW4U Variable\n\n**Type:** bool\n\n**Declared at:** Line 2"
        );
    }

    #[test]
    fn test_functions() {
        let text = "REMAP {\n    if cidr(24, 64) == \"10.0.0.0\" { keep_query(\"a\"); }\n}";
        insta::assert_snapshot!(hover_at(text, 1, 8).unwrap(), @r"
        **cidr()** - HRW4U Function

        Client address masked to the given IPv4 and IPv6 prefix lengths.

        **Maps to:** `%{CIDR}`
        ");
        insta::assert_snapshot!(hover_at(text, 1, 38).unwrap(), @r"
        **keep_query()** - HRW4U Function

        Remove every query parameter except the named ones.

        **Maps to:** `rm-destination QUERY`
        ");
    }

    #[test]
    fn test_namespace_and_field() {
        let text = "REMAP {\n    if inbound.req.X-Foo { }\n}";
        insta::assert_snapshot!(hover_at(text, 1, 9).unwrap(), @r"
        **inbound.req.** - HRW4U Namespace

        Headers of the client request.

        **inbound.** The client side of the transaction: the request as the client sent it and the response the client receives.
        ");
        assert_eq!(
            hover_at(text, 1, 21).unwrap(),
            "**X-Foo** - HTTP Header\n\n**Maps to:** `%{CLIENT-HEADER:X-Foo}`"
        );
    }

    #[test]
    fn test_header_and_cookie_fields() {
        let text = "REMAP {\n    inbound.req.@Internal = \"x\";\n    inbound.cookie.session = \"y\";\n}";
        assert_eq!(
            hover_at(text, 1, 18).unwrap(),
            "**@Internal** - ATS Internal Header\n\n**Maps to:** `%{CLIENT-HEADER:@Internal}`"
        );
        assert_eq!(
            hover_at(text, 2, 20).unwrap(),
            "**session** - HTTP Cookie\n\n**Maps to:** `%{COOKIE:session}`"
        );
    }

    #[test]
    fn test_time_field() {
        let text = "REMAP {\n    if now.HOUR > 5 { }\n}";
        insta::assert_snapshot!(hover_at(text, 1, 12).unwrap(), @r"
        **HOUR** - Time field

        Hour of the day, 0 to 23.

        **Maps to:** `%{NOW:HOUR}`
        ");
    }

    #[test]
    fn test_table_entries() {
        let text = "SEND_REQUEST {\n    outbound.conn.dscp = 8;\n    if inbound.ip { }\n}";
        insta::assert_snapshot!(hover_at(text, 1, 6).unwrap(), @r"
        **outbound.conn.dscp** - HRW4U Operator

        **Maps to:** `set-conn-dscp`

        **Restricted in sections:** SEND_REQUEST, READ_RESPONSE
        ");
        assert_eq!(
            hover_at(text, 2, 10).unwrap(),
            "**inbound.ip** - HRW4U Condition\n\n**Maps to:** `%{IP:CLIENT}`"
        );
    }

    #[test]
    fn test_url_field_and_namespace() {
        let text = "REMAP {\n    if inbound.url.path ~ /x/ { }\n}";
        insta::assert_snapshot!(hover_at(text, 1, 21).unwrap(), @r"
        **inbound.url.path** - HRW4U Condition

        **path:** Path, without the leading slash.

        **Maps to:** `%{CLIENT-URL:PATH}`

        **Restricted in sections:** PRE_REMAP, REMAP, READ_REQUEST, SEND_REQUEST, READ_RESPONSE, SEND_RESPONSE
        ");
        assert!(
            hover_at(text, 1, 10)
                .unwrap()
                .starts_with("**inbound.url.** - HRW4U Namespace\n\nParts of the client request URL.")
        );
    }

    #[test]
    fn test_directive_reference() {
        let text = "SEND_RESPONSE {\n    inbound.resp.X = \"%{CLIENT-HEADER:Host}\";\n}";
        assert_eq!(
            hover_at(text, 1, 25).unwrap(),
            "**Host** - HTTP Header\n\n**Maps to:** `%{CLIENT-HEADER:Host}`"
        );
    }

    #[test]
    fn test_regex() {
        let text = "REMAP {\n    if inbound.url.path ~ /^\\/api\\/(v\\d+)/ with NOCASE,PRE { }\n}";
        insta::assert_snapshot!(hover_at(text, 1, 30).unwrap(), @r"
        **Regular Expression** - `/^\/api\/(v\d+)/`

        Matched against the value on the left of `~`.

        **Pattern elements:**
        - `^` start of the value
        - `\d` a digit
        - `+` one or more

        **Capture groups:** 1, read back as `capture.1`
        ");
        let tables = Tables::new();
        let doc = DocumentState::new(text);
        let found = hover(&tables, &doc, Position::new(1, 26)).unwrap();
        assert_eq!(found.range, Range::on_line(1, 26, 42));
    }

    #[test]
    fn test_modifiers() {
        let text = "REMAP {\n    if inbound.url.path ~ /^\\/api\\/(v\\d+)/ with NOCASE,PRE { }\n}";
        insta::assert_snapshot!(hover_at(text, 1, 50).unwrap(), @r"
        **NOCASE** - Condition Modifier

        **Case Insensitive Matching:** Compare without regard to letter case.

        **Combined with:** PRE
        ");

        let text = "REMAP {\n    set-redirect(302, \"/x\") with QSA;\n}";
        assert_eq!(
            hover_at(text, 1, 34).unwrap(),
            "**QSA** - Operator Modifier\n\n**Query String Append:** Keep the original query string when setting a destination or redirect."
        );

        let text = "REMAP {\n    if inbound.method == \"GET\" with LOUD,nc { }\n}";
        insta::assert_snapshot!(hover_at(text, 1, 37).unwrap(), @r"
        **LOUD** - Unknown condition modifier

        **Available modifiers:** NOCASE, EXT, PRE, SUF, MID

        **Combined with:** nc
        ");
        insta::assert_snapshot!(hover_at(text, 1, 42).unwrap(), @r"
        **nc** - Condition Modifier

        **Case Insensitive Matching:** Compare without regard to letter case.

        **Same as:** `NOCASE`

        **Combined with:** LOUD
        ");
    }

    #[test]
    fn test_nothing_to_say() {
        let text = "REMAP {\n    if banana { x = 42; }\n}";
        assert_eq!(hover_at(text, 1, 5), None);
        assert_eq!(hover_at(text, 1, 1), None);
        assert_eq!(hover_at(text, 1, 22), None);
        assert_eq!(hover_at(text, 9, 0), None);
        assert_eq!(hover_at(text, 1, 9).unwrap(), "**banana** - HRW4U symbol");
    }
}
