//! Per-document state: section spans, variable declarations and a memo of
//! pattern matches.
//!
//! The scan here is deliberately shallower than the hrw4u reader. It has to
//! work on documents that are being typed and do not parse yet, so it only
//! tracks brace depth, strings, regexes and comments.

use dashmap::DashMap;
use hrw4u::ir::Span;
use hrw4u::{PatternMatch, SectionType, Tables, match_pattern_in};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};

/// Zero-based line and character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Characters `start..end` of one line.
    pub fn on_line(line: u32, start: usize, end: usize) -> Self {
        Self::new(
            Position::new(line, start as u32),
            Position::new(line, end as u32),
        )
    }

    /// `len` characters starting at a 1-based source span.
    pub fn from_span(span: Span, len: usize) -> Self {
        let line = span.line.saturating_sub(1) as u32;
        let start = span.column.saturating_sub(1);
        Self::on_line(line, start, start + len.max(1))
    }
}

/// A top-level `NAME { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSpan {
    pub name: String,
    /// `None` for names that are not hook sections.
    pub section: Option<SectionType>,
    /// Where the name is written.
    pub name_range: Range,
    /// The opening brace.
    pub open: Position,
    /// The closing brace, if the block is closed yet.
    pub close: Option<Position>,
}

impl SectionSpan {
    /// Whether `position` is inside the braces.
    pub fn contains(&self, position: Position) -> bool {
        position > self.open && self.close.is_none_or(|close| position <= close)
    }
}

/// A declaration in the VARS block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VarInfo {
    pub name: String,
    pub ty: String,
    pub slot: Option<usize>,
    pub range: Range,
}

/// What surrounds a column of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lexical {
    Code,
    /// Inside a string literal that opened at this column.
    String(usize),
    Comment,
}

/// The symbol-like text under a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub range: Range,
    /// Cursor offset into `text`, in characters.
    pub offset: usize,
    /// A `%{TAG:ARG}` directive reference.
    pub percent: bool,
}

/// The modifiers after a `with`, and the one under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierList {
    pub name: String,
    pub all: Vec<String>,
    pub range: Range,
    /// Modifies a statement (`... with QSA;`) rather than a comparison.
    pub statement: bool,
}

pub(crate) fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@')
}

static WITH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bwith\s+([A-Za-z]+(?:\s*,\s*[A-Za-z]+)*)").expect("static regex")
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("static regex"));

static DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_@][A-Za-z0-9_.@-]*)\s*:\s*([A-Za-z0-9_]+)(?:\s*@\s*(\d+))?\s*;")
        .expect("static regex")
});

/// Parsed state of one version of a document.
#[derive(Debug)]
pub struct DocumentState {
    text: String,
    sections: Vec<SectionSpan>,
    vars_block: Option<(Position, Option<Position>)>,
    vars: Vec<VarInfo>,
    matches: DashMap<(String, Option<SectionType>), Option<PatternMatch>>,
}

impl DocumentState {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let scan = Scanner::default().run(&text);
        let vars = scan
            .vars_block
            .map(|(open, close)| declarations(&text, open, close))
            .unwrap_or_default();
        tracing::debug!(
            sections = scan.sections.len(),
            vars = vars.len(),
            "scanned document"
        );
        Self {
            text,
            sections: scan.sections,
            vars_block: scan.vars_block,
            vars,
            matches: DashMap::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line(&self, line: u32) -> Option<&str> {
        self.text.lines().nth(line as usize)
    }

    pub fn sections(&self) -> &[SectionSpan] {
        &self.sections
    }

    pub fn vars(&self) -> &[VarInfo] {
        &self.vars
    }

    pub fn variable(&self, name: &str) -> Option<&VarInfo> {
        self.vars.iter().find(|v| v.name == name)
    }

    pub fn section_at(&self, position: Position) -> Option<&SectionSpan> {
        self.sections.iter().find(|s| s.contains(position))
    }

    pub fn in_vars(&self, position: Position) -> bool {
        self.vars_block.is_some_and(|(open, close)| {
            position > open && close.is_none_or(|close| position <= close)
        })
    }

    /// Pattern match for `expr` read in `section`, computed once per document version.
    pub fn matched(
        &self,
        tables: &Tables,
        expr: &str,
        section: Option<SectionType>,
    ) -> Option<PatternMatch> {
        let key = (expr.to_string(), section);
        if let Some(hit) = self.matches.get(&key) {
            return hit.value().clone();
        }
        let found = match_pattern_in(tables, expr, section);
        self.matches.insert(key, found.clone());
        found
    }

    /// The symbol, interpolation or directive reference under `position`.
    pub fn token_at(&self, position: Position) -> Option<Token> {
        let line = self.line(position.line)?;
        let chars: Vec<char> = line.chars().collect();
        let col = position.character as usize;
        if col > chars.len() {
            return None;
        }
        let lexical = lexical_at(&chars, col);
        if lexical == Lexical::Comment {
            return None;
        }
        if let Some((start, end)) = percent_at(&chars, col) {
            return Some(Token {
                text: chars[start..end].iter().collect(),
                range: Range::on_line(position.line, start, end),
                offset: col - start,
                percent: true,
            });
        }

        let at = if chars.get(col).copied().is_some_and(is_symbol_char) {
            col
        } else if col > 0 && is_symbol_char(chars[col - 1]) {
            col - 1
        } else {
            return None;
        };
        let mut start = at;
        while start > 0 && is_symbol_char(chars[start - 1]) {
            start -= 1;
        }
        let mut end = at + 1;
        while end < chars.len() && is_symbol_char(chars[end]) {
            end += 1;
        }
        if let Lexical::String(_) = lexical {
            let braced = start > 0 && chars[start - 1] == '{' && chars.get(end) == Some(&'}');
            if !braced {
                return None;
            }
        }
        Some(Token {
            text: chars[start..end].iter().collect(),
            range: Range::on_line(position.line, start, end),
            offset: col.min(end) - start,
            percent: false,
        })
    }

    /// The `/.../` pattern after `~` under `position`: its body and range,
    /// slashes included.
    pub fn regex_at(&self, position: Position) -> Option<(String, Range)> {
        let line = self.line(position.line)?;
        let chars: Vec<char> = line.chars().collect();
        let col = position.character as usize;
        let mut last = None;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match c {
                '#' => return None,
                '/' if chars.get(i + 1) == Some(&'/') => return None,
                '"' => i = skip_delimited(&chars, i, '"'),
                '/' if last == Some('~') => {
                    let close = skip_delimited(&chars, i, '/');
                    if (i..=close).contains(&col) {
                        let end = (close + 1).min(chars.len());
                        let body = chars[i + 1..close.min(chars.len())].iter().collect();
                        return Some((body, Range::on_line(position.line, i, end)));
                    }
                    i = close;
                }
                _ => {}
            }
            if !c.is_whitespace() {
                last = Some(c);
            }
            i += 1;
        }
        None
    }

    /// The modifier under `position` in a `with A,B` list.
    pub fn modifier_at(&self, position: Position) -> Option<ModifierList> {
        let line = self.line(position.line)?;
        let chars: Vec<char> = line.chars().collect();
        let col = position.character as usize;
        for caps in WITH.captures_iter(line) {
            let (Some(keyword), Some(list)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let start = line[..keyword.start()].chars().count();
            if lexical_at(&chars, start) != Lexical::Code
                || (start > 0 && is_symbol_char(chars[start - 1]))
            {
                continue;
            }
            // (name, first column, end column)
            let words: Vec<(&str, usize, usize)> = WORD
                .find_iter(line)
                .filter(|m| m.start() >= list.start() && m.end() <= list.end())
                .map(|m| {
                    let from = line[..m.start()].chars().count();
                    (m.as_str(), from, from + m.as_str().len())
                })
                .collect();
            let Some(&(name, from, to)) =
                words.iter().find(|(_, from, to)| (*from..=*to).contains(&col))
            else {
                continue;
            };
            return Some(ModifierList {
                name: name.to_string(),
                all: words.iter().map(|(w, _, _)| w.to_string()).collect(),
                range: Range::on_line(position.line, from, to),
                statement: line[list.end()..].trim_start().starts_with(';'),
            });
        }
        None
    }

    /// The partial symbol typed before `position`, and the column it starts at.
    ///
    /// `None` inside comments, and inside strings outside an interpolation.
    pub fn prefix_at(&self, position: Position) -> Option<(String, usize)> {
        let line = self.line(position.line).unwrap_or("");
        let chars: Vec<char> = line.chars().collect();
        let col = (position.character as usize).min(chars.len());
        let mut start = col;
        while start > 0 && is_symbol_char(chars[start - 1]) {
            start -= 1;
        }
        match lexical_at(&chars, col) {
            Lexical::Comment => None,
            Lexical::String(_) if !(start > 0 && chars[start - 1] == '{') => None,
            _ => Some((chars[start..col].iter().collect(), start)),
        }
    }
}

/// Classify column `col` by scanning the line from its start.
pub(crate) fn lexical_at(chars: &[char], col: usize) -> Lexical {
    let mut open = None;
    let mut i = 0;
    while i < col.min(chars.len()) {
        let c = chars[i];
        match open {
            Some(_) if c == '\\' => i += 1,
            Some(_) if c == '"' => open = None,
            Some(_) => {}
            None if c == '"' => open = Some(i),
            None if c == '#' => return Lexical::Comment,
            None if c == '/' && chars.get(i + 1) == Some(&'/') => return Lexical::Comment,
            None => {}
        }
        i += 1;
    }
    match open {
        Some(at) => Lexical::String(at),
        None => Lexical::Code,
    }
}

/// Bounds of a `%{...}` reference around `col`.
fn percent_at(chars: &[char], col: usize) -> Option<(usize, usize)> {
    let head = &chars[..(col + 2).min(chars.len())];
    let open = head.windows(2).rposition(|w| w == ['%', '{'])?;
    if chars[open..col.max(open)].contains(&'}') {
        return None;
    }
    let close = open + chars[open..].iter().position(|&c| c == '}')?;
    (col <= close).then_some((open, close + 1))
}

/// Declarations between the braces of the VARS block.
fn declarations(text: &str, open: Position, close: Option<Position>) -> Vec<VarInfo> {
    let last = close.map_or(u32::MAX, |c| c.line);
    let mut vars = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let n = n as u32;
        if n < open.line || n > last {
            continue;
        }
        let chars: Vec<char> = line.chars().collect();
        let from = if n == open.line {
            open.character as usize + 1
        } else {
            0
        };
        let mut to = match close {
            Some(c) if c.line == n => c.character as usize,
            _ => chars.len(),
        };
        if let Some(comment) = (from..to).find(|&i| lexical_at(&chars, i) == Lexical::Comment) {
            to = comment.saturating_sub(1).max(from);
        }
        if from >= to {
            continue;
        }
        let segment: String = chars[from..to].iter().collect();
        for caps in DECL.captures_iter(&segment) {
            let name = &caps[1];
            let column = from + segment[..caps.get(1).map_or(0, |m| m.start())].chars().count();
            vars.push(VarInfo {
                name: name.to_string(),
                ty: caps[2].to_string(),
                slot: caps.get(3).and_then(|m| m.as_str().parse().ok()),
                range: Range::on_line(n, column, column + name.chars().count()),
            });
        }
    }
    vars
}

#[derive(Debug, Default)]
struct Scan {
    sections: Vec<SectionSpan>,
    vars_block: Option<(Position, Option<Position>)>,
}

/// Brace-depth scanner for top-level blocks.
#[derive(Debug, Default)]
struct Scanner {
    scan: Scan,
    depth: usize,
    in_vars: bool,
    /// Word being read, and where it started.
    word: String,
    word_start: Position,
    /// Last complete word, cleared by any other significant character.
    last_word: Option<(String, Position)>,
    last_significant: Option<char>,
}

impl Scanner {
    fn run(mut self, text: &str) -> Scan {
        for (n, line) in text.lines().enumerate() {
            self.line(n as u32, &line.chars().collect::<Vec<_>>());
        }
        self.scan
    }

    fn line(&mut self, n: u32, chars: &[char]) {
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let pos = Position::new(n, i as u32);
            if is_symbol_char(c) {
                if self.word.is_empty() {
                    self.word_start = pos;
                }
                self.word.push(c);
                i += 1;
                continue;
            }
            self.end_word();
            match c {
                '#' => break,
                '/' if chars.get(i + 1) == Some(&'/') => break,
                '"' => i = skip_delimited(chars, i, '"'),
                '/' if self.last_significant == Some('~') => i = skip_delimited(chars, i, '/'),
                '{' => self.open(pos),
                '}' => self.close(pos),
                _ => {}
            }
            if !c.is_whitespace() {
                self.last_word = None;
                self.last_significant = Some(c);
            }
            i += 1;
        }
        self.end_word();
    }

    fn end_word(&mut self) {
        if !self.word.is_empty() {
            self.last_word = Some((std::mem::take(&mut self.word), self.word_start));
            self.last_significant = None;
        }
    }

    fn open(&mut self, pos: Position) {
        if self.depth == 0
            && let Some((name, start)) = self.last_word.take()
        {
            if name == "VARS" {
                self.in_vars = true;
                self.scan.vars_block = Some((pos, None));
            } else {
                let end = start.character as usize + name.chars().count();
                self.scan.sections.push(SectionSpan {
                    section: SectionType::from_name(&name),
                    name_range: Range::on_line(start.line, start.character as usize, end),
                    name,
                    open: pos,
                    close: None,
                });
            }
        }
        self.depth += 1;
    }

    fn close(&mut self, pos: Position) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth > 0 {
            return;
        }
        if self.in_vars {
            self.in_vars = false;
            if let Some((_, close)) = &mut self.scan.vars_block {
                *close = Some(pos);
            }
        } else if let Some(section) = self.scan.sections.last_mut()
            && section.close.is_none()
        {
            section.close = Some(pos);
        }
    }
}

/// Index of the closing `delim` of a literal opening at `start`, or the line end.
fn skip_delimited(chars: &[char], start: usize, delim: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            c if c == delim => return i,
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

/// Open documents, keyed by URI.
///
/// Each change replaces the whole state, so cached matches never outlive the
/// text they were computed from.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<String, Arc<DocumentState>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, uri: &str, text: impl Into<String>) -> Arc<DocumentState> {
        let state = Arc::new(DocumentState::new(text));
        self.documents.insert(uri.to_string(), Arc::clone(&state));
        state
    }

    pub fn get(&self, uri: &str) -> Option<Arc<DocumentState>> {
        self.documents.get(uri).map(|doc| Arc::clone(doc.value()))
    }

    /// Drop a document. Returns whether it was open.
    pub fn close(&self, uri: &str) -> bool {
        self.documents.remove(uri).is_some()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"VARS {
    seen: bool;
    count: int8 @2; # trailing
}

REMAP {
    if inbound.ip in {10.0.0.0/8} && inbound.url.path ~ /^\/{2}x/ {
        inbound.req.X-A = "{inbound.method} }";
    }
}

SEND_RESPONSE {
    inbound.resp.X-B = "%{CLIENT-HEADER:Host}";
"#;

    #[test]
    fn test_sections_and_braces() {
        let doc = DocumentState::new(DOC);
        let names: Vec<_> = doc.sections().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["REMAP", "SEND_RESPONSE"]);

        let remap = &doc.sections()[0];
        assert_eq!(remap.section, Some(SectionType::Remap));
        assert_eq!(remap.name_range, Range::on_line(5, 0, 5));
        assert_eq!(remap.close, Some(Position::new(9, 0)));
        // Still being typed
        assert_eq!(doc.sections()[1].close, None);

        assert_eq!(
            doc.section_at(Position::new(7, 8)).map(|s| s.name.as_str()),
            Some("REMAP")
        );
        assert_eq!(
            doc.section_at(Position::new(12, 4)).map(|s| s.name.as_str()),
            Some("SEND_RESPONSE")
        );
        assert!(doc.section_at(Position::new(10, 0)).is_none());
        assert!(doc.section_at(Position::new(1, 4)).is_none());
        assert!(doc.in_vars(Position::new(1, 4)));
    }

    #[test]
    fn test_vars() {
        let doc = DocumentState::new(DOC);
        let vars: Vec<_> = doc
            .vars()
            .iter()
            .map(|v| (v.name.as_str(), v.ty.as_str(), v.slot, v.range))
            .collect();
        assert_eq!(
            vars,
            [
                ("seen", "bool", None, Range::on_line(1, 4, 8)),
                ("count", "int8", Some(2), Range::on_line(2, 4, 9)),
            ]
        );

        let one_line = DocumentState::new("VARS { a: bool; b: int16; }\nREMAP { }");
        let names: Vec<_> = one_line.vars().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(one_line.vars()[1].range, Range::on_line(0, 16, 17));
    }

    #[test]
    fn test_token_at() {
        let doc = DocumentState::new(DOC);
        let token = doc.token_at(Position::new(6, 37)).unwrap();
        assert_eq!(token.text, "inbound.url.path");
        assert_eq!(token.offset, 0);
        assert!(!token.percent);

        // Cursor just past the end
        let token = doc.token_at(Position::new(6, 17)).unwrap();
        assert_eq!(token.text, "inbound.ip");
        assert_eq!(token.offset, 10);

        // Interpolation inside a string
        let token = doc.token_at(Position::new(7, 30)).unwrap();
        assert_eq!(token.text, "inbound.method");

        // Plain string content is not a symbol
        assert_eq!(doc.token_at(Position::new(12, 4)).unwrap().text, "inbound.resp.X-B");
        let token = doc.token_at(Position::new(12, 30)).unwrap();
        assert!(token.percent);
        assert_eq!(token.text, "%{CLIENT-HEADER:Host}");

        assert_eq!(doc.token_at(Position::new(2, 22)), None);
        assert_eq!(doc.token_at(Position::new(4, 0)), None);
    }

    #[test]
    fn test_token_in_plain_string() {
        let doc = DocumentState::new("REMAP {\n    inbound.req.X = \"hello world\";\n}");
        assert_eq!(doc.token_at(Position::new(1, 22)), None);
        let call = DocumentState::new("REMAP {\n    if cidr(24, 64) { }\n}");
        assert_eq!(call.token_at(Position::new(1, 8)).unwrap().text, "cidr");
    }

    #[test]
    fn test_regex_at() {
        let doc = DocumentState::new(
            "REMAP {\n    if inbound.url.path ~ /^\\/api\\/(v\\d+)/ with NOCASE,PRE { }\n}",
        );
        assert_eq!(
            doc.regex_at(Position::new(1, 30)),
            Some((r"^\/api\/(v\d+)".to_string(), Range::on_line(1, 26, 42)))
        );
        assert_eq!(
            doc.regex_at(Position::new(1, 26)).map(|(_, r)| r),
            Some(Range::on_line(1, 26, 42))
        );
        assert_eq!(doc.regex_at(Position::new(1, 20)), None);
        assert_eq!(doc.regex_at(Position::new(1, 50)), None);

        let doc = DocumentState::new("REMAP {\n    inbound.req.X = \"/a/\"; # ~ /b/\n}");
        assert_eq!(doc.regex_at(Position::new(1, 22)), None);
        assert_eq!(doc.regex_at(Position::new(1, 32)), None);
    }

    #[test]
    fn test_modifier_at() {
        let doc = DocumentState::new(
            "REMAP {\n    if inbound.url.path ~ /^\\/api\\/(v\\d+)/ with NOCASE,PRE { }\n}",
        );
        let found = doc.modifier_at(Position::new(1, 50)).unwrap();
        assert_eq!(found.name, "NOCASE");
        assert_eq!(found.all, ["NOCASE", "PRE"]);
        assert_eq!(found.range, Range::on_line(1, 48, 54));
        assert!(!found.statement);
        assert_eq!(
            doc.modifier_at(Position::new(1, 56)).map(|m| m.range),
            Some(Range::on_line(1, 55, 58))
        );
        assert_eq!(doc.modifier_at(Position::new(1, 45)), None);

        let doc = DocumentState::new("REMAP {\n    set-redirect(302, \"/x\") with QSA;\n}");
        let found = doc.modifier_at(Position::new(1, 34)).unwrap();
        assert_eq!(found.name, "QSA");
        assert_eq!(found.range, Range::on_line(1, 33, 36));
        assert!(found.statement);

        let doc = DocumentState::new("REMAP {\n    inbound.req.X = \"a with B\";\n}");
        assert_eq!(doc.modifier_at(Position::new(1, 28)), None);
    }

    #[test]
    fn test_prefix_at() {
        let doc = DocumentState::new("REMAP {\n    outbound.co\n    x = \"{now.H\" # in.\n}");
        assert_eq!(
            doc.prefix_at(Position::new(1, 15)),
            Some(("outbound.co".to_string(), 4))
        );
        assert_eq!(doc.prefix_at(Position::new(2, 15)), Some(("now.H".to_string(), 10)));
        assert_eq!(doc.prefix_at(Position::new(2, 21)), None);
        assert_eq!(doc.prefix_at(Position::new(3, 0)), Some((String::new(), 0)));
    }

    #[test]
    fn test_matches_are_memoized() {
        let tables = Tables::new();
        let doc = DocumentState::new("");
        let first = doc.matched(&tables, "inbound.req.X-Foo", None);
        assert!(first.is_some());
        assert_eq!(doc.matches.len(), 1);
        assert_eq!(doc.matched(&tables, "inbound.req.X-Foo", None), first);
        assert_eq!(doc.matches.len(), 1);
        doc.matched(&tables, "inbound.req.X-Foo", Some(SectionType::Remap));
        assert_eq!(doc.matches.len(), 2);
    }

    #[test]
    fn test_store_replaces_state() {
        let store = DocumentStore::new();
        let tables = Tables::new();
        let old = store.update("file:///a.hrw4u", "REMAP { }");
        old.matched(&tables, "now.HOUR", None);
        let new = store.update("file:///a.hrw4u", "SEND_RESPONSE { }");
        assert_eq!(store.len(), 1);
        assert!(new.matches.is_empty());
        let current = store.get("file:///a.hrw4u").unwrap();
        assert_eq!(current.sections()[0].name, "SEND_RESPONSE");
        assert!(store.close("file:///a.hrw4u"));
        assert!(!store.close("file:///a.hrw4u"));
        assert!(store.get("file:///a.hrw4u").is_none());
    }
}
