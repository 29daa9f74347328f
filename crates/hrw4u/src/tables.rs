//! Semantic tables mapping source symbols to directive templates.
//!
//! Four tables drive every translation:
//!
//! | Kind | Source use | Example |
//! |------|------------|---------|
//! | [`TableKind::Operator`] | assignment target | `inbound.req.X-Foo = "v"` |
//! | [`TableKind::StatementFunction`] | statement call | `set-redirect(302, "..")` |
//! | [`TableKind::Function`] | condition call | `cidr(24, 64)` |
//! | [`TableKind::Condition`] | readable symbol | `inbound.method` |
//!
//! Keys ending in `.` are namespace stems: anything after the stem is a
//! dynamic suffix (a header name, a URL field, a capture index).
//!
//! [`Tables`] is built once and never mutated. Share it by reference.

use crate::error::Error;
use crate::reverse::ReverseIndex;
use crate::sections::{SectionSet, SectionType};
use crate::validate::{Arg, SuffixGroup, Validator};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TableKind {
    Operator,
    StatementFunction,
    Function,
    Condition,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Operator,
        TableKind::StatementFunction,
        TableKind::Function,
        TableKind::Condition,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TableKind::Operator => "Operator",
            TableKind::StatementFunction | TableKind::Function => "Function",
            TableKind::Condition => "Condition",
        }
    }
}

/// Directive produced by an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Single(&'static str),
    /// Variants selected by verb: `set-header`, `add-header`, `rm-header`.
    Aliases(&'static [&'static str]),
}

impl Target {
    pub fn primary(&self) -> &'static str {
        match self {
            Target::Single(t) => t,
            Target::Aliases(all) => all.first().copied().unwrap_or(""),
        }
    }

    pub fn all(&self) -> &[&'static str] {
        match self {
            Target::Single(t) => std::slice::from_ref(t),
            Target::Aliases(all) => all,
        }
    }

    /// The variant for `verb` (`set`, `add` or `rm`).
    pub fn variant(&self, verb: &str) -> Option<&'static str> {
        match self {
            Target::Single(t) => (verb == "set").then_some(*t),
            Target::Aliases(all) => all
                .iter()
                .find(|a| a.strip_prefix(verb).is_some_and(|rest| rest.starts_with('-')))
                .copied(),
        }
    }

    pub fn display(&self) -> String {
        self.all().join(" / ")
    }
}

#[derive(Debug, Clone)]
pub struct TableEntry {
    pub key: &'static str,
    pub kind: TableKind,
    pub target: Target,
    /// Upper-case the suffix when rendering.
    pub upper: bool,
    /// The key is a namespace stem matched by starts-with.
    pub prefix: bool,
    /// `None` means allowed everywhere.
    pub sections: Option<SectionSet>,
    pub suffix: Option<SuffixGroup>,
    pub validate: Validator,
    /// A bare reference in a condition tests for a non-empty value.
    pub exists_test: bool,
    /// Alternate spelling. Resolves, but is hidden from completion and reverse lookup.
    pub alias: bool,
    /// Operator modifier implied by this entry and required on the line when reversing.
    pub reverse_hint: Option<&'static str>,
}

impl TableEntry {
    fn new(kind: TableKind, key: &'static str, target: Target) -> Self {
        Self {
            key,
            kind,
            target,
            upper: false,
            prefix: key.ends_with('.'),
            sections: None,
            suffix: None,
            validate: Validator::new(),
            exists_test: false,
            alias: false,
            reverse_hint: None,
        }
    }

    fn sections(mut self, sections: SectionSet) -> Self {
        self.sections = Some(sections);
        self
    }

    fn fields(mut self, group: SuffixGroup) -> Self {
        self.suffix = Some(group);
        self.upper = true;
        self
    }

    fn validate(mut self, validator: Validator) -> Self {
        self.validate = validator;
        self
    }

    fn exists(mut self) -> Self {
        self.exists_test = true;
        self
    }

    fn alias(mut self) -> Self {
        self.alias = true;
        self
    }

    fn hint(mut self, modifier: &'static str) -> Self {
        self.reverse_hint = Some(modifier);
        self
    }

    pub fn allowed_in(&self, section: SectionType) -> bool {
        self.sections.is_none_or(|set| set.contains(section))
    }

    /// Source spelling of this entry with `suffix` appended to a stem.
    pub fn surface(&self, suffix: Option<&str>) -> String {
        match (suffix, self.suffix) {
            (Some(s), Some(group)) => format!("{}{}", self.key, group.source_spelling(s)),
            (Some(s), None) => format!("{}{}", self.key, s),
            (None, _) => self.key.to_string(),
        }
    }

    /// Completion labels: the key itself, or the stem plus each known field.
    pub fn labels(&self) -> Vec<String> {
        match self.suffix {
            Some(group) if self.prefix => group
                .members()
                .iter()
                .map(|m| self.surface(Some(m)))
                .collect(),
            _ => vec![self.key.to_string()],
        }
    }

    pub fn check_args(&self, name: &str, args: &[Arg<'_>]) -> Result<(), Error> {
        self.validate.check(name, args)
    }
}

/// An entry matched for a symbol, with the rendered suffix of a stem match.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'t, 's> {
    pub entry: &'t TableEntry,
    pub suffix: Option<&'s str>,
}

impl Resolved<'_, '_> {
    /// Suffix as it appears in directives.
    pub fn rendered_suffix(&self) -> Option<String> {
        self.suffix.map(|s| {
            if self.entry.upper {
                s.to_ascii_uppercase()
            } else {
                s.to_string()
            }
        })
    }

    /// `TAG` or `TAG:SUFFIX`.
    pub fn condition_tag(&self) -> String {
        match self.rendered_suffix() {
            Some(s) => format!("{}:{}", self.entry.target.primary(), s),
            None => self.entry.target.primary().to_string(),
        }
    }

    /// `%{TAG}` or `%{TAG:SUFFIX}`.
    pub fn condition_ref(&self) -> String {
        format!("%{{{}}}", self.condition_tag())
    }
}

/// The four semantic tables and the reverse index derived from them.
#[derive(Debug)]
pub struct Tables {
    operators: Vec<TableEntry>,
    statements: Vec<TableEntry>,
    functions: Vec<TableEntry>,
    conditions: Vec<TableEntry>,
    reverse: ReverseIndex,
}

impl Default for Tables {
    fn default() -> Self {
        Self::new()
    }
}

impl Tables {
    /// Build the tables.
    ///
    /// # Panics
    ///
    /// If a table contains a duplicate key. That is a programming error in
    /// the built-in tables, not an input error.
    pub fn new() -> Self {
        let operators = operator_table();
        let statements = statement_table();
        let functions = function_table();
        let conditions = condition_table();
        for table in [&operators, &statements, &functions, &conditions] {
            let mut seen = HashSet::new();
            for entry in table {
                assert!(seen.insert(entry.key), "duplicate table key {}", entry.key);
            }
        }
        let reverse = ReverseIndex::build(&operators, &statements, &functions, &conditions);
        tracing::debug!(
            operators = operators.len(),
            statements = statements.len(),
            functions = functions.len(),
            conditions = conditions.len(),
            "built semantic tables"
        );
        Self {
            operators,
            statements,
            functions,
            conditions,
            reverse,
        }
    }

    pub fn entries(&self, kind: TableKind) -> &[TableEntry] {
        match kind {
            TableKind::Operator => &self.operators,
            TableKind::StatementFunction => &self.statements,
            TableKind::Function => &self.functions,
            TableKind::Condition => &self.conditions,
        }
    }

    pub fn reverse(&self) -> &ReverseIndex {
        &self.reverse
    }

    /// Entry for an exact key, stems included.
    pub fn entry(&self, kind: TableKind, key: &str) -> Option<&TableEntry> {
        self.entries(kind).iter().find(|e| e.key == key)
    }

    /// Match `symbol` without checking sections or the suffix.
    pub fn lookup<'t, 's>(&'t self, kind: TableKind, symbol: &'s str) -> Option<Resolved<'t, 's>> {
        let entries = self.entries(kind);
        if let Some(entry) = entries.iter().find(|e| !e.prefix && e.key == symbol) {
            return Some(Resolved {
                entry,
                suffix: None,
            });
        }
        entries
            .iter()
            .filter(|e| e.prefix && symbol.len() > e.key.len() && symbol.starts_with(e.key))
            .max_by_key(|e| e.key.len())
            .map(|entry| Resolved {
                entry,
                suffix: Some(&symbol[entry.key.len()..]),
            })
    }

    /// Resolve `symbol` for use in `section`.
    ///
    /// Exact keys win, then the longest matching stem. A match that is not
    /// allowed in `section` fails with `SectionRestricted`; a stem match then
    /// has its suffix validated.
    pub fn resolve<'t, 's>(
        &'t self,
        kind: TableKind,
        symbol: &'s str,
        section: Option<SectionType>,
    ) -> Result<Resolved<'t, 's>, Error> {
        let Some(resolved) = self.lookup(kind, symbol) else {
            if let Some(stem) = self.entry(kind, symbol).filter(|e| e.prefix) {
                return Err(Error::validation(
                    "suffix",
                    symbol,
                    format!("expected a field name after '{}'", stem.key),
                ));
            }
            return Err(Error::UnknownSymbol(symbol.to_string()));
        };
        if let Some(section) = section
            && !resolved.entry.allowed_in(section)
        {
            return Err(Error::SectionRestricted {
                symbol: symbol.to_string(),
                section,
            });
        }
        if let Some(suffix) = resolved.suffix {
            match resolved.entry.suffix {
                Some(group) => group.check(suffix)?,
                None if suffix.chars().any(char::is_whitespace) => {
                    return Err(Error::validation(
                        "suffix",
                        suffix,
                        "field names cannot contain whitespace",
                    ));
                }
                None => {}
            }
        }
        Ok(resolved)
    }
}

use SectionType::*;
use TableKind::*;

const HEADER_OPS: Target = Target::Aliases(&["set-header", "add-header", "rm-header"]);
const COOKIE_OPS: Target = Target::Aliases(&["set-cookie", "add-cookie", "rm-cookie"]);
const URL_OPS: Target = Target::Aliases(&["set-destination", "rm-destination"]);

const INBOUND_RESP: SectionSet = SectionSet::of(&[ReadResponse, SendResponse, TxnClose]);
const TO_SEND_REQUEST: SectionSet =
    SectionSet::of(&[PreRemap, Remap, ReadRequest, SendRequest]);
const ORIGIN_CONN_OPS: SectionSet = SectionSet::of(&[SendRequest, ReadResponse]);
const ORIGIN_CONN: SectionSet = SectionSet::of(&[SendRequest, ReadResponse, SendResponse]);
const NEXT_HOP: SectionSet = SectionSet::of(&[
    PreRemap,
    Remap,
    ReadRequest,
    SendRequest,
    ReadResponse,
    SendResponse,
]);

static PLUGIN_CNTL: &[(&str, &[&str])] = &[
    ("TIMEZONE", &["LOCAL", "GMT"]),
    ("INBOUND_IP_SOURCE", &["PEER", "PROXY"]),
];

fn op(key: &'static str, target: Target) -> TableEntry {
    TableEntry::new(Operator, key, target).sections(SectionSet::HTTP)
}

fn operator_table() -> Vec<TableEntry> {
    let status = || Validator::new().range_at(0, 100, 999);
    vec![
        op("http.cntl.", Target::Single("set-http-cntl"))
            .fields(SuffixGroup::HttpCntl)
            .validate(Validator::new().bool_at(0)),
        op("http.status.reason", Target::Single("set-status-reason")),
        op("http.status", Target::Single("set-status")).validate(status()),
        op("inbound.conn.dscp", Target::Single("set-conn-dscp"))
            .validate(Validator::new().bit_width_at(0, 6)),
        op("inbound.conn.mark", Target::Single("set-conn-mark"))
            .validate(Validator::new().bit_width_at(0, 32)),
        op("outbound.conn.dscp", Target::Single("set-conn-dscp"))
            .sections(ORIGIN_CONN_OPS)
            .validate(Validator::new().bit_width_at(0, 6)),
        op("outbound.conn.mark", Target::Single("set-conn-mark"))
            .sections(ORIGIN_CONN_OPS)
            .validate(Validator::new().bit_width_at(0, 32)),
        op("inbound.cookie.", COOKIE_OPS),
        op("inbound.req.", HEADER_OPS),
        op("inbound.resp.body", Target::Single("set-body")),
        op("inbound.resp.", HEADER_OPS).sections(INBOUND_RESP),
        op("inbound.status.reason", Target::Single("set-status-reason")),
        op("inbound.status", Target::Single("set-status")).validate(status()),
        op("inbound.url.", URL_OPS).fields(SuffixGroup::Url),
        op("outbound.cookie.", COOKIE_OPS),
        op("outbound.req.", HEADER_OPS).sections(TO_SEND_REQUEST),
        op("outbound.resp.", HEADER_OPS),
        op("outbound.status.reason", Target::Single("set-status-reason")),
        op("outbound.status", Target::Single("set-status")).validate(status()),
        op("outbound.url.", URL_OPS)
            .sections(TO_SEND_REQUEST)
            .fields(SuffixGroup::Url),
    ]
}

fn stmt(key: &'static str, target: &'static str, validator: Validator) -> TableEntry {
    TableEntry::new(StatementFunction, key, Target::Single(target)).validate(validator)
}

fn statement_table() -> Vec<TableEntry> {
    let args = |n| Validator::new().arg_count(n);
    vec![
        stmt("add-header", "add-header", args(2)),
        stmt("counter", "counter", args(1).token_at(0)),
        stmt("set-debug", "set-debug", args(0)),
        stmt("no-op", "no-op", args(0)),
        stmt("remove_query", "rm-destination QUERY", args(1)),
        stmt("keep_query", "rm-destination QUERY", args(1)).hint("INV"),
        stmt(
            "run-plugin",
            "run-plugin",
            Validator::new().arg_count_range(1, usize::MAX),
        ),
        stmt("set-body-from", "set-body-from", args(1)),
        stmt("set-cc-alg", "set-cc-alg", args(1).token_at(0)),
        stmt("set-config", "set-config", args(2).token_at(0)),
        stmt("set-effective-address", "set-effective-address", args(1)),
        stmt("set-redirect", "set-redirect", args(2).range_at(0, 300, 399)),
        stmt("skip-remap", "skip-remap", args(1).bool_at(0))
            .sections(SectionSet::of(&[PreRemap, ReadRequest])),
        stmt(
            "set-plugin-cntl",
            "set-plugin-cntl",
            args(2).cross_arg(0, 1, PLUGIN_CNTL),
        ),
    ]
}

fn func(key: &'static str, target: &'static str, validator: Validator) -> TableEntry {
    TableEntry::new(Function, key, Target::Single(target)).validate(validator)
}

fn function_table() -> Vec<TableEntry> {
    let args = |n| Validator::new().arg_count(n);
    vec![
        func("access", "ACCESS", args(1)),
        func("cache", "CACHE", args(0)),
        func(
            "cidr",
            "CIDR",
            args(2).range_at(0, 1, 32).range_at(1, 1, 128),
        ),
        func("internal", "INTERNAL-TRANSACTION", args(0)),
        func("random", "RANDOM", args(1).range_at(0, 1, i64::from(u32::MAX))),
        func("ssn-txn-count", "SSN-TXN-COUNT", args(0)),
        func("txn-count", "TXN-COUNT", args(0)),
    ]
}

fn cond(key: &'static str, target: &'static str) -> TableEntry {
    TableEntry::new(Condition, key, Target::Single(target))
}

/// `(key, target, fields, alias)` for one side's connection namespaces.
type ConnKey = (&'static str, &'static str, SuffixGroup, bool);

const INBOUND_CONN: &[ConnKey] = &[
    ("inbound.conn.client-cert.SAN.", "INBOUND:CLIENT-CERT:SAN", SuffixGroup::San, false),
    ("inbound.conn.client-cert.san.", "INBOUND:CLIENT-CERT:SAN", SuffixGroup::San, true),
    ("inbound.conn.server-cert.SAN.", "INBOUND:SERVER-CERT:SAN", SuffixGroup::San, false),
    ("inbound.conn.server-cert.san.", "INBOUND:SERVER-CERT:SAN", SuffixGroup::San, true),
    ("inbound.conn.client-cert.", "INBOUND:CLIENT-CERT", SuffixGroup::Cert, false),
    ("inbound.conn.server-cert.", "INBOUND:SERVER-CERT", SuffixGroup::Cert, false),
    ("inbound.conn.", "INBOUND", SuffixGroup::Conn, false),
];

const OUTBOUND_CONN: &[ConnKey] = &[
    ("outbound.conn.client-cert.SAN.", "OUTBOUND:CLIENT-CERT:SAN", SuffixGroup::San, false),
    ("outbound.conn.client-cert.san.", "OUTBOUND:CLIENT-CERT:SAN", SuffixGroup::San, true),
    ("outbound.conn.server-cert.SAN.", "OUTBOUND:SERVER-CERT:SAN", SuffixGroup::San, false),
    ("outbound.conn.server-cert.san.", "OUTBOUND:SERVER-CERT:SAN", SuffixGroup::San, true),
    ("outbound.conn.client-cert.", "OUTBOUND:CLIENT-CERT", SuffixGroup::Cert, false),
    ("outbound.conn.server-cert.", "OUTBOUND:SERVER-CERT", SuffixGroup::Cert, false),
    ("outbound.conn.", "OUTBOUND", SuffixGroup::Conn, false),
];

fn conn_conditions(
    keys: &'static [ConnKey],
    sections: Option<SectionSet>,
) -> impl Iterator<Item = TableEntry> {
    keys.iter().map(move |&(key, target, group, alias)| {
        let mut entry = cond(key, target).fields(group).exists();
        entry.sections = sections;
        if alias { entry.alias() } else { entry }
    })
}

fn condition_table() -> Vec<TableEntry> {
    let mut table = vec![
        cond("inbound.ip", "IP:CLIENT"),
        cond("inbound.method", "METHOD").sections(SectionSet::HTTP),
        cond("inbound.server", "IP:INBOUND"),
        cond("inbound.status", "STATUS").sections(SectionSet::HTTP),
        cond("now", "NOW"),
        cond("outbound.ip", "IP:SERVER").sections(SectionSet::HTTP),
        cond("outbound.method", "METHOD").sections(TO_SEND_REQUEST),
        cond("outbound.server", "IP:OUTBOUND").sections(SectionSet::HTTP),
        cond("outbound.status", "STATUS").sections(SectionSet::HTTP),
        cond("tcp.info", "TCP-INFO"),
        cond("capture.", "LAST-CAPTURE").fields(SuffixGroup::Capture),
        cond("from.url.", "FROM-URL")
            .sections(SectionSet::HTTP)
            .fields(SuffixGroup::Url),
        cond("geo.", "GEO").fields(SuffixGroup::Geo),
        cond("http.cntl.", "HTTP-CNTL").fields(SuffixGroup::HttpCntl),
        cond("id.", "ID").fields(SuffixGroup::Id),
    ];
    table.extend(conn_conditions(INBOUND_CONN, None));
    table.extend(conn_conditions(OUTBOUND_CONN, Some(ORIGIN_CONN)));
    table.extend([
        cond("inbound.cookie.", "COOKIE")
            .sections(SectionSet::HTTP)
            .exists(),
        cond("inbound.req.", "CLIENT-HEADER")
            .sections(SectionSet::HTTP)
            .exists(),
        cond("inbound.resp.", "HEADER").sections(INBOUND_RESP).exists(),
        cond("inbound.url.", "CLIENT-URL")
            .sections(SectionSet::HTTP)
            .fields(SuffixGroup::Url),
        cond("now.", "NOW").fields(SuffixGroup::Date),
        cond("outbound.cookie.", "COOKIE")
            .sections(SectionSet::HTTP)
            .exists(),
        cond("outbound.req.", "HEADER").sections(TO_SEND_REQUEST).exists(),
        cond("outbound.resp.", "HEADER")
            .sections(SectionSet::HTTP)
            .exists(),
        cond("outbound.url.", "NEXT-HOP")
            .sections(NEXT_HOP)
            .fields(SuffixGroup::Url),
        cond("to.url.", "TO-URL").fields(SuffixGroup::Url),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_exact_keys_resolve_to_themselves() {
        let tables = Tables::new();
        for kind in TableKind::ALL {
            for entry in tables.entries(kind).iter().filter(|e| !e.prefix) {
                let resolved = tables.resolve(kind, entry.key, None).unwrap();
                assert_eq!(resolved.entry.key, entry.key);
                assert_eq!(resolved.suffix, None);
            }
        }
    }

    #[test]
    fn test_non_keys_are_unknown() {
        let tables = Tables::new();
        for symbol in ["inbound.methodx", "nowhere", "tcp", "http.status.code"] {
            let err = tables
                .resolve(TableKind::Condition, symbol, None)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnknownSymbol, "{symbol}");
        }
    }

    #[test]
    fn test_longest_stem_wins() {
        let tables = Tables::new();
        let r = tables
            .resolve(TableKind::Condition, "inbound.conn.client-cert.SAN.dns", None)
            .unwrap();
        assert_eq!(r.entry.key, "inbound.conn.client-cert.SAN.");
        assert_eq!(r.condition_ref(), "%{INBOUND:CLIENT-CERT:SAN:DNS}");

        let r = tables
            .resolve(TableKind::Condition, "inbound.conn.client-cert.SUBJECT", None)
            .unwrap();
        assert_eq!(r.condition_ref(), "%{INBOUND:CLIENT-CERT:SUBJECT}");

        let r = tables
            .resolve(TableKind::Condition, "inbound.conn.TLS", None)
            .unwrap();
        assert_eq!(r.condition_ref(), "%{INBOUND:TLS}");
    }

    #[test]
    fn test_section_restriction() {
        let tables = Tables::new();
        let ok = tables.resolve(
            TableKind::Operator,
            "outbound.conn.dscp",
            Some(SectionType::SendRequest),
        );
        assert!(ok.is_ok());
        let err = tables
            .resolve(
                TableKind::Operator,
                "outbound.conn.dscp",
                Some(SectionType::Remap),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SectionRestricted);

        let r = tables
            .resolve(TableKind::Condition, "from.url.host", Some(SectionType::Remap))
            .unwrap();
        assert_eq!(r.condition_ref(), "%{FROM-URL:HOST}");
        for section in [SectionType::TxnStart, SectionType::TxnClose] {
            let err = tables
                .resolve(TableKind::Condition, "from.url.host", Some(section))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SectionRestricted);
        }
        assert!(
            tables
                .resolve(TableKind::Condition, "to.url.host", Some(SectionType::TxnStart))
                .is_ok()
        );
    }

    #[test]
    fn test_suffix_validation_and_case() {
        let tables = Tables::new();
        let r = tables
            .resolve(TableKind::Condition, "now.hour", None)
            .unwrap();
        assert_eq!(r.condition_ref(), "%{NOW:HOUR}");
        let err = tables
            .resolve(TableKind::Condition, "now.FORTNIGHT", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);

        // Header names keep their case
        let r = tables
            .resolve(TableKind::Condition, "inbound.req.X-Foo", None)
            .unwrap();
        assert_eq!(r.condition_ref(), "%{CLIENT-HEADER:X-Foo}");
    }

    #[test]
    fn test_bare_stem_needs_field() {
        let tables = Tables::new();
        let err = tables
            .resolve(TableKind::Condition, "inbound.req.", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn test_alias_variants() {
        assert_eq!(HEADER_OPS.variant("add"), Some("add-header"));
        assert_eq!(HEADER_OPS.variant("rm"), Some("rm-header"));
        assert_eq!(URL_OPS.variant("add"), None);
        assert_eq!(Target::Single("set-status").variant("set"), Some("set-status"));
        assert_eq!(HEADER_OPS.display(), "set-header / add-header / rm-header");
    }

    #[test]
    fn test_labels() {
        let tables = Tables::new();
        let now = tables.entry(TableKind::Condition, "now.").unwrap();
        assert!(now.labels().contains(&"now.HOUR".to_string()));
        let url = tables.entry(TableKind::Operator, "inbound.url.").unwrap();
        assert!(url.labels().contains(&"inbound.url.path".to_string()));
        let req = tables.entry(TableKind::Condition, "inbound.req.").unwrap();
        assert_eq!(req.labels(), vec!["inbound.req.".to_string()]);
    }
}
