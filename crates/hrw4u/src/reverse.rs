//! Reverse resolution: directive templates back to source symbols.
//!
//! Built once from the semantic tables. Lookups try an exact target, then
//! the longest stem target, and settle targets shared by several source
//! symbols with a fixed per-section table ([`disambiguate`]).

use crate::sections::SectionType;
use crate::tables::{TableEntry, TableKind};
use std::collections::HashMap;

/// A condition target mapped back to a table key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionHit {
    pub key: &'static str,
    /// Remainder after a stem target, as written in the directive.
    pub suffix: Option<String>,
}

/// An operator command mapped back to a table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHit {
    pub kind: TableKind,
    pub key: &'static str,
    /// Number of leading directive arguments consumed by the command itself.
    pub consumed: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    kind: TableKind,
    key: &'static str,
    hint: Option<&'static str>,
}

#[derive(Debug, Default)]
pub struct ReverseIndex {
    exact: HashMap<&'static str, Vec<&'static str>>,
    stems: HashMap<&'static str, Vec<&'static str>>,
    functions: HashMap<&'static str, &'static str>,
    commands: HashMap<&'static str, Vec<Candidate>>,
}

impl ReverseIndex {
    pub(crate) fn build(
        operators: &[TableEntry],
        statements: &[TableEntry],
        functions: &[TableEntry],
        conditions: &[TableEntry],
    ) -> Self {
        let mut index = Self::default();
        for entry in conditions.iter().filter(|e| !e.alias) {
            let map = if entry.prefix {
                &mut index.stems
            } else {
                &mut index.exact
            };
            map.entry(entry.target.primary()).or_default().push(entry.key);
        }
        for entry in functions {
            index.functions.insert(entry.target.primary(), entry.key);
        }
        for entry in operators.iter().chain(statements).filter(|e| !e.alias) {
            for command in entry.target.all() {
                index.commands.entry(*command).or_default().push(Candidate {
                    kind: entry.kind,
                    key: entry.key,
                    hint: entry.reverse_hint,
                });
            }
        }
        index
    }

    /// Function name for a condition tag such as `CIDR`.
    pub fn function(&self, tag: &str) -> Option<&'static str> {
        self.functions.get(tag).copied()
    }

    /// Resolve `%{TAG[:ARG]}` as read in `section`.
    pub fn condition(
        &self,
        tag: &str,
        arg: Option<&str>,
        section: SectionType,
    ) -> Option<ConditionHit> {
        let full = match arg {
            Some(arg) => format!("{tag}:{arg}"),
            None => tag.to_string(),
        };
        if let Some(keys) = self.exact.get(full.as_str()) {
            return choose(keys, &full, section).map(|key| ConditionHit { key, suffix: None });
        }

        let mut best: Option<(&str, &Vec<&'static str>, &str)> = None;
        for (target, keys) in &self.stems {
            if let Some(rest) = full.strip_prefix(target)
                && let Some(rest) = rest.strip_prefix(':')
                && !rest.is_empty()
                && best.is_none_or(|(t, _, _)| target.len() > t.len())
            {
                best = Some((*target, keys, rest));
            }
        }
        let (target, keys, rest) = best?;
        choose(keys, target, section).map(|key| ConditionHit {
            key,
            suffix: Some(rest.to_string()),
        })
    }

    /// Resolve an operator line `command args.. [MODS]` as read in `section`.
    pub fn operator(
        &self,
        command: &str,
        args: &[String],
        modifiers: &[String],
        section: SectionType,
    ) -> Option<CommandHit> {
        // Two-word commands such as `rm-destination QUERY "a,b"`
        if let [first, _, ..] = args {
            let long = format!("{command} {first}");
            if let Some(hit) = self
                .commands
                .get(long.as_str())
                .and_then(|c| pick(c, &long, modifiers, section))
            {
                return Some(CommandHit {
                    consumed: 1,
                    ..hit
                });
            }
        }
        self.commands
            .get(command)
            .and_then(|c| pick(c, command, modifiers, section))
    }
}

fn has_modifier(modifiers: &[String], wanted: &str) -> bool {
    modifiers.iter().any(|m| m.eq_ignore_ascii_case(wanted))
}

fn pick(
    candidates: &[Candidate],
    command: &str,
    modifiers: &[String],
    section: SectionType,
) -> Option<CommandHit> {
    let hinted: Vec<_> = candidates
        .iter()
        .filter(|c| c.hint.is_some_and(|h| has_modifier(modifiers, h)))
        .collect();
    let pool: Vec<_> = if hinted.is_empty() {
        candidates.iter().filter(|c| c.hint.is_none()).collect()
    } else {
        hinted
    };
    let chosen = match pool.as_slice() {
        [] => return None,
        [only] => *only,
        many => disambiguate(command, section)
            .and_then(|key| many.iter().find(|c| c.key == key).copied())
            .unwrap_or(many[0]),
    };
    Some(CommandHit {
        kind: chosen.kind,
        key: chosen.key,
        consumed: 0,
    })
}

fn choose(keys: &[&'static str], target: &str, section: SectionType) -> Option<&'static str> {
    match keys {
        [] => None,
        [only] => Some(*only),
        many => Some(
            disambiguate(target, section)
                .and_then(|key| many.iter().find(|k| **k == key).copied())
                .unwrap_or(many[0]),
        ),
    }
}

/// Generic spelling for a tag the tables do not know: `%{FOO-BAR:x}` is `foo-bar.x`.
pub fn fallback_symbol(tag: &str, arg: Option<&str>) -> String {
    let stem = tag.to_ascii_lowercase().replace(':', ".");
    match arg {
        Some(arg) => format!("{stem}.{arg}"),
        None => stem,
    }
}

/// The source symbol a shared target stands for in `section`.
///
/// This table is fixed. Targets it does not list fall back to the first
/// table entry that produces them.
pub fn disambiguate(target: &str, section: SectionType) -> Option<&'static str> {
    use SectionType::*;
    let key = match target {
        "HEADER" | "set-header" | "add-header" | "rm-header" => match section {
            PreRemap | Remap | ReadRequest => "inbound.req.",
            SendRequest => "outbound.req.",
            ReadResponse => "outbound.resp.",
            SendResponse | TxnStart | TxnClose => "inbound.resp.",
        },
        "COOKIE" | "set-cookie" | "add-cookie" | "rm-cookie" => {
            if section.is_pre_origin() {
                "inbound.cookie."
            } else {
                "outbound.cookie."
            }
        }
        "STATUS" => match section {
            ReadResponse => "outbound.status",
            _ => "inbound.status",
        },
        "METHOD" => match section {
            SendRequest => "outbound.method",
            _ => "inbound.method",
        },
        "set-destination" | "rm-destination" => match section {
            SendRequest => "outbound.url.",
            _ => "inbound.url.",
        },
        "set-conn-dscp" => match section {
            SendRequest | ReadResponse => "outbound.conn.dscp",
            _ => "inbound.conn.dscp",
        },
        "set-conn-mark" => match section {
            SendRequest | ReadResponse => "outbound.conn.mark",
            _ => "inbound.conn.mark",
        },
        "set-status" => "http.status",
        "set-status-reason" => "http.status.reason",
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Tables;
    use SectionType::*;

    #[test]
    fn test_exact_and_stem_lookup() {
        let tables = Tables::new();
        let index = tables.reverse();
        let hit = index.condition("IP", Some("CLIENT"), Remap).unwrap();
        assert_eq!(hit.key, "inbound.ip");

        let hit = index
            .condition("INBOUND", Some("CLIENT-CERT:SAN:DNS"), Remap)
            .unwrap();
        assert_eq!(hit.key, "inbound.conn.client-cert.SAN.");
        assert_eq!(hit.suffix.as_deref(), Some("DNS"));

        let hit = index.condition("NOW", None, Remap).unwrap();
        assert_eq!(hit.key, "now");
        let hit = index.condition("NOW", Some("HOUR"), Remap).unwrap();
        assert_eq!(hit.key, "now.");
    }

    #[test]
    fn test_section_disambiguation() {
        let tables = Tables::new();
        let index = tables.reverse();
        let header = |section| index.condition("HEADER", Some("X"), section).unwrap().key;
        assert_eq!(header(SendRequest), "outbound.req.");
        assert_eq!(header(ReadResponse), "outbound.resp.");
        assert_eq!(header(SendResponse), "inbound.resp.");

        let status = |section| index.condition("STATUS", None, section).unwrap().key;
        assert_eq!(status(ReadResponse), "outbound.status");
        assert_eq!(status(SendResponse), "inbound.status");
        assert_eq!(status(Remap), "inbound.status");

        let method = |section| index.condition("METHOD", None, section).unwrap().key;
        assert_eq!(method(SendRequest), "outbound.method");
        assert_eq!(method(ReadRequest), "inbound.method");
    }

    #[test]
    fn test_disambiguated_keys_exist() {
        let tables = Tables::new();
        let targets = [
            ("HEADER", TableKind::Condition),
            ("COOKIE", TableKind::Condition),
            ("STATUS", TableKind::Condition),
            ("METHOD", TableKind::Condition),
            ("set-header", TableKind::Operator),
            ("set-cookie", TableKind::Operator),
            ("set-destination", TableKind::Operator),
            ("set-conn-dscp", TableKind::Operator),
            ("set-conn-mark", TableKind::Operator),
            ("set-status", TableKind::Operator),
            ("set-status-reason", TableKind::Operator),
        ];
        for (target, kind) in targets {
            for section in SectionType::ALL {
                let key = disambiguate(target, section).unwrap();
                assert!(tables.entry(kind, key).is_some(), "{target} -> {key}");
            }
        }
    }

    #[test]
    fn test_operator_commands() {
        let tables = Tables::new();
        let index = tables.reverse();
        let args = |a: &[&str]| a.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let hit = index
            .operator("set-header", &args(&["X", "v"]), &[], SendRequest)
            .unwrap();
        assert_eq!((hit.kind, hit.key), (TableKind::Operator, "outbound.req."));

        let hit = index
            .operator("add-header", &args(&["X", "v"]), &[], Remap)
            .unwrap();
        assert_eq!(hit.key, "inbound.req.");

        let hit = index
            .operator("rm-destination", &args(&["QUERY", "a,b"]), &["INV".into()], Remap)
            .unwrap();
        assert_eq!((hit.key, hit.consumed), ("keep_query", 1));

        let hit = index
            .operator("rm-destination", &args(&["QUERY", "a,b"]), &[], Remap)
            .unwrap();
        assert_eq!(hit.key, "remove_query");

        let hit = index
            .operator("rm-destination", &args(&["PATH"]), &[], Remap)
            .unwrap();
        assert_eq!((hit.kind, hit.key), (TableKind::Operator, "inbound.url."));

        let hit = index.operator("set-status", &args(&["404"]), &[], Remap).unwrap();
        assert_eq!(hit.key, "http.status");

        assert!(index.operator("frobnicate", &[], &[], Remap).is_none());
    }

    #[test]
    fn test_fallback_symbol() {
        assert_eq!(fallback_symbol("FOO-BAR", Some("x")), "foo-bar.x");
        assert_eq!(fallback_symbol("NOPE", None), "nope");
    }
}
