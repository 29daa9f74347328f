//! Composable argument and value checks.
//!
//! A [`Validator`] is built by chaining rules:
//!
//! ```
//! use hrw4u::validate::{Arg, Validator};
//!
//! let cidr = Validator::new().arg_count(2).range_at(0, 1, 32).range_at(1, 1, 128);
//! assert!(cidr.check("cidr", &[Arg::bare("24"), Arg::bare("64")]).is_ok());
//! assert!(cidr.check("cidr", &[Arg::bare("24")]).is_err());
//! ```
//!
//! Rules run in the order they were added and stop at the first failure.

use crate::error::Error;

/// One argument as written: its text and whether it was quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg<'a> {
    pub text: &'a str,
    pub quoted: bool,
}

impl<'a> Arg<'a> {
    pub fn bare(text: &'a str) -> Self {
        Self {
            text,
            quoted: false,
        }
    }

    pub fn quoted(text: &'a str) -> Self {
        Self { text, quoted: true }
    }
}

/// Closed sets of field names accepted after a namespace stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuffixGroup {
    Url,
    Geo,
    Id,
    Date,
    Conn,
    Cert,
    San,
    HttpCntl,
    Capture,
}

impl SuffixGroup {
    pub fn name(self) -> &'static str {
        match self {
            SuffixGroup::Url => "URL",
            SuffixGroup::Geo => "GEO",
            SuffixGroup::Id => "ID",
            SuffixGroup::Date => "DATE",
            SuffixGroup::Conn => "CONN",
            SuffixGroup::Cert => "CERT",
            SuffixGroup::San => "SAN",
            SuffixGroup::HttpCntl => "HTTP_CNTL",
            SuffixGroup::Capture => "CAPTURE",
        }
    }

    pub fn members(self) -> &'static [&'static str] {
        match self {
            SuffixGroup::Url => &["HOST", "PORT", "PATH", "QUERY", "SCHEME", "URL"],
            SuffixGroup::Geo => &["COUNTRY", "COUNTRY-ISO", "ASN", "ASN-NAME"],
            SuffixGroup::Id => &["REQUEST", "PROCESS", "UNIQUE"],
            SuffixGroup::Date => &[
                "YEAR", "MONTH", "DAY", "HOUR", "MINUTE", "WEEKDAY", "YEARDAY",
            ],
            SuffixGroup::Conn => &[
                "LOCAL-ADDR",
                "LOCAL-PORT",
                "REMOTE-ADDR",
                "REMOTE-PORT",
                "TLS",
                "H2",
                "IPV4",
                "IPV6",
                "IP-FAMILY",
                "STACK",
            ],
            SuffixGroup::Cert => &[
                "PEM",
                "SIG",
                "SUBJECT",
                "ISSUER",
                "SERIAL",
                "NOT_BEFORE",
                "NOT_AFTER",
                "VERSION",
            ],
            SuffixGroup::San => &["DNS", "IP", "EMAIL", "URI"],
            SuffixGroup::HttpCntl => &[
                "LOGGING",
                "INTERCEPT_RETRY",
                "RESP_CACHEABLE",
                "REQ_CACHEABLE",
                "SERVER_NO_STORE",
                "TXN_DEBUG",
                "SKIP_REMAP",
            ],
            SuffixGroup::Capture => &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
        }
    }

    /// Whether source form spells these fields in lower case (`inbound.url.path`).
    pub fn lowercase_in_source(self) -> bool {
        matches!(self, SuffixGroup::Url)
    }

    /// Spell a member the way source form writes it.
    pub fn source_spelling(self, member: &str) -> String {
        if self.lowercase_in_source() {
            member.to_ascii_lowercase()
        } else {
            member.to_ascii_uppercase()
        }
    }

    pub fn contains(self, suffix: &str) -> bool {
        self.members().iter().any(|m| m.eq_ignore_ascii_case(suffix))
    }

    pub fn check(self, suffix: &str) -> Result<(), Error> {
        if self.contains(suffix) {
            Ok(())
        } else {
            Err(Error::validation(
                "suffix",
                suffix,
                format!(
                    "not a valid {} field, expected one of: {}",
                    self.name(),
                    self.members().join(", ")
                ),
            ))
        }
    }
}

#[derive(Debug, Clone)]
enum Rule {
    ArgCount(usize),
    ArgCountRange(usize, usize),
    RangeAt {
        index: usize,
        lo: i64,
        hi: i64,
    },
    BitWidthAt {
        index: usize,
        bits: u32,
    },
    BoolAt(usize),
    OneOfAt {
        index: usize,
        values: &'static [&'static str],
    },
    TokenAt(usize),
    QuotedAt(usize),
    SuffixAt {
        index: usize,
        group: SuffixGroup,
    },
    CrossArg {
        key: usize,
        value: usize,
        cases: &'static [(&'static str, &'static [&'static str])],
    },
}

/// An ordered list of argument rules.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: Vec<Rule>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exactly `n` arguments.
    pub fn arg_count(mut self, n: usize) -> Self {
        self.rules.push(Rule::ArgCount(n));
        self
    }

    /// Between `lo` and `hi` arguments, inclusive.
    pub fn arg_count_range(mut self, lo: usize, hi: usize) -> Self {
        self.rules.push(Rule::ArgCountRange(lo, hi));
        self
    }

    /// Argument `index` is an integer in `lo..=hi`.
    pub fn range_at(mut self, index: usize, lo: i64, hi: i64) -> Self {
        self.rules.push(Rule::RangeAt { index, lo, hi });
        self
    }

    /// Argument `index` is an unsigned integer that fits in `bits` bits.
    pub fn bit_width_at(mut self, index: usize, bits: u32) -> Self {
        self.rules.push(Rule::BitWidthAt { index, bits });
        self
    }

    pub fn bool_at(mut self, index: usize) -> Self {
        self.rules.push(Rule::BoolAt(index));
        self
    }

    pub fn one_of_at(mut self, index: usize, values: &'static [&'static str]) -> Self {
        self.rules.push(Rule::OneOfAt { index, values });
        self
    }

    /// Argument `index` is a single bare word.
    pub fn token_at(mut self, index: usize) -> Self {
        self.rules.push(Rule::TokenAt(index));
        self
    }

    pub fn quoted_at(mut self, index: usize) -> Self {
        self.rules.push(Rule::QuotedAt(index));
        self
    }

    pub fn suffix_at(mut self, index: usize, group: SuffixGroup) -> Self {
        self.rules.push(Rule::SuffixAt { index, group });
        self
    }

    /// The values allowed for argument `value` depend on argument `key`.
    pub fn cross_arg(
        mut self,
        key: usize,
        value: usize,
        cases: &'static [(&'static str, &'static [&'static str])],
    ) -> Self {
        self.rules.push(Rule::CrossArg { key, value, cases });
        self
    }

    /// Accepted argument counts, if the validator constrains them.
    pub fn expected_args(&self) -> Option<(usize, usize)> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::ArgCount(n) => Some((*n, *n)),
            Rule::ArgCountRange(lo, hi) => Some((*lo, *hi)),
            _ => None,
        })
    }

    /// Run every rule against `args`. `name` identifies the caller in count errors.
    pub fn check(&self, name: &str, args: &[Arg<'_>]) -> Result<(), Error> {
        for rule in &self.rules {
            check_rule(rule, name, args)?;
        }
        Ok(())
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "argument" } else { "arguments" }
}

fn parse_int(rule: &'static str, arg: &Arg<'_>) -> Result<i64, Error> {
    arg.text
        .parse::<i64>()
        .map_err(|_| Error::validation(rule, arg.text, "expected an integer"))
}

fn check_rule(rule: &Rule, name: &str, args: &[Arg<'_>]) -> Result<(), Error> {
    match rule {
        Rule::ArgCount(n) => {
            if args.len() != *n {
                return Err(Error::validation(
                    "arg_count",
                    name,
                    format!("expected {} {}, got {}", n, plural(*n), args.len()),
                ));
            }
        }
        Rule::ArgCountRange(lo, hi) => {
            if args.len() < *lo || args.len() > *hi {
                let expected = if *hi == usize::MAX {
                    format!("at least {} {}", lo, plural(*lo))
                } else {
                    format!("{} to {} arguments", lo, hi)
                };
                return Err(Error::validation(
                    "arg_count",
                    name,
                    format!("expected {}, got {}", expected, args.len()),
                ));
            }
        }
        Rule::RangeAt { index, lo, hi } => {
            if let Some(arg) = args.get(*index) {
                let value = parse_int("range", arg)?;
                if value < *lo || value > *hi {
                    return Err(Error::validation(
                        "range",
                        arg.text,
                        format!("value must be between {} and {}", lo, hi),
                    ));
                }
            }
        }
        Rule::BitWidthAt { index, bits } => {
            if let Some(arg) = args.get(*index) {
                let value = parse_int("bit_width", arg)?;
                let max = (1i64 << bits) - 1;
                if !(0..=max).contains(&value) {
                    return Err(Error::validation(
                        "bit_width",
                        arg.text,
                        format!("value must fit in {} bits (0 to {})", bits, max),
                    ));
                }
            }
        }
        Rule::BoolAt(index) => {
            if let Some(arg) = args.get(*index)
                && !matches!(arg.text.to_ascii_lowercase().as_str(), "true" | "false")
            {
                return Err(Error::validation(
                    "bool",
                    arg.text,
                    "expected true or false",
                ));
            }
        }
        Rule::OneOfAt { index, values } => {
            if let Some(arg) = args.get(*index)
                && !values.iter().any(|v| v.eq_ignore_ascii_case(arg.text))
            {
                return Err(Error::validation(
                    "one_of",
                    arg.text,
                    format!("expected one of: {}", values.join(", ")),
                ));
            }
        }
        Rule::TokenAt(index) => {
            if let Some(arg) = args.get(*index)
                && (arg.text.is_empty()
                    || arg
                        .text
                        .chars()
                        .any(|c| c.is_whitespace() || c == '"' || c == '\''))
            {
                return Err(Error::validation(
                    "token",
                    arg.text,
                    "expected a single word without spaces or quotes",
                ));
            }
        }
        Rule::QuotedAt(index) => {
            if let Some(arg) = args.get(*index)
                && !arg.quoted
            {
                return Err(Error::validation(
                    "quoted",
                    arg.text,
                    "expected a quoted string",
                ));
            }
        }
        Rule::SuffixAt { index, group } => {
            if let Some(arg) = args.get(*index) {
                group.check(arg.text)?;
            }
        }
        Rule::CrossArg { key, value, cases } => {
            if let (Some(k), Some(v)) = (args.get(*key), args.get(*value)) {
                let Some((_, allowed)) = cases
                    .iter()
                    .find(|(case, _)| case.eq_ignore_ascii_case(k.text))
                else {
                    let keys: Vec<_> = cases.iter().map(|(case, _)| *case).collect();
                    return Err(Error::validation(
                        "cross_arg",
                        k.text,
                        format!("expected one of: {}", keys.join(", ")),
                    ));
                };
                if !allowed.iter().any(|a| a.eq_ignore_ascii_case(v.text)) {
                    return Err(Error::validation(
                        "cross_arg",
                        v.text,
                        format!(
                            "invalid value for {}, expected one of: {}",
                            k.text,
                            allowed.join(", ")
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn bare(args: &[&'static str]) -> Vec<Arg<'static>> {
        args.iter().map(|a| Arg::bare(a)).collect()
    }

    #[test]
    fn test_bit_width_six() {
        let v = Validator::new().bit_width_at(0, 6);
        assert!(v.check("dscp", &bare(&["0"])).is_ok());
        assert!(v.check("dscp", &bare(&["63"])).is_ok());
        assert!(v.check("dscp", &bare(&["-1"])).is_err());
        assert!(v.check("dscp", &bare(&["64"])).is_err());
    }

    #[test]
    fn test_arg_count_names_expected() {
        let v = Validator::new().arg_count(2);
        for args in [bare(&["a"]), bare(&["a", "b", "c"])] {
            let err = v.check("set-config", &args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationFailed);
            assert!(err.to_string().contains("expected 2 arguments"), "{err}");
        }
        assert!(v.check("set-config", &bare(&["a", "b"])).is_ok());
    }

    #[test]
    fn test_short_circuits_on_first_failure() {
        let v = Validator::new().arg_count(2).range_at(0, 300, 399);
        let err = v.check("set-redirect", &bare(&["200"])).unwrap_err();
        assert!(matches!(err, Error::ValidationFailed { rule: "arg_count", .. }));

        let err = v.check("set-redirect", &bare(&["200", "x"])).unwrap_err();
        assert!(matches!(err, Error::ValidationFailed { rule: "range", .. }));
        assert_eq!(err.offending(), "200");
    }

    #[test]
    fn test_cross_arg() {
        static CASES: &[(&str, &[&str])] = &[
            ("TIMEZONE", &["LOCAL", "GMT"]),
            ("INBOUND_IP_SOURCE", &["PEER", "PROXY"]),
        ];
        let v = Validator::new().arg_count(2).cross_arg(0, 1, CASES);
        assert!(v.check("set-plugin-cntl", &bare(&["TIMEZONE", "GMT"])).is_ok());
        assert!(v.check("set-plugin-cntl", &bare(&["TIMEZONE", "PEER"])).is_err());
        assert!(v.check("set-plugin-cntl", &bare(&["COLOR", "RED"])).is_err());
    }

    #[test]
    fn test_quoted_and_token() {
        let v = Validator::new().quoted_at(0).token_at(1);
        assert!(v.check("f", &[Arg::quoted("a b"), Arg::bare("word")]).is_ok());
        assert!(v.check("f", &[Arg::bare("a"), Arg::bare("word")]).is_err());
        assert!(v.check("f", &[Arg::quoted("a"), Arg::bare("two words")]).is_err());
    }

    #[test]
    fn test_suffix_group_ignores_case() {
        assert!(SuffixGroup::Date.check("hour").is_ok());
        assert!(SuffixGroup::Date.check("FORTNIGHT").is_err());
        assert_eq!(SuffixGroup::Url.source_spelling("HOST"), "host");
        assert_eq!(SuffixGroup::Geo.source_spelling("country"), "COUNTRY");
    }
}
