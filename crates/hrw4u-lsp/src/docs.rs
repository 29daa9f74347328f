//! Documentation strings for namespaces, fields, functions, modifiers and
//! regular expression syntax.

use hrw4u::validate::SuffixGroup;

/// Namespace stems, spelled as in source.
static NAMESPACES: &[(&str, &str)] = &[
    (
        "inbound.",
        "The client side of the transaction: the request as the client sent it and the response the client receives.",
    ),
    (
        "outbound.",
        "The origin side of the transaction: the request sent to the origin and the response it returns.",
    ),
    ("inbound.req.", "Headers of the client request."),
    ("inbound.resp.", "Headers of the response sent to the client."),
    ("outbound.req.", "Headers of the request sent to the origin."),
    ("outbound.resp.", "Headers of the response received from the origin."),
    ("inbound.cookie.", "Cookies of the client request."),
    ("outbound.cookie.", "Cookies of the request sent to the origin."),
    ("inbound.url.", "Parts of the client request URL."),
    ("outbound.url.", "Parts of the next-hop URL."),
    ("inbound.conn.", "Properties of the client connection."),
    ("outbound.conn.", "Properties of the origin connection."),
    (
        "inbound.conn.client-cert.",
        "Certificate the client presented on the inbound connection.",
    ),
    (
        "inbound.conn.server-cert.",
        "Certificate the proxy presented to the client.",
    ),
    (
        "outbound.conn.client-cert.",
        "Certificate the proxy presented to the origin.",
    ),
    (
        "outbound.conn.server-cert.",
        "Certificate the origin presented on the outbound connection.",
    ),
    (
        "inbound.conn.client-cert.san.",
        "Subject alternative names of the client certificate.",
    ),
    (
        "inbound.conn.server-cert.san.",
        "Subject alternative names of the proxy certificate.",
    ),
    (
        "outbound.conn.client-cert.san.",
        "Subject alternative names of the certificate sent to the origin.",
    ),
    (
        "outbound.conn.server-cert.san.",
        "Subject alternative names of the origin certificate.",
    ),
    ("now.", "Current date and time, in the configured time zone."),
    ("id.", "Request, process and unique identifiers."),
    ("geo.", "Geographic data for the client address, from the GeoIP database."),
    ("http.", "Transaction-wide settings."),
    ("http.cntl.", "Per-transaction control flags. Setting one to true enables it."),
    ("capture.", "Groups captured by the most recent regular expression match."),
    ("from.url.", "Parts of the remap rule's source URL."),
    ("to.url.", "Parts of the remap rule's target URL."),
];

/// `(group, field, description)`. Groups are family names plus `url`, `san`
/// and `http_cntl`.
static FIELDS: &[(&str, &str, &str)] = &[
    ("time", "YEAR", "Current year."),
    ("time", "MONTH", "Current month, 0 to 11 with 0 being January."),
    ("time", "DAY", "Day of the month, 1 to 31."),
    ("time", "HOUR", "Hour of the day, 0 to 23."),
    ("time", "MINUTE", "Minute of the hour, 0 to 59."),
    ("time", "WEEKDAY", "Day of the week, 0 to 6 with 0 being Sunday."),
    ("time", "YEARDAY", "Day of the year, 0 to 365 with 0 being January 1st."),
    ("identifier", "REQUEST", "Identifier of the request, unique within the process."),
    ("identifier", "PROCESS", "UUID of the running process."),
    ("identifier", "UNIQUE", "Process UUID joined with the request identifier."),
    ("geo", "COUNTRY", "Country name."),
    ("geo", "COUNTRY-ISO", "ISO 3166 country code."),
    ("geo", "ASN", "Autonomous system number."),
    ("geo", "ASN-NAME", "Autonomous system name."),
    ("connection", "LOCAL-ADDR", "Local address of the connection."),
    ("connection", "LOCAL-PORT", "Local port of the connection."),
    ("connection", "REMOTE-ADDR", "Remote address of the connection."),
    ("connection", "REMOTE-PORT", "Remote port of the connection."),
    ("connection", "TLS", "TLS protocol version, empty when the connection is not TLS."),
    ("connection", "H2", "True when the connection speaks HTTP/2."),
    ("connection", "IPV4", "True when the connection is over IPv4."),
    ("connection", "IPV6", "True when the connection is over IPv6."),
    ("connection", "IP-FAMILY", "Address family, ipv4 or ipv6."),
    ("connection", "STACK", "Full protocol stack of the connection."),
    ("certificate", "PEM", "The certificate in PEM encoding."),
    ("certificate", "SIG", "Signature of the certificate."),
    ("certificate", "SUBJECT", "Subject distinguished name."),
    ("certificate", "ISSUER", "Issuer distinguished name."),
    ("certificate", "SERIAL", "Serial number."),
    ("certificate", "NOT_BEFORE", "Start of the validity period."),
    ("certificate", "NOT_AFTER", "End of the validity period."),
    ("certificate", "VERSION", "X.509 version."),
    ("san", "DNS", "DNS names."),
    ("san", "IP", "IP addresses."),
    ("san", "EMAIL", "Email addresses."),
    ("san", "URI", "URIs."),
    ("url", "HOST", "Host name."),
    ("url", "PORT", "Port number."),
    ("url", "PATH", "Path, without the leading slash."),
    ("url", "QUERY", "Query string, without the leading question mark."),
    ("url", "SCHEME", "Scheme, such as http or https."),
    ("url", "URL", "The whole URL."),
    ("http_cntl", "LOGGING", "Write a transaction log entry."),
    ("http_cntl", "INTERCEPT_RETRY", "Allow intercepting plugins to retry."),
    ("http_cntl", "RESP_CACHEABLE", "Force the response to be cacheable."),
    ("http_cntl", "REQ_CACHEABLE", "Force the request to be cacheable."),
    ("http_cntl", "SERVER_NO_STORE", "Do not store the origin response in cache."),
    ("http_cntl", "TXN_DEBUG", "Enable debug logging for this transaction."),
    ("http_cntl", "SKIP_REMAP", "Skip remap processing."),
];

static FUNCTIONS: &[(&str, &str)] = &[
    ("access", "True when the named file exists and is readable."),
    ("cache", "Result of the cache lookup: hit-fresh, hit-stale, miss or skipped."),
    ("cidr", "Client address masked to the given IPv4 and IPv6 prefix lengths."),
    ("internal", "True for transactions created internally by the proxy or a plugin."),
    ("random", "A random number below the argument."),
    ("ssn-txn-count", "Number of transactions on the current origin session."),
    ("txn-count", "Number of transactions on the current client connection."),
    ("add-header", "Add a header, keeping existing values."),
    ("counter", "Increment a named statistics counter."),
    ("set-debug", "Enable debug logging for this transaction."),
    ("no-op", "Do nothing."),
    ("remove_query", "Remove the named query parameters."),
    ("keep_query", "Remove every query parameter except the named ones."),
    ("run-plugin", "Run a remap plugin with the given arguments."),
    ("set-body-from", "Replace the response body with the contents of a URL."),
    ("set-cc-alg", "Set the TCP congestion control algorithm."),
    ("set-config", "Override a configuration setting for this transaction."),
    ("set-effective-address", "Use a different client address for this transaction."),
    ("set-redirect", "Redirect the client with the given status code."),
    ("skip-remap", "Skip remap processing when true."),
    ("set-plugin-cntl", "Set a plugin control option."),
];

/// A modifier written after `with`.
#[derive(Debug)]
pub struct ModifierDoc {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub title: &'static str,
    pub doc: &'static str,
}

/// Modifiers of a comparison, as in `inbound.url.path == "/api" with PRE`.
pub static CONDITION_MODIFIERS: &[ModifierDoc] = &[
    ModifierDoc {
        name: "NOCASE",
        aliases: &["NC", "I"],
        title: "Case Insensitive Matching",
        doc: "Compare without regard to letter case.",
    },
    ModifierDoc {
        name: "EXT",
        aliases: &[],
        title: "File Extension Matching",
        doc: "Match the file extension of the value, such as `.php` or `.html`.",
    },
    ModifierDoc {
        name: "PRE",
        aliases: &[],
        title: "Prefix Matching",
        doc: "Match when the value starts with the operand.",
    },
    ModifierDoc {
        name: "SUF",
        aliases: &[],
        title: "Suffix Matching",
        doc: "Match when the value ends with the operand.",
    },
    ModifierDoc {
        name: "MID",
        aliases: &[],
        title: "Substring Matching",
        doc: "Match when the operand appears anywhere in the value.",
    },
];

/// Modifiers of a statement, as in `set-redirect(302, "/x") with QSA;`.
pub static OPERATOR_MODIFIERS: &[ModifierDoc] = &[
    ModifierDoc {
        name: "L",
        aliases: &["LAST"],
        title: "Last Rule",
        doc: "Stop evaluating further rules after this one.",
    },
    ModifierDoc {
        name: "QSA",
        aliases: &[],
        title: "Query String Append",
        doc: "Keep the original query string when setting a destination or redirect.",
    },
    ModifierDoc {
        name: "INV",
        aliases: &["I"],
        title: "Invert",
        doc: "Invert the operation, such as keeping instead of removing query parameters.",
    },
];

/// Regular expression syntax explained on hover, in display order.
static PATTERN_ELEMENTS: &[(&str, &str)] = &[
    ("^", "start of the value"),
    ("$", "end of the value"),
    (r"\d", "a digit"),
    (r"\w", "a word character"),
    (r"\s", "whitespace"),
    ("(?i)", "case-insensitive from here on"),
    ("(?:", "non-capturing group"),
    ("[", "character class"),
    ("|", "alternation"),
    ("+", "one or more"),
    ("*", "zero or more"),
    ("?", "optional"),
];

/// Look up a modifier by name or alias, ignoring case.
pub fn modifier(modifiers: &'static [ModifierDoc], name: &str) -> Option<&'static ModifierDoc> {
    modifiers.iter().find(|m| {
        m.name.eq_ignore_ascii_case(name) || m.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    })
}

/// The syntax elements `pattern` uses.
pub fn pattern_elements(pattern: &str) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
    PATTERN_ELEMENTS
        .iter()
        .copied()
        .filter(move |(element, _)| pattern.contains(element))
}

/// Documentation for a namespace stem. Case-insensitive, so `SAN.` and `san.` agree.
pub fn namespace(stem: &str) -> Option<&'static str> {
    NAMESPACES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(stem))
        .map(|(_, doc)| *doc)
}

/// The top-level namespace of a stem, such as `inbound.` for `inbound.req.`.
pub fn top_level(stem: &str) -> Option<&str> {
    let dot = stem.find('.')?;
    Some(&stem[..=dot])
}

/// Documentation for a field in a group.
pub fn field(group: &str, name: &str) -> Option<&'static str> {
    FIELDS
        .iter()
        .find(|(g, f, _)| *g == group && f.eq_ignore_ascii_case(name))
        .map(|(_, _, doc)| *doc)
}

/// The field group documenting members of a suffix group.
pub fn group(group: SuffixGroup) -> Option<&'static str> {
    match group {
        SuffixGroup::Url => Some("url"),
        SuffixGroup::Geo => Some("geo"),
        SuffixGroup::Id => Some("identifier"),
        SuffixGroup::Date => Some("time"),
        SuffixGroup::Conn => Some("connection"),
        SuffixGroup::Cert => Some("certificate"),
        SuffixGroup::San => Some("san"),
        SuffixGroup::HttpCntl => Some("http_cntl"),
        SuffixGroup::Capture => None,
    }
}

/// Documentation for a condition or statement function.
pub fn function(name: &str) -> Option<&'static str> {
    FUNCTIONS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, doc)| *doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrw4u::{TableKind, Tables};

    #[test]
    fn test_modifiers_and_pattern_elements() {
        assert_eq!(modifier(CONDITION_MODIFIERS, "nc").map(|m| m.name), Some("NOCASE"));
        assert_eq!(modifier(CONDITION_MODIFIERS, "I").map(|m| m.name), Some("NOCASE"));
        assert_eq!(modifier(OPERATOR_MODIFIERS, "I").map(|m| m.name), Some("INV"));
        assert_eq!(modifier(OPERATOR_MODIFIERS, "last").map(|m| m.name), Some("L"));
        assert!(modifier(CONDITION_MODIFIERS, "QSA").is_none());

        let found: Vec<_> = pattern_elements(r"^api/v\d+$").map(|(e, _)| e).collect();
        assert_eq!(found, vec!["^", "$", r"\d", "+"]);
    }

    #[test]
    fn test_lookups() {
        assert!(namespace("inbound.conn.client-cert.SAN.").is_some());
        assert_eq!(top_level("inbound.req."), Some("inbound."));
        assert_eq!(top_level("now"), None);
        assert_eq!(field("time", "hour"), Some("Hour of the day, 0 to 23."));
        assert_eq!(field("time", "PATH"), None);
    }

    #[test]
    fn test_every_function_is_documented() {
        let tables = Tables::new();
        for kind in [TableKind::Function, TableKind::StatementFunction] {
            for entry in tables.entries(kind) {
                assert!(function(entry.key).is_some(), "{}", entry.key);
            }
        }
    }
}
