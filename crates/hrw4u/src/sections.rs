//! Rule phases ("sections") and their hooks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One phase of the proxy transaction at which a rule block runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    PreRemap,
    Remap,
    ReadRequest,
    SendRequest,
    ReadResponse,
    SendResponse,
    TxnStart,
    TxnClose,
}

impl SectionType {
    /// Every section, in transaction lifecycle order.
    pub const ALL: [SectionType; 8] = [
        SectionType::TxnStart,
        SectionType::PreRemap,
        SectionType::Remap,
        SectionType::ReadRequest,
        SectionType::SendRequest,
        SectionType::ReadResponse,
        SectionType::SendResponse,
        SectionType::TxnClose,
    ];

    /// Surface name as written in source form.
    pub fn name(self) -> &'static str {
        match self {
            SectionType::PreRemap => "PRE_REMAP",
            SectionType::Remap => "REMAP",
            SectionType::ReadRequest => "READ_REQUEST",
            SectionType::SendRequest => "SEND_REQUEST",
            SectionType::ReadResponse => "READ_RESPONSE",
            SectionType::SendResponse => "SEND_RESPONSE",
            SectionType::TxnStart => "TXN_START",
            SectionType::TxnClose => "TXN_CLOSE",
        }
    }

    /// Hook name used in the directive guard `cond %{HOOK}`.
    pub fn hook(self) -> &'static str {
        match self {
            SectionType::PreRemap => "READ_REQUEST_PRE_REMAP_HOOK",
            SectionType::Remap => "REMAP_PSEUDO_HOOK",
            SectionType::ReadRequest => "READ_REQUEST_HDR_HOOK",
            SectionType::SendRequest => "SEND_REQUEST_HDR_HOOK",
            SectionType::ReadResponse => "READ_RESPONSE_HDR_HOOK",
            SectionType::SendResponse => "SEND_RESPONSE_HDR_HOOK",
            SectionType::TxnStart => "TXN_START_HOOK",
            SectionType::TxnClose => "TXN_CLOSE_HOOK",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SectionType::PreRemap => "Runs before remap processing of the client request",
            SectionType::Remap => "Runs during remap, as part of a remap.config rule",
            SectionType::ReadRequest => "Runs after the client request headers are read",
            SectionType::SendRequest => "Runs before the request is sent to the origin",
            SectionType::ReadResponse => "Runs after the origin response headers are read",
            SectionType::SendResponse => "Runs before the response is sent to the client",
            SectionType::TxnStart => "Runs when the transaction starts",
            SectionType::TxnClose => "Runs when the transaction closes",
        }
    }

    /// Position in the transaction lifecycle.
    pub fn order(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Look up a section by its surface name, ignoring case.
    pub fn from_name(name: &str) -> Option<SectionType> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Look up a section by its hook name.
    pub fn from_hook(hook: &str) -> Option<SectionType> {
        Self::ALL.into_iter().find(|s| s.hook() == hook)
    }

    /// Whether the section runs before the origin is contacted.
    pub fn is_pre_origin(self) -> bool {
        matches!(
            self,
            SectionType::PreRemap | SectionType::Remap | SectionType::ReadRequest
        )
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SectionSet(u16);

impl SectionSet {
    pub const EMPTY: SectionSet = SectionSet(0);

    /// Every section except the transaction start/close hooks.
    pub const HTTP: SectionSet = SectionSet::of(&[
        SectionType::PreRemap,
        SectionType::Remap,
        SectionType::ReadRequest,
        SectionType::SendRequest,
        SectionType::ReadResponse,
        SectionType::SendResponse,
    ]);

    pub const fn of(sections: &[SectionType]) -> SectionSet {
        let mut bits = 0u16;
        let mut i = 0;
        while i < sections.len() {
            bits |= 1 << (sections[i] as u16);
            i += 1;
        }
        SectionSet(bits)
    }

    pub fn contains(self, section: SectionType) -> bool {
        self.0 & section.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in lifecycle order.
    pub fn iter(self) -> impl Iterator<Item = SectionType> {
        SectionType::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl fmt::Display for SectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(SectionType::name).collect();
        f.write_str(&names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hooks_are_one_to_one() {
        let names: HashSet<_> = SectionType::ALL.iter().map(|s| s.name()).collect();
        let hooks: HashSet<_> = SectionType::ALL.iter().map(|s| s.hook()).collect();
        assert_eq!(names.len(), SectionType::ALL.len());
        assert_eq!(hooks.len(), SectionType::ALL.len());
        for section in SectionType::ALL {
            assert_eq!(SectionType::from_hook(section.hook()), Some(section));
            assert_eq!(SectionType::from_name(section.name()), Some(section));
        }
    }

    #[test]
    fn test_from_name_ignores_case() {
        assert_eq!(SectionType::from_name("remap"), Some(SectionType::Remap));
        assert_eq!(SectionType::from_name("NOPE"), None);
    }

    #[test]
    fn test_http_set() {
        assert!(SectionSet::HTTP.contains(SectionType::Remap));
        assert!(!SectionSet::HTTP.contains(SectionType::TxnStart));
        assert!(!SectionSet::HTTP.contains(SectionType::TxnClose));
        assert_eq!(SectionSet::HTTP.iter().count(), 6);
    }

    #[test]
    fn test_set_display_follows_lifecycle() {
        let set = SectionSet::of(&[SectionType::ReadResponse, SectionType::SendRequest]);
        assert_eq!(set.to_string(), "SEND_REQUEST, READ_RESPONSE");
    }
}
