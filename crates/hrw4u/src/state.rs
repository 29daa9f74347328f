//! Modifier flags carried by one condition line or one operator line.
//!
//! Both are small value types: built fresh for each term or statement,
//! rendered once as a ` [A,B]` suffix when writing, parsed once when reading.

/// How a condition combines with the one after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn as_str(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Flags of one condition line.
///
/// A condition with no connector is the last of its chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CondState {
    pub negate: bool,
    pub connector: Option<Connector>,
    pub nocase: bool,
    pub ext: bool,
    pub pre: bool,
    pub suf: bool,
    pub mid: bool,
}

impl CondState {
    pub fn negated(negate: bool) -> Self {
        Self {
            negate,
            ..Self::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.connector.is_none()
    }

    /// Apply a match modifier as written after `with`. Returns false if unknown.
    pub fn apply_match_modifier(&mut self, modifier: &str) -> bool {
        match modifier.to_ascii_uppercase().as_str() {
            "NOCASE" | "NC" | "I" => self.nocase = true,
            "EXT" => self.ext = true,
            "PRE" => self.pre = true,
            "SUF" => self.suf = true,
            "MID" => self.mid = true,
            _ => return false,
        }
        true
    }

    /// Parse the bracketed flags of a directive line.
    pub fn from_flags(flags: &[String]) -> Result<Self, String> {
        let mut state = Self::default();
        for flag in flags {
            match flag.to_ascii_uppercase().as_str() {
                "NOT" | "N" => state.negate = true,
                "OR" | "O" => state.connector = Some(Connector::Or),
                "AND" => state.connector = Some(Connector::And),
                _ if state.apply_match_modifier(flag) => {}
                _ => return Err(flag.clone()),
            }
        }
        Ok(state)
    }

    /// Match modifiers in source spelling, for a `with` clause.
    pub fn match_modifiers(&self) -> Vec<&'static str> {
        [
            (self.nocase, "NOCASE"),
            (self.ext, "EXT"),
            (self.pre, "PRE"),
            (self.suf, "SUF"),
            (self.mid, "MID"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }

    pub fn flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.negate {
            flags.push("NOT");
        }
        if let Some(connector) = self.connector {
            flags.push(connector.as_str());
        }
        flags.extend(self.match_modifiers());
        flags
    }

    /// ` [NOT,OR,NOCASE]`, or nothing.
    pub fn render(&self) -> String {
        render_flags(&self.flags())
    }
}

/// Flags of one operator line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperatorState {
    pub last: bool,
    pub qsa: bool,
    pub invert: bool,
}

impl OperatorState {
    /// Returns false if the flag is unknown.
    pub fn apply(&mut self, flag: &str) -> bool {
        match flag.to_ascii_uppercase().as_str() {
            "L" | "LAST" => self.last = true,
            "QSA" => self.qsa = true,
            "INV" | "I" => self.invert = true,
            _ => return false,
        }
        true
    }

    pub fn from_flags(flags: &[String]) -> Result<Self, String> {
        let mut state = Self::default();
        for flag in flags {
            if !state.apply(flag) {
                return Err(flag.clone());
            }
        }
        Ok(state)
    }

    pub fn flags(&self) -> Vec<&'static str> {
        [(self.last, "L"), (self.qsa, "QSA"), (self.invert, "INV")]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect()
    }

    pub fn render(&self) -> String {
        render_flags(&self.flags())
    }
}

fn render_flags(flags: &[&str]) -> String {
    if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_order() {
        let mut state = CondState::negated(true);
        state.connector = Some(Connector::Or);
        assert!(state.apply_match_modifier("suf"));
        assert!(state.apply_match_modifier("NC"));
        assert_eq!(state.render(), " [NOT,OR,NOCASE,SUF]");
        assert!(!state.is_terminal());
        assert_eq!(CondState::default().render(), "");
    }

    #[test]
    fn test_parse_flags() {
        let flags = |f: &[&str]| f.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let state = CondState::from_flags(&flags(&["N", "O", "I"])).unwrap();
        assert!(state.negate && state.nocase);
        assert_eq!(state.connector, Some(Connector::Or));
        assert_eq!(CondState::from_flags(&flags(&["BOGUS"])), Err("BOGUS".to_string()));

        let op = OperatorState::from_flags(&flags(&["L", "QSA"])).unwrap();
        assert_eq!(op.render(), " [L,QSA]");
        assert!(OperatorState::from_flags(&flags(&["NOT"])).is_err());
    }
}
