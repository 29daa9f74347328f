//! Translation options.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [compile]
//! policy = "continue"        # or "abort"
//!
//! [decompile]
//! default_section = "READ_RESPONSE"
//! merge_sections = true
//!
//! [output]
//! indent = 4
//! ```
//!
//! Loading files is the caller's job. This module only describes the values.

use crate::sections::SectionType;
use serde::{Deserialize, Serialize};

/// What to do with the rest of a document after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Skip the failing statement and keep going (batch use).
    #[default]
    Continue,
    /// Stop at the first error (interactive use).
    Abort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub policy: ErrorPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompileOptions {
    /// Section for rule blocks that carry no hook guard.
    pub default_section: SectionType,
    /// Merge adjacent blocks of the same hook into one section.
    pub merge_sections: bool,
}

impl Default for DecompileOptions {
    fn default() -> Self {
        Self {
            default_section: SectionType::ReadResponse,
            merge_sections: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

impl OutputOptions {
    pub fn pad(&self, level: usize) -> String {
        " ".repeat(self.indent * level)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub compile: CompileOptions,
    pub decompile: DecompileOptions,
    pub output: OutputOptions,
}

impl Options {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        let options = Options::from_toml("").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.decompile.default_section, SectionType::ReadResponse);
        assert_eq!(options.output.indent, 4);
    }

    #[test]
    fn test_partial_tables() {
        let options = Options::from_toml(
            r#"
[compile]
policy = "abort"

[decompile]
default_section = "REMAP"
"#,
        )
        .unwrap();
        assert_eq!(options.compile.policy, ErrorPolicy::Abort);
        assert_eq!(options.decompile.default_section, SectionType::Remap);
        assert!(options.decompile.merge_sections);
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(Options::from_toml("[decompile]\ndefault_section = \"LUNCH\"").is_err());
    }
}
