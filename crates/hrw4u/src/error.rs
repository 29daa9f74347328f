//! Errors and located diagnostics.
//!
//! Translation never fails outright on bad input. Each problem becomes a
//! [`Diagnostic`] attached to the smallest statement, term or directive line
//! responsible, and the caller receives a [`Translation`] carrying both the
//! output produced so far and every diagnostic.

use crate::ir::Span;
use crate::sections::SectionType;
use serde::Serialize;
use std::fmt;

/// Classification of a translation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnknownSymbol,
    SectionRestricted,
    ValidationFailed,
    VariableError,
    MalformedDirective,
    Syntax,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnknownSymbol => "unknown symbol",
            ErrorKind::SectionRestricted => "section restricted",
            ErrorKind::ValidationFailed => "validation failed",
            ErrorKind::VariableError => "variable error",
            ErrorKind::MalformedDirective => "malformed directive",
            ErrorKind::Syntax => "syntax error",
        };
        f.write_str(name)
    }
}

/// A single translation error, without location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("'{symbol}' is not available in section {section}")]
    SectionRestricted {
        symbol: String,
        section: SectionType,
    },

    #[error("{token}: {reason}")]
    ValidationFailed {
        rule: &'static str,
        token: String,
        reason: String,
    },

    #[error("variable '{name}': {reason}")]
    Variable { name: String, reason: String },

    #[error("malformed directive '{line}': {reason}")]
    MalformedDirective { line: String, reason: String },

    #[error("syntax error near '{token}': {message}")]
    Syntax { token: String, message: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownSymbol(_) => ErrorKind::UnknownSymbol,
            Error::SectionRestricted { .. } => ErrorKind::SectionRestricted,
            Error::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Error::Variable { .. } => ErrorKind::VariableError,
            Error::MalformedDirective { .. } => ErrorKind::MalformedDirective,
            Error::Syntax { .. } => ErrorKind::Syntax,
        }
    }

    /// The source text the error is about.
    pub fn offending(&self) -> &str {
        match self {
            Error::UnknownSymbol(symbol) => symbol,
            Error::SectionRestricted { symbol, .. } => symbol,
            Error::ValidationFailed { token, .. } => token,
            Error::Variable { name, .. } => name,
            Error::MalformedDirective { line, .. } => line,
            Error::Syntax { token, .. } => token,
        }
    }

    pub(crate) fn validation(
        rule: &'static str,
        token: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::ValidationFailed {
            rule,
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn variable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Variable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedDirective {
            line: line.into(),
            reason: reason.into(),
        }
    }
}

/// An error with the file and position it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    /// 1-based line number.
    pub line: Option<usize>,
    /// 1-based column.
    pub column: Option<usize>,
    pub error: Error,
}

impl Diagnostic {
    pub fn new(file: &str, span: Option<Span>, error: Error) -> Self {
        Self {
            file: file.to_string(),
            line: span.map(|s| s.line),
            column: span.map(|s| s.column),
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.file, line, self.error),
            None => write!(f, "{}: {}", self.file, self.error),
        }
    }
}

/// Output of a translation together with the errors met on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation<T> {
    pub output: T,
    pub errors: Vec<Diagnostic>,
}

impl<T> Translation<T> {
    pub fn new(output: T, errors: Vec<Diagnostic>) -> Self {
        Self { output, errors }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<T, Vec<Diagnostic>> {
        if self.errors.is_empty() {
            Ok(self.output)
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_offending() {
        let err = Error::validation("arg_count", "cidr", "expected 2 arguments, got 1");
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.offending(), "cidr");
        assert_eq!(err.to_string(), "cidr: expected 2 arguments, got 1");
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(
            "rules.hrw4u",
            Some(Span { line: 3, column: 5 }),
            Error::UnknownSymbol("inbound.nope".into()),
        );
        assert_eq!(diag.to_string(), "rules.hrw4u:3: unknown symbol 'inbound.nope'");
        assert_eq!(diag.column, Some(5));
    }
}
