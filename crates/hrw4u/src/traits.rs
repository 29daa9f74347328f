//! Traits for format readers and writers.

use crate::config::Options;
use crate::error::{Error, Translation};
use crate::ir::{Program, Span};
use crate::tables::Tables;

/// Error that can occur when reading text into IR.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String, span: Span },

    #[error("expected {expected}, got '{got}'")]
    Unexpected {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("unterminated {what}")]
    Unterminated { what: &'static str, span: Span },
}

impl ReadError {
    pub fn span(&self) -> Span {
        match self {
            ReadError::UnexpectedEof { span, .. }
            | ReadError::Unexpected { span, .. }
            | ReadError::Unterminated { span, .. } => *span,
        }
    }
}

impl From<ReadError> for Error {
    fn from(err: ReadError) -> Self {
        let token = match &err {
            ReadError::Unexpected { got, .. } => got.clone(),
            ReadError::UnexpectedEof { .. } => "end of input".to_string(),
            ReadError::Unterminated { what, .. } => what.to_string(),
        };
        Error::Syntax {
            token,
            message: err.to_string(),
        }
    }
}

/// Everything a reader or writer needs besides its input.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub tables: &'a Tables,
    pub options: &'a Options,
    /// Name used in diagnostics.
    pub filename: &'a str,
}

impl<'a> Context<'a> {
    pub fn new(tables: &'a Tables, options: &'a Options, filename: &'a str) -> Self {
        Self {
            tables,
            options,
            filename,
        }
    }
}

/// A reader turns text in some format into the IR.
pub trait Reader: Send + Sync {
    /// Format identifier (e.g., "hrw4u", "header_rewrite").
    fn format(&self) -> &'static str;

    /// File extensions this reader handles (e.g., &["hrw4u"]).
    fn extensions(&self) -> &'static [&'static str];

    /// Read text into the IR, collecting errors.
    fn read(&self, source: &str, ctx: &Context<'_>) -> Translation<Program>;
}

/// A writer emits the IR in some format.
pub trait Writer: Send + Sync {
    /// Format identifier (e.g., "hrw4u", "header_rewrite").
    fn format(&self) -> &'static str;

    /// File extension for output (e.g., "config").
    fn extension(&self) -> &'static str;

    /// Emit the IR, collecting errors.
    fn write(&self, program: &Program, ctx: &Context<'_>) -> Translation<String>;
}
