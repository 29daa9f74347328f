//! Editor service for hrw4u documents.
//!
//! Everything here works on a [`DocumentState`] built once per version of a
//! document. Lookups that fail degrade to "no information": hover returns
//! `None`, completion returns an empty list. Nothing in this crate panics on
//! partial or malformed input.
//!
//! Positions are zero-based lines and characters, like the editor protocol.
//! The transport in `main.rs` converts to and from `lsp_types`.

pub mod completion;
pub mod diagnostics;
pub mod docs;
pub mod document;
pub mod hover;

pub use completion::{CompletionItem, CompletionKind, completion};
pub use diagnostics::{EditorDiagnostic, Severity, diagnostics};
pub use document::{
    DocumentState, DocumentStore, ModifierList, Position, Range, SectionSpan, VarInfo,
};
pub use hover::{Hover, hover};
