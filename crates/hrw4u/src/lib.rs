//! Bidirectional translation between hrw4u rules and header_rewrite directives.
//!
//! `hrw4u` source is block-scoped: hook sections, typed variables, and
//! `if`/`elif`/`else` over boolean expressions. The header_rewrite engine
//! reads a flat list of `cond` and operator lines annotated with flags. Both
//! directions share one IR and one set of semantic tables.
//!
//! # Architecture
//!
//! ```text
//! hrw4u text ──────> input::hrw4u ───────┐            ┌──> output::directives ──> directive lines
//!                                        ├─> Program ─┤
//! directive lines ─> input::directives ──┘   (ir)     └──> output::hrw4u ───────> hrw4u text
//! ```
//!
//! [`Tables`] drives every arrow except the pure syntax ones, and also backs
//! the pattern matcher used by the editor service.
//!
//! # Example
//!
//! ```ignore
//! use hrw4u::{Context, Options, Tables, compile_source, decompile};
//!
//! let tables = Tables::new();
//! let options = Options::default();
//! let ctx = Context::new(&tables, &options, "rules.hrw4u");
//!
//! let compiled = compile_source("REMAP { inbound.req.X-Foo = \"1\"; }", &ctx);
//! // cond %{REMAP_PSEUDO_HOOK} [AND]
//! //     set-header X-Foo "1"
//!
//! let source = decompile(&compiled.output, &ctx);
//! // REMAP {
//! //     inbound.req.X-Foo = "1";
//! // }
//! ```
//!
//! # Errors
//!
//! Translation never panics on bad input. Every call returns a
//! [`Translation`] holding the output produced so far plus one
//! [`Diagnostic`] per problem, located at the offending statement, term or
//! directive line.

pub mod config;
pub mod error;
pub mod input;
pub mod ir;
pub mod output;
pub mod patterns;
pub mod registry;
pub mod reverse;
pub mod sections;
pub mod state;
pub mod tables;
pub mod traits;
pub mod validate;
pub mod vars;

// Re-exports: IR and errors
pub use error::{Diagnostic, Error, ErrorKind, Translation};
pub use ir::{Program, StructureEq};

// Re-exports: tables and configuration
pub use config::{ErrorPolicy, Options};
pub use patterns::{Family, PatternMatch, match_pattern, match_pattern_in};
pub use sections::{SectionSet, SectionType};
pub use tables::{TableEntry, TableKind, Tables};
pub use vars::VarType;

// Re-exports: traits and registry
pub use registry::{reader_for_extension, reader_for_format, readers, writers};
pub use traits::{Context, ReadError, Reader, Writer};

// Re-exports: built-in readers and writers
pub use input::{DIRECTIVES_READER, HRW4U_READER, read_directives, read_hrw4u};
pub use output::{DIRECTIVES_WRITER, HRW4U_WRITER, Printer};

/// Compile hrw4u source text to directive lines.
pub fn compile_source(source: &str, ctx: &Context<'_>) -> Translation<Vec<String>> {
    let Translation { output, errors } = HRW4U_READER.read(source, ctx);
    if !errors.is_empty() {
        return Translation::new(Vec::new(), errors);
    }
    output::compile(&output, ctx)
}

/// Rebuild hrw4u source text from directive lines.
pub fn decompile<S: AsRef<str>>(lines: &[S], ctx: &Context<'_>) -> Translation<String> {
    let Translation {
        output: program,
        mut errors,
    } = read_directives(lines, ctx);
    let written = HRW4U_WRITER.write(&program, ctx);
    errors.extend(written.errors);
    Translation::new(written.output, errors)
}
