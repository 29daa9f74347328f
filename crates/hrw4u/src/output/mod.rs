//! Output writers - emit IR as text.

pub mod directives;
pub mod hrw4u;

pub use directives::{DIRECTIVES_WRITER, DirectivesWriter, compile};
pub use hrw4u::{HRW4U_WRITER, Hrw4uWriter, Printer};
