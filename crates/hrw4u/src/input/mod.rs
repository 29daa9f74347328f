//! Input readers - parse text into IR.

pub mod directives;
pub mod hrw4u;

pub use directives::{DIRECTIVES_READER, DirectivesReader, read_directives};
pub use hrw4u::{HRW4U_READER, Hrw4uReader, read_hrw4u};
