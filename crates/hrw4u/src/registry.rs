//! Registry of the built-in readers and writers.

use crate::input::{DIRECTIVES_READER, HRW4U_READER};
use crate::output::{DIRECTIVES_WRITER, HRW4U_WRITER};
use crate::traits::{Reader, Writer};

static READERS: [&'static dyn Reader; 2] = [&HRW4U_READER, &DIRECTIVES_READER];
static WRITERS: [&'static dyn Writer; 2] = [&HRW4U_WRITER, &DIRECTIVES_WRITER];

/// Get a reader by format name.
pub fn reader_for_format(format: &str) -> Option<&'static dyn Reader> {
    READERS.iter().find(|r| r.format() == format).copied()
}

/// Get a reader by file extension.
pub fn reader_for_extension(ext: &str) -> Option<&'static dyn Reader> {
    READERS
        .iter()
        .find(|r| r.extensions().contains(&ext))
        .copied()
}

/// Get a writer by format name.
pub fn writer_for_format(format: &str) -> Option<&'static dyn Writer> {
    WRITERS.iter().find(|w| w.format() == format).copied()
}

/// Get all readers.
pub fn readers() -> &'static [&'static dyn Reader] {
    &READERS
}

/// Get all writers.
pub fn writers() -> &'static [&'static dyn Writer] {
    &WRITERS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::tables::Tables;
    use crate::traits::Context;

    #[test]
    fn test_reader_lookup() {
        let reader = reader_for_format("hrw4u").expect("hrw4u reader");
        assert!(reader.extensions().contains(&"hrw4u"));

        let reader = reader_for_extension("config").expect("config extension");
        assert_eq!(reader.format(), "header_rewrite");
        assert!(reader_for_extension("lua").is_none());
    }

    #[test]
    fn test_writer_lookup() {
        let writer = writer_for_format("header_rewrite").expect("directives writer");
        assert_eq!(writer.extension(), "config");
        assert_eq!(writers().len(), 2);
        assert_eq!(readers().len(), 2);
    }

    #[test]
    fn test_roundtrip_via_registry() {
        let tables = Tables::new();
        let options = Options::default();
        let ctx = Context::new(&tables, &options, "registry");

        let reader = reader_for_format("hrw4u").unwrap();
        let writer = writer_for_format("header_rewrite").unwrap();
        let program = reader.read("REMAP { inbound.req.X-A = \"1\"; }", &ctx).output;
        let directives = writer.write(&program, &ctx).output;
        assert!(directives.contains("set-header X-A \"1\""));

        let reader = reader_for_format("header_rewrite").unwrap();
        let writer = writer_for_format("hrw4u").unwrap();
        let program = reader.read(&directives, &ctx).output;
        let source = writer.write(&program, &ctx).output;
        assert!(source.contains("inbound.req.X-A = \"1\";"));
    }
}
