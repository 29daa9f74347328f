//! Configuration loading.
//!
//! Options come from two files, merged table by table:
//! 1. Global: `$XDG_CONFIG_HOME/hrw4u/config.toml` (or `~/.config/hrw4u/config.toml`)
//! 2. Per-project: `.hrw4u/config.toml` under the working directory
//!
//! A key set in the project file wins over the same key in the global file.
//! Keys set in neither keep their defaults. Command-line flags are applied
//! on top by the caller.

use anyhow::{Context as _, Result};
use hrw4u::Options;
use std::path::{Path, PathBuf};
use toml::Table;

/// Load options for a project rooted at `root`.
pub fn load(root: &Path) -> Result<Options> {
    load_from(global_config_path().as_deref(), root)
}

/// Load options from an explicit global path and a project root.
pub fn load_from(global: Option<&Path>, root: &Path) -> Result<Options> {
    let mut merged = Table::new();
    if let Some(path) = global
        && let Some(table) = load_file(path)?
    {
        merge(&mut merged, table);
    }
    let project = root.join(".hrw4u").join("config.toml");
    if let Some(table) = load_file(&project)? {
        merge(&mut merged, table);
    }
    toml::Value::Table(merged)
        .try_into()
        .context("invalid hrw4u configuration")
}

fn global_config_path() -> Option<PathBuf> {
    let config_home = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
    Some(config_home.join("hrw4u").join("config.toml"))
}

/// A missing file is not an error, an unreadable or malformed one is.
fn load_file(path: &Path) -> Result<Option<Table>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let table = content
        .parse::<Table>()
        .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(Some(table))
}

/// Merge `other` into `base`. Nested tables merge key by key, anything else is replaced.
fn merge(base: &mut Table, other: Table) {
    for (key, value) in other {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrw4u::{ErrorPolicy, SectionType};
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let options = load_from(Some(&dir.path().join("missing.toml")), dir.path()).unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn test_project_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global").join("config.toml");
        write(
            &global,
            "[compile]\npolicy = \"abort\"\n\n[decompile]\ndefault_section = \"REMAP\"\nmerge_sections = false\n",
        );
        let project = dir.path().join("project");
        write(
            &project.join(".hrw4u").join("config.toml"),
            "[decompile]\ndefault_section = \"SEND_RESPONSE\"\n\n[output]\nindent = 2\n",
        );

        let options = load_from(Some(&global), &project).unwrap();
        assert_eq!(options.compile.policy, ErrorPolicy::Abort);
        assert_eq!(options.decompile.default_section, SectionType::SendResponse);
        // Untouched keys of a table named in both files survive.
        assert!(!options.decompile.merge_sections);
        assert_eq!(options.output.indent, 2);
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join(".hrw4u").join("config.toml"), "[compile\n");
        let err = load_from(None, dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse"), "{err:#}");

        write(
            &dir.path().join(".hrw4u").join("config.toml"),
            "[decompile]\ndefault_section = \"NOWHERE\"\n",
        );
        let err = load_from(None, dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid hrw4u configuration"), "{err:#}");
    }
}
