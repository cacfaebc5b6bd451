use std::path::{Path, PathBuf};

use toml::Value;
use tracing::debug;

use crate::accessor::{expect_table, reject_unknown_keys, render, FieldAccessor};
use crate::error::{Error, Result};

const KEY: &str = "project.license";

/// The `project.license` table.
///
/// Exactly one of `file` or `text` is given. A file-backed license is only
/// checked for existence; its contents are never inlined into core
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum License {
    /// `license = { file = "LICENSE" }`, resolved against the project root.
    File(PathBuf),
    /// `license = { text = "MIT" }`.
    Text(String),
}

impl License {
    pub fn file(&self) -> Option<&Path> {
        match self {
            License::File(path) => Some(path),
            License::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            License::Text(text) => Some(text),
            License::File(_) => None,
        }
    }
}

/// Validate `project.license` and check a referenced file exists.
///
/// Empty `file` or `text` values count as absent.
pub(crate) fn resolve(accessor: &mut FieldAccessor, value: &Value, project_root: &Path) -> Result<License> {
    let table = expect_table(KEY, value, "a dictionary of strings")?;
    reject_unknown_keys(KEY, table, &["file", "text"])?;
    let file = accessor.get_str("license.file")?.filter(|s| !s.is_empty());
    let text = accessor.get_str("license.text")?.filter(|s| !s.is_empty());

    match (file, text) {
        (Some(file), None) => {
            let path = project_root.join(file);
            if !path.is_file() {
                return Err(Error::FileNotFound {
                    kind: "License",
                    path: file.to_string(),
                });
            }
            debug!(path = %path.display(), "resolved license file");
            Ok(License::File(path))
        }
        (None, Some(text)) => Ok(License::Text(text.to_string())),
        _ => Err(Error::InvalidUnion {
            key: KEY.to_string(),
            got: render(value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use toml::Table;

    fn resolve_in(root: &Path, src: &str) -> Result<License> {
        let project: Table = toml::from_str(src).unwrap();
        let mut accessor = FieldAccessor::new(&project);
        let value = accessor.get("license").unwrap();
        resolve(&mut accessor, value, root)
    }

    #[test]
    fn text_license() {
        let dir = tempfile::tempdir().unwrap();
        let license = resolve_in(dir.path(), "license = { text = 'MIT' }").unwrap();
        assert_eq!(license, License::Text("MIT".into()));
        assert_eq!(license.text(), Some("MIT"));
        assert_eq!(license.file(), None);
    }

    #[test]
    fn file_license() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("LICENSE"), "Copyright").unwrap();
        let license = resolve_in(dir.path(), "license = { file = 'LICENSE' }").unwrap();
        assert_eq!(license.file(), Some(dir.path().join("LICENSE").as_path()));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_in(dir.path(), "license = { file = 'this-file-does-not-exist' }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "License file not found (\"this-file-does-not-exist\")"
        );
    }

    #[test]
    fn union_violations() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_in(dir.path(), "license = { file = '...', text = '...' }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid \"project.license\" value, expecting either \"file\" or \"text\" (got \"{'file': '...', 'text': '...'}\")"
        );
        let err = resolve_in(dir.path(), "license = {}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid \"project.license\" value, expecting either \"file\" or \"text\" (got \"{}\")"
        );
        assert!(resolve_in(dir.path(), "license = { text = '' }").is_err());
    }

    #[test]
    fn type_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_in(dir.path(), "license = 'MIT'").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field \"project.license\" has an invalid type, expecting a dictionary of strings (got \"MIT\")"
        );
        let err = resolve_in(dir.path(), "license = { file = true }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field \"project.license.file\" has an invalid type, expecting a string (got \"True\")"
        );
        let err = resolve_in(dir.path(), "license = { made-up = ':(' }").unwrap_err();
        assert_eq!(err.to_string(), "Unexpected field \"project.license.made-up\"");
    }
}
