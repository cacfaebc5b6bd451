use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;
use tracing::debug;

use crate::accessor::{reject_unknown_keys, render, FieldAccessor};
use crate::error::{Error, Result};

const KEY: &str = "project.readme";

/// The resolved `project.readme`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readme {
    /// Read from a file under the project root.
    File {
        path: PathBuf,
        text: String,
        content_type: String,
    },
    /// Given inline with `readme = { text = "...", content-type = "..." }`.
    Text { text: String, content_type: String },
}

impl Readme {
    pub fn text(&self) -> &str {
        match self {
            Readme::File { text, .. } | Readme::Text { text, .. } => text,
        }
    }

    pub fn file(&self) -> Option<&Path> {
        match self {
            Readme::File { path, .. } => Some(path),
            Readme::Text { .. } => None,
        }
    }

    /// MIME type for `Description-Content-Type`.
    pub fn content_type(&self) -> &str {
        match self {
            Readme::File { content_type, .. } | Readme::Text { content_type, .. } => content_type,
        }
    }
}

/// Content type implied by a readme file name.
///
/// A name without any extension is taken as plain text; an extension other
/// than `.md`, `.rst` or `.txt` is unknown.
///
/// ```
/// use pyproject_metadata::guess_content_type;
///
/// assert_eq!(guess_content_type("README.md"), Some("text/markdown"));
/// assert_eq!(guess_content_type("docs/README.RST"), Some("text/x-rst"));
/// assert_eq!(guess_content_type("README"), Some("text/plain"));
/// assert_eq!(guess_content_type("README.adoc"), None);
/// ```
pub fn guess_content_type(file: &str) -> Option<&'static str> {
    let extension = match Path::new(file).extension() {
        Some(extension) => extension.to_string_lossy().to_ascii_lowercase(),
        None => return Some("text/plain"),
    };
    match extension.as_str() {
        "md" => Some("text/markdown"),
        "rst" => Some("text/x-rst"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

/// Validate `project.readme` and load the text it points at.
///
/// In the table form, empty `file` or `text` values count as absent.
pub(crate) fn resolve(accessor: &mut FieldAccessor, value: &Value, project_root: &Path) -> Result<Readme> {
    match value {
        Value::String(file) => {
            let content_type = guess_content_type(file).ok_or_else(|| Error::UnknownContentType {
                path: file.clone(),
            })?;
            read_file(project_root, file, content_type)
        }
        Value::Table(table) => {
            reject_unknown_keys(KEY, table, &["content-type", "file", "text"])?;
            let content_type = accessor.get_str("readme.content-type")?;
            let file = accessor.get_str("readme.file")?.filter(|s| !s.is_empty());
            let text = accessor.get_str("readme.text")?.filter(|s| !s.is_empty());

            let source = match (file, text) {
                (Some(file), None) => Ok(file),
                (None, Some(text)) => Err(text),
                _ => {
                    return Err(Error::InvalidUnion {
                        key: KEY.to_string(),
                        got: render(value),
                    })
                }
            };
            let content_type = content_type.ok_or_else(|| Error::MissingField {
                key: format!("{KEY}.content-type"),
            })?;
            match source {
                Ok(file) => read_file(project_root, file, content_type),
                Err(text) => Ok(Readme::Text {
                    text: text.to_string(),
                    content_type: content_type.to_string(),
                }),
            }
        }
        other => Err(Error::InvalidType {
            key: KEY.to_string(),
            expected: "either, a string or dictionary of strings",
            got: render(other),
        }),
    }
}

fn read_file(project_root: &Path, file: &str, content_type: &str) -> Result<Readme> {
    let path = project_root.join(file);
    if !path.is_file() {
        return Err(Error::FileNotFound {
            kind: "Readme",
            path: file.to_string(),
        });
    }
    let text = fs::read_to_string(&path).map_err(|e| Error::FileRead {
        kind: "Readme",
        path: file.to_string(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), content_type, "resolved readme file");
    Ok(Readme::File {
        path,
        text,
        content_type: content_type.to_string(),
    })
}
