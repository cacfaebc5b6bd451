use winnow::error::{ContextError, ParseError, StrContext};

/// Failure of one of the PEP 440 / PEP 508 micro-grammars.
///
/// These are the causes nested inside an [`Error`] when a field of the
/// `[project]` table holds a string that does not parse.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GrammarError {
    /// Invalid PEP 440 version.
    #[error("invalid version: {0}")]
    InvalidVersion(String),

    /// Invalid PEP 440 specifier or specifier set.
    #[error("invalid specifier: {0}")]
    InvalidSpecifier(String),

    /// Invalid PEP 508 environment marker.
    #[error("invalid marker: {0}")]
    InvalidMarker(String),

    /// Invalid PEP 508 requirement.
    #[error("invalid requirement: {0}")]
    InvalidRequirement(String),
}

/// Configuration error raised while loading or emitting project metadata.
///
/// Every variant renders a single human-readable message naming the dotted
/// field path it concerns (see [`Error::key`]).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The document has no `[project]` table.
    #[error("Section \"project\" missing in pyproject.toml")]
    MissingSection,

    /// A required field is absent.
    #[error("Field \"{key}\" missing")]
    MissingField { key: String },

    /// A field is absent and not declared dynamic either.
    #[error("Field \"project.{field}\" missing and \"{field}\" not specified in \"project.dynamic\"")]
    MissingStatic { field: String },

    /// A value has the wrong TOML type.
    #[error("Field \"{key}\" has an invalid type, expecting {expected} (got \"{got}\")")]
    InvalidType {
        key: String,
        expected: &'static str,
        got: String,
    },

    /// A list element has the wrong TOML type.
    #[error("Field \"{key}\" contains item with invalid type, expecting {expected} (got \"{got}\")")]
    InvalidItemType {
        key: String,
        expected: &'static str,
        got: String,
    },

    /// A `file`-or-`text` table holds both keys or neither.
    #[error("Invalid \"{key}\" value, expecting either \"file\" or \"text\" (got \"{got}\")")]
    InvalidUnion { key: String, got: String },

    /// A table holds a key outside its schema.
    #[error("Unexpected field \"{key}\"")]
    UnexpectedField { key: String },

    /// `license.file` or `readme.file` does not exist.
    #[error("{kind} file not found (\"{path}\")")]
    FileNotFound { kind: &'static str, path: String },

    /// A referenced file exists but could not be read.
    #[error("Could not read {kind} file (\"{path}\"): {reason}")]
    FileRead {
        kind: &'static str,
        path: String,
        reason: String,
    },

    /// The readme extension maps to no known content type.
    #[error("Could not infer content type for readme file \"{path}\"")]
    UnknownContentType { path: String },

    /// A project name outside the name grammar.
    #[error("Invalid project name \"{0}\". A valid name consists only of ASCII letters and numbers, period, underscore and hyphen. It must start and end with a letter or number")]
    InvalidName(String),

    /// The description spans several lines.
    #[error("The description must be a single line")]
    MultilineDescription,

    /// A PEP 440 version string that does not parse.
    #[error("Field \"{key}\" contains an invalid PEP 440 version string \"{value}\" (\"{source}\")")]
    InvalidVersion {
        key: String,
        value: String,
        source: GrammarError,
    },

    /// A PEP 440 specifier string that does not parse.
    #[error("Field \"{key}\" contains an invalid PEP 440 specifier string \"{value}\" (\"{source}\")")]
    InvalidSpecifier {
        key: String,
        value: String,
        source: GrammarError,
    },

    /// A PEP 508 requirement string that does not parse.
    #[error("Field \"{key}\" contains an invalid PEP 508 requirement string \"{value}\" (\"{source}\")")]
    InvalidRequirement {
        key: String,
        value: String,
        source: GrammarError,
    },

    /// An entry of `project.dynamic` that can never be dynamic.
    #[error("Unsupported field \"{0}\" in \"project.dynamic\"")]
    UnsupportedDynamic(String),

    /// A field listed in `project.dynamic` that also has a static value.
    #[error("Field \"project.{0}\" declared as dynamic in \"project.dynamic\" but is defined")]
    DynamicConflict(String),

    /// `console_scripts`/`gui_scripts` declared through `project.entry-points`.
    #[error("Field \"project.entry-points.{group}\" is reserved, use \"project.{replacement}\" instead")]
    ReservedEntryPointGroup {
        group: String,
        replacement: &'static str,
    },

    /// Keys of `[project]` outside the schema, when extra keys are denied.
    #[error("Extra keys present in \"project\": {}", quote_list(.0))]
    ExtraKeys(Vec<String>),

    /// A metadata version other than 2.1, 2.2 or 2.3.
    #[error("The metadata_version must be one of 2.1, 2.2, or 2.3 (got \"{0}\")")]
    InvalidMetadataVersion(String),

    /// `name` or `version` still dynamic at emission time.
    #[error("Field cannot be dynamic: {0}")]
    DynamicNotAllowed(String),

    /// Emission without a version.
    #[error("Missing version field")]
    MissingVersionField,

    /// `pyproject.toml` could not be read.
    #[error("Could not read \"{path}\": {reason}")]
    Io { path: String, reason: String },

    /// `pyproject.toml` is not valid TOML.
    #[error("Invalid TOML in \"{path}\": {reason}")]
    Toml { path: String, reason: String },
}

/// The single configuration error kind, under its domain name.
pub type ConfigurationError = Error;

impl Error {
    /// Dotted field path this error concerns, when it concerns one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Error::MissingField { key }
            | Error::InvalidType { key, .. }
            | Error::InvalidItemType { key, .. }
            | Error::InvalidUnion { key, .. }
            | Error::UnexpectedField { key }
            | Error::InvalidVersion { key, .. }
            | Error::InvalidSpecifier { key, .. }
            | Error::InvalidRequirement { key, .. } => Some(key),
            Error::MissingSection => Some("project"),
            Error::InvalidName(_) => Some("project.name"),
            Error::MultilineDescription => Some("project.description"),
            Error::FileNotFound { kind, .. } | Error::FileRead { kind, .. } => {
                Some(if kind.eq_ignore_ascii_case("license") {
                    "project.license"
                } else {
                    "project.readme"
                })
            }
            Error::UnknownContentType { .. } => Some("project.readme"),
            Error::UnsupportedDynamic(_) | Error::DynamicConflict(_) => Some("project.dynamic"),
            Error::ReservedEntryPointGroup { .. } => Some("project.entry-points"),
            _ => None,
        }
    }
}

fn quote_list(keys: &[String]) -> String {
    keys.iter()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Flatten a winnow failure into a one-line description.
pub(crate) fn describe_parse_error(err: &ParseError<&str, ContextError>) -> String {
    let expected = err.inner().context().find_map(|c| match c {
        StrContext::Expected(value) => Some(value.to_string()),
        _ => None,
    });
    let label = err.inner().context().find_map(|c| match c {
        StrContext::Label(label) => Some(*label),
        _ => None,
    });
    let offset = err.offset();
    match (label, expected) {
        (Some(label), Some(expected)) => {
            format!("invalid {label} at position {offset}, expected {expected}")
        }
        (Some(label), None) => format!("invalid {label} at position {offset}"),
        (None, Some(expected)) => format!("expected {expected} at position {offset}"),
        (None, None) => format!("unexpected input at position {offset}"),
    }
}

/// Result type for pyproject-metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_type_message() {
        let err = Error::InvalidType {
            key: "project.name".to_string(),
            expected: "a string",
            got: "True".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Field \"project.name\" has an invalid type, expecting a string (got \"True\")"
        );
        assert_eq!(err.key(), Some("project.name"));
    }

    #[test]
    fn nested_cause_is_source() {
        use std::error::Error as _;

        let err = Error::InvalidRequirement {
            key: "project.dependencies".to_string(),
            value: "!!".to_string(),
            source: GrammarError::InvalidRequirement("unexpected input at position 0".into()),
        };
        assert!(err.source().is_some());
        assert!(err
            .to_string()
            .starts_with("Field \"project.dependencies\" contains an invalid PEP 508 requirement string \"!!\" "));
    }

    #[test]
    fn extra_keys_message() {
        let err = Error::ExtraKeys(vec!["foo".into(), "bar".into()]);
        assert_eq!(
            err.to_string(),
            "Extra keys present in \"project\": \"foo\", \"bar\""
        );
    }

    #[test]
    fn file_not_found_key() {
        let err = Error::FileNotFound {
            kind: "License",
            path: "LICENSE".into(),
        };
        assert_eq!(err.to_string(), "License file not found (\"LICENSE\")");
        assert_eq!(err.key(), Some("project.license"));
    }
}
