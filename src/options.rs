//! Options controlling how `[project]` is loaded.

use crate::metadata::MetadataVersion;

/// Knobs for [`StandardMetadata::from_pyproject_with_options`].
///
/// # Examples
///
/// ```
/// use pyproject_metadata::{LoadOptions, MetadataVersion};
///
/// let options = LoadOptions::new()
///     .with_metadata_version(MetadataVersion::V2_3)
///     .with_allow_extra_keys(false);
/// assert_eq!(options.metadata_version, Some(MetadataVersion::V2_3));
/// assert!(!options.allow_extra_keys);
/// ```
///
/// [`StandardMetadata::from_pyproject_with_options`]: crate::StandardMetadata::from_pyproject_with_options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Core metadata version to emit; `None` picks the lowest sufficient one.
    pub metadata_version: Option<MetadataVersion>,
    /// Warn about unknown `[project]` keys instead of failing.
    pub allow_extra_keys: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            metadata_version: None,
            allow_extra_keys: true,
        }
    }
}

impl LoadOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_metadata_version(mut self, version: MetadataVersion) -> Self {
        self.metadata_version = Some(version);
        self
    }

    #[must_use]
    pub fn with_allow_extra_keys(mut self, allow: bool) -> Self {
        self.allow_extra_keys = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = LoadOptions::new();
        assert_eq!(options.metadata_version, None);
        assert!(options.allow_extra_keys);
    }
}
