//! Bridges from the PEP 440 / PEP 508 grammars to keyed configuration errors.

use crate::error::{Error, Result};
use crate::requirement::Requirement;
use crate::specifier::SpecifierSet;
use crate::version::Version;

pub(crate) fn parse_version(key: &str, value: &str) -> Result<Version> {
    value.parse().map_err(|source| Error::InvalidVersion {
        key: key.to_string(),
        value: value.to_string(),
        source,
    })
}

pub(crate) fn parse_specifier_set(key: &str, value: &str) -> Result<SpecifierSet> {
    value.parse().map_err(|source| Error::InvalidSpecifier {
        key: key.to_string(),
        value: value.to_string(),
        source,
    })
}

pub(crate) fn parse_requirement(key: &str, value: &str) -> Result<Requirement> {
    value.parse().map_err(|source| Error::InvalidRequirement {
        key: key.to_string(),
        value: value.to_string(),
        source,
    })
}
