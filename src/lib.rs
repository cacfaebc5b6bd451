//! Python project metadata from `pyproject.toml`, based on [PEP 621].
//!
//! This crate validates the `[project]` table of a `pyproject.toml` document
//! into a typed [`StandardMetadata`] value and renders it as a [core
//! metadata] record, the `PKG-INFO` / `METADATA` file shipped inside Python
//! source distributions and wheels.
//!
//! [PEP 621]: https://peps.python.org/pep-0621/
//! [core metadata]: https://packaging.python.org/specifications/core-metadata/
//!
//! # Overview
//!
//! Loading checks every field in a fixed order and stops at the first
//! violation with a [`ConfigurationError`] naming the offending dotted key.
//! Readme files are read and license files located during loading, so
//! emission does no I/O. Fields a build backend computes later are listed
//! in `project.dynamic` and filled in through the setters.
//!
//! Dependency strings are parsed with small built-in [PEP 440] and
//! [PEP 508] grammars ([`Version`], [`SpecifierSet`], [`Requirement`]).
//!
//! [PEP 440]: https://peps.python.org/pep-0440/
//! [PEP 508]: https://peps.python.org/pep-0508/
//!
//! # Examples
//!
//! ```
//! use pyproject_metadata::StandardMetadata;
//!
//! let pyproject: toml::Table = toml::from_str(r#"
//! [project]
//! name = "Example_Pkg"
//! version = "1.0"
//! dependencies = ["requests[socks] >= 2.8.1"]
//!
//! [project.optional-dependencies]
//! test_suite = ["pytest; python_version >= '3.8'"]
//! "#).unwrap();
//!
//! let metadata = StandardMetadata::from_pyproject(&pyproject, ".").unwrap();
//! assert_eq!(metadata.canonical_name(), "example-pkg");
//!
//! let core = metadata.as_rfc822().unwrap();
//! assert_eq!(
//!     core.get("Requires-Dist").unwrap(),
//!     [
//!         "requests[socks]>=2.8.1".to_string(),
//!         "pytest; python_version >= \"3.8\" and extra == \"test-suite\"".to_string(),
//!     ]
//! );
//! assert_eq!(core.get("Provides-Extra").unwrap(), ["test-suite".to_string()]);
//! ```

mod accessor;
mod adapters;
mod error;
mod license;
mod loader;
mod marker;
mod metadata;
mod name;
mod options;
mod readme;
mod requirement;
mod rfc822;
mod specifier;
mod version;

// Re-export public types
pub use error::{ConfigurationError, Error, GrammarError, Result};
pub use license::License;
pub use marker::{BoolOp, MarkerAtom, MarkerExpression, MarkerOperator, MarkerTree, MarkerValue, MarkerVariable};
pub use metadata::{Field, MetadataVersion, Person, StandardMetadata};
pub use name::{canonicalize_name, is_valid_name};
pub use options::LoadOptions;
pub use readme::{guess_content_type, Readme};
pub use requirement::Requirement;
pub use rfc822::CoreMetadata;
pub use specifier::{Operator, Specifier, SpecifierSet};
pub use version::{LocalSegment, PreKind, Version};
