use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::license::License;
use crate::name::{canonicalize_name, is_valid_name};
use crate::readme::Readme;
use crate::requirement::Requirement;
use crate::specifier::SpecifierSet;
use crate::version::Version;

/// Core metadata format version.
///
/// See the [core metadata specification](https://packaging.python.org/specifications/core-metadata/).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataVersion {
    /// Metadata 2.1, with `Description-Content-Type` and `Provides-Extra`.
    V2_1,
    /// Metadata 2.2, adds `Dynamic`.
    V2_2,
    /// Metadata 2.3.
    V2_3,
}

impl MetadataVersion {
    /// Whether `Dynamic` headers are part of this format.
    pub fn has_dynamic(&self) -> bool {
        *self >= MetadataVersion::V2_2
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataVersion::V2_1 => "2.1",
            MetadataVersion::V2_2 => "2.2",
            MetadataVersion::V2_3 => "2.3",
        }
    }
}

impl fmt::Display for MetadataVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "2.1" => Ok(MetadataVersion::V2_1),
            "2.2" => Ok(MetadataVersion::V2_2),
            "2.3" => Ok(MetadataVersion::V2_3),
            _ => Err(Error::InvalidMetadataVersion(s.to_string())),
        }
    }
}

/// A top-level key of the `[project]` table.
///
/// See [PEP 621](https://peps.python.org/pep-0621/#details).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Version,
    Description,
    Readme,
    RequiresPython,
    License,
    Authors,
    Maintainers,
    Keywords,
    Classifiers,
    Urls,
    Scripts,
    GuiScripts,
    EntryPoints,
    Dependencies,
    OptionalDependencies,
}

impl Field {
    /// Every field, in PEP 621 order.
    pub const ALL: [Field; 16] = [
        Field::Name,
        Field::Version,
        Field::Description,
        Field::Readme,
        Field::RequiresPython,
        Field::License,
        Field::Authors,
        Field::Maintainers,
        Field::Keywords,
        Field::Classifiers,
        Field::Urls,
        Field::Scripts,
        Field::GuiScripts,
        Field::EntryPoints,
        Field::Dependencies,
        Field::OptionalDependencies,
    ];

    /// The key as spelled in `pyproject.toml`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Version => "version",
            Field::Description => "description",
            Field::Readme => "readme",
            Field::RequiresPython => "requires-python",
            Field::License => "license",
            Field::Authors => "authors",
            Field::Maintainers => "maintainers",
            Field::Keywords => "keywords",
            Field::Classifiers => "classifiers",
            Field::Urls => "urls",
            Field::Scripts => "scripts",
            Field::GuiScripts => "gui-scripts",
            Field::EntryPoints => "entry-points",
            Field::Dependencies => "dependencies",
            Field::OptionalDependencies => "optional-dependencies",
        }
    }

    /// Whether the field may be listed in `project.dynamic`.
    ///
    /// Only `name` is excluded.
    pub fn is_dynamic_eligible(&self) -> bool {
        *self != Field::Name
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::UnsupportedDynamic(s.to_string()))
    }
}

/// An author or maintainer entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Person {
    /// Display name; `"Unknown"` when only an email was given.
    pub name: String,
    pub email: Option<String>,
}

impl Person {
    /// Placeholder name for entries that only carry an email.
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn new(name: impl Into<String>, email: Option<String>) -> Self {
        Person {
            name: name.into(),
            email,
        }
    }
}

/// Validated PEP 621 project metadata.
///
/// Built by [`StandardMetadata::from_pyproject`] or programmatically through
/// [`StandardMetadata::new`] and the setters. Each setter of a field that may
/// be dynamic also removes that field from [`dynamic`](Self::dynamic), so a
/// build backend can fill in computed values before calling
/// [`as_rfc822`](Self::as_rfc822).
///
/// See [PEP 621](https://peps.python.org/pep-0621/).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardMetadata {
    pub(crate) name: String,
    pub(crate) version: Option<Version>,
    pub(crate) description: Option<String>,
    pub(crate) license: Option<License>,
    pub(crate) readme: Option<Readme>,
    pub(crate) requires_python: Option<SpecifierSet>,
    pub(crate) dependencies: Vec<Requirement>,
    pub(crate) optional_dependencies: IndexMap<String, Vec<Requirement>>,
    pub(crate) entrypoints: IndexMap<String, IndexMap<String, String>>,
    pub(crate) authors: Vec<Person>,
    pub(crate) maintainers: Vec<Person>,
    pub(crate) urls: IndexMap<String, String>,
    pub(crate) classifiers: Vec<String>,
    pub(crate) keywords: Vec<String>,
    pub(crate) scripts: IndexMap<String, String>,
    pub(crate) gui_scripts: IndexMap<String, String>,
    pub(crate) dynamic: BTreeSet<Field>,
    pub(crate) metadata_version: Option<MetadataVersion>,
}

impl StandardMetadata {
    /// Empty metadata for `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pyproject_metadata::StandardMetadata;
    ///
    /// let mut metadata = StandardMetadata::new("Some_Project").unwrap();
    /// metadata.set_version("1.0".parse().unwrap());
    /// assert_eq!(metadata.canonical_name(), "some-project");
    ///
    /// assert!(StandardMetadata::new(".test").is_err());
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(Error::InvalidName(name));
        }
        Ok(StandardMetadata {
            name,
            ..StandardMetadata::empty()
        })
    }

    pub(crate) fn empty() -> Self {
        StandardMetadata {
            name: String::new(),
            version: None,
            description: None,
            license: None,
            readme: None,
            requires_python: None,
            dependencies: Vec::new(),
            optional_dependencies: IndexMap::new(),
            entrypoints: IndexMap::new(),
            authors: Vec::new(),
            maintainers: Vec::new(),
            urls: IndexMap::new(),
            classifiers: Vec::new(),
            keywords: Vec::new(),
            scripts: IndexMap::new(),
            gui_scripts: IndexMap::new(),
            dynamic: BTreeSet::new(),
            metadata_version: None,
        }
    }

    /// The name as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized name (`Full_Metadata` → `full-metadata`).
    pub fn canonical_name(&self) -> String {
        canonicalize_name(&self.name)
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn license(&self) -> Option<&License> {
        self.license.as_ref()
    }

    pub fn readme(&self) -> Option<&Readme> {
        self.readme.as_ref()
    }

    pub fn requires_python(&self) -> Option<&SpecifierSet> {
        self.requires_python.as_ref()
    }

    pub fn dependencies(&self) -> &[Requirement] {
        &self.dependencies
    }

    /// Extras in declaration order.
    pub fn optional_dependencies(&self) -> &IndexMap<String, Vec<Requirement>> {
        &self.optional_dependencies
    }

    /// Entry-point groups other than scripts and GUI scripts.
    pub fn entrypoints(&self) -> &IndexMap<String, IndexMap<String, String>> {
        &self.entrypoints
    }

    pub fn authors(&self) -> &[Person] {
        &self.authors
    }

    pub fn maintainers(&self) -> &[Person] {
        &self.maintainers
    }

    pub fn urls(&self) -> &IndexMap<String, String> {
        &self.urls
    }

    pub fn classifiers(&self) -> &[String] {
        &self.classifiers
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn scripts(&self) -> &IndexMap<String, String> {
        &self.scripts
    }

    pub fn gui_scripts(&self) -> &IndexMap<String, String> {
        &self.gui_scripts
    }

    /// Fields still awaiting a value from the build backend.
    pub fn dynamic(&self) -> &BTreeSet<Field> {
        &self.dynamic
    }

    /// The core metadata version emission will use.
    ///
    /// An explicitly requested version wins. Otherwise the lowest version
    /// able to carry the populated fields is chosen: 2.2 while any field is
    /// still dynamic, 2.1 otherwise.
    pub fn metadata_version(&self) -> MetadataVersion {
        match self.metadata_version {
            Some(version) => version,
            None if !self.dynamic.is_empty() => MetadataVersion::V2_2,
            None => MetadataVersion::V2_1,
        }
    }

    /// Pin the core metadata version, or return to automatic selection.
    pub fn set_metadata_version(&mut self, version: Option<MetadataVersion>) {
        self.metadata_version = version;
    }

    /// Replace the set of dynamic fields.
    ///
    /// No validation happens here; [`as_rfc822`](Self::as_rfc822) rejects
    /// `name` or `version` left dynamic, and fields both dynamic and set.
    pub fn set_dynamic(&mut self, fields: impl IntoIterator<Item = Field>) {
        self.dynamic = fields.into_iter().collect();
    }

    /// Whether `field` holds a static value.
    pub(crate) fn is_set(&self, field: Field) -> bool {
        match field {
            Field::Name => true,
            Field::Version => self.version.is_some(),
            Field::Description => self.description.is_some(),
            Field::Readme => self.readme.is_some(),
            Field::RequiresPython => self.requires_python.is_some(),
            Field::License => self.license.is_some(),
            Field::Authors => !self.authors.is_empty(),
            Field::Maintainers => !self.maintainers.is_empty(),
            Field::Keywords => !self.keywords.is_empty(),
            Field::Classifiers => !self.classifiers.is_empty(),
            Field::Urls => !self.urls.is_empty(),
            Field::Scripts => !self.scripts.is_empty(),
            Field::GuiScripts => !self.gui_scripts.is_empty(),
            Field::EntryPoints => !self.entrypoints.is_empty(),
            Field::Dependencies => !self.dependencies.is_empty(),
            Field::OptionalDependencies => !self.optional_dependencies.is_empty(),
        }
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = Some(version);
        self.dynamic.remove(&Field::Version);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
        self.dynamic.remove(&Field::Description);
    }

    pub fn set_license(&mut self, license: License) {
        self.license = Some(license);
        self.dynamic.remove(&Field::License);
    }

    pub fn set_readme(&mut self, readme: Readme) {
        self.readme = Some(readme);
        self.dynamic.remove(&Field::Readme);
    }

    pub fn set_requires_python(&mut self, requires_python: SpecifierSet) {
        self.requires_python = Some(requires_python);
        self.dynamic.remove(&Field::RequiresPython);
    }

    pub fn set_dependencies(&mut self, dependencies: Vec<Requirement>) {
        self.dependencies = dependencies;
        self.dynamic.remove(&Field::Dependencies);
    }

    pub fn set_optional_dependencies(&mut self, extras: IndexMap<String, Vec<Requirement>>) {
        self.optional_dependencies = extras;
        self.dynamic.remove(&Field::OptionalDependencies);
    }

    pub fn set_entrypoints(&mut self, groups: IndexMap<String, IndexMap<String, String>>) {
        self.entrypoints = groups;
        self.dynamic.remove(&Field::EntryPoints);
    }

    pub fn set_authors(&mut self, authors: Vec<Person>) {
        self.authors = authors;
        self.dynamic.remove(&Field::Authors);
    }

    pub fn set_maintainers(&mut self, maintainers: Vec<Person>) {
        self.maintainers = maintainers;
        self.dynamic.remove(&Field::Maintainers);
    }

    pub fn set_urls(&mut self, urls: IndexMap<String, String>) {
        self.urls = urls;
        self.dynamic.remove(&Field::Urls);
    }

    pub fn set_classifiers(&mut self, classifiers: Vec<String>) {
        self.classifiers = classifiers;
        self.dynamic.remove(&Field::Classifiers);
    }

    pub fn set_keywords(&mut self, keywords: Vec<String>) {
        self.keywords = keywords;
        self.dynamic.remove(&Field::Keywords);
    }

    pub fn set_scripts(&mut self, scripts: IndexMap<String, String>) {
        self.scripts = scripts;
        self.dynamic.remove(&Field::Scripts);
    }

    pub fn set_gui_scripts(&mut self, gui_scripts: IndexMap<String, String>) {
        self.gui_scripts = gui_scripts;
        self.dynamic.remove(&Field::GuiScripts);
    }
}
