use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::license::License;
use crate::metadata::{Field, Person, StandardMetadata};
use crate::name::canonicalize_name;

/// Labels with a fixed position among the `Project-URL` headers.
const WELL_KNOWN_URLS: [&str; 4] = ["homepage", "documentation", "repository", "changelog"];

/// RFC 5322 specials; a display name containing one is quoted.
const SPECIALS: &str = "()<>@,:;.\"[]\\";

/// A core metadata record (`PKG-INFO` / `METADATA`).
///
/// Headers keep emission order and may repeat; `Display` renders the record
/// as RFC 822 text followed by the long description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreMetadata {
    headers: IndexMap<&'static str, Vec<String>>,
    body: Option<String>,
}

impl CoreMetadata {
    /// Values of header `name`, in order.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.headers.get(name).map(Vec::as_slice)
    }

    pub fn headers(&self) -> &IndexMap<&'static str, Vec<String>> {
        &self.headers
    }

    /// The long description.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    fn push(&mut self, name: &'static str, value: impl Into<String>) {
        self.headers.entry(name).or_default().push(value.into());
    }

    fn extend(&mut self, name: &'static str, values: impl IntoIterator<Item = String>) {
        for value in values {
            self.push(name, value);
        }
    }
}

impl fmt::Display for CoreMetadata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (name, values) in &self.headers {
            for value in values {
                let mut lines = value.split('\n');
                write!(f, "{name}: {}", lines.next().unwrap_or_default())?;
                for line in lines {
                    write!(f, "\n        {line}")?;
                }
                writeln!(f)?;
            }
        }
        if let Some(body) = &self.body {
            write!(f, "\n{body}")?;
        }
        Ok(())
    }
}

impl StandardMetadata {
    /// Render the core metadata record.
    ///
    /// Fails when `name` or `version` is still dynamic, when a dynamic field
    /// also holds a value, or when no version is set. Fields still dynamic are listed in `Dynamic` headers from
    /// metadata 2.2 on and silently left out at 2.1.
    ///
    /// # Examples
    ///
    /// ```
    /// use pyproject_metadata::StandardMetadata;
    ///
    /// let mut metadata = StandardMetadata::new("example").unwrap();
    /// metadata.set_version("1.0".parse().unwrap());
    /// metadata.set_description("An example");
    ///
    /// let core = metadata.as_rfc822().unwrap();
    /// assert_eq!(
    ///     core.to_string(),
    ///     "Metadata-Version: 2.1\nName: example\nSummary: An example\nVersion: 1.0\n"
    /// );
    /// ```
    pub fn as_rfc822(&self) -> Result<CoreMetadata> {
        for field in [Field::Name, Field::Version] {
            if self.dynamic.contains(&field) {
                return Err(Error::DynamicNotAllowed(field.to_string()));
            }
        }
        if let Some(field) = self.dynamic.iter().find(|field| self.is_set(**field)) {
            return Err(Error::DynamicConflict(field.to_string()));
        }
        let version = self.version.as_ref().ok_or(Error::MissingVersionField)?;
        let metadata_version = self.metadata_version();
        if self.metadata_version.is_none() {
            debug!(%metadata_version, "selected core metadata version");
        }

        let mut core = CoreMetadata::default();
        core.push("Metadata-Version", metadata_version.as_str());
        core.push("Name", self.name.as_str());
        if let Some(description) = &self.description {
            core.push("Summary", description.as_str());
        }
        core.push("Version", version.to_string());
        if !self.keywords.is_empty() {
            core.push("Keywords", self.keywords.join(","));
        }
        let homepage = self.urls.iter().find(|(label, _)| label.eq_ignore_ascii_case("homepage"));
        if let Some((_, homepage)) = homepage {
            core.push("Home-page", homepage.as_str());
        }
        push_people(&mut core, "Author", "Author-Email", &self.authors);
        push_people(&mut core, "Maintainer", "Maintainer-Email", &self.maintainers);
        if let Some(License::Text(text)) = &self.license {
            core.push("License", text.as_str());
        }
        core.extend("Classifier", self.classifiers.iter().cloned());
        core.extend("Project-URL", project_urls(&self.urls));
        if let Some(requires_python) = &self.requires_python {
            core.push("Requires-Python", requires_python.to_string());
        }

        let mut requires_dist: Vec<String> = self.dependencies.iter().map(ToString::to_string).collect();
        for (extra, requirements) in &self.optional_dependencies {
            let extra = canonicalize_name(extra);
            requires_dist.extend(
                requirements
                    .iter()
                    .map(|requirement| requirement.with_extra_marker(&extra).to_string()),
            );
        }
        core.extend("Requires-Dist", requires_dist);
        core.extend(
            "Provides-Extra",
            self.optional_dependencies.keys().map(|extra| canonicalize_name(extra)),
        );

        if let Some(readme) = &self.readme {
            core.push("Description-Content-Type", readme.content_type());
        }
        if metadata_version.has_dynamic() {
            let mut dynamic: Vec<&str> = self.dynamic.iter().map(Field::as_str).collect();
            dynamic.sort_unstable();
            core.extend("Dynamic", dynamic.into_iter().map(str::to_string));
        } else if !self.dynamic.is_empty() {
            warn!(
                %metadata_version,
                count = self.dynamic.len(),
                "dropping unresolved dynamic fields from core metadata"
            );
        }
        core.body = self.readme.as_ref().map(|readme| readme.text().to_string());
        Ok(core)
    }
}

fn push_people(core: &mut CoreMetadata, name_header: &'static str, email_header: &'static str, people: &[Person]) {
    let names: Vec<&str> = people
        .iter()
        .filter(|person| person.email.is_none())
        .map(|person| person.name.as_str())
        .collect();
    if !names.is_empty() {
        core.push(name_header, names.join(", "));
    }

    let mailboxes: Vec<String> = people
        .iter()
        .filter_map(|person| person.email.as_deref().map(|email| mailbox(&person.name, email)))
        .collect();
    if !mailboxes.is_empty() {
        core.push(email_header, mailboxes.join(", "));
    }
}

/// `Name <email>`, or the bare address for email-only entries.
fn mailbox(name: &str, email: &str) -> String {
    if name == Person::UNKNOWN {
        email.to_string()
    } else if name.contains(|c: char| SPECIALS.contains(c)) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\" <{email}>")
    } else {
        format!("{name} <{email}>")
    }
}

fn project_urls(urls: &IndexMap<String, String>) -> Vec<String> {
    let well_known = WELL_KNOWN_URLS.iter().filter_map(|known| {
        urls.iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(known))
    });
    let rest = urls
        .iter()
        .filter(|(label, _)| !WELL_KNOWN_URLS.iter().any(|known| label.eq_ignore_ascii_case(known)));
    well_known
        .chain(rest)
        .map(|(label, url)| format!("{}, {url}", capitalize(label)))
        .collect()
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{project_dir, FULL_METADATA, README};
    use crate::metadata::MetadataVersion;
    use crate::options::LoadOptions;
    use toml::Table;

    fn headers(core: &CoreMetadata) -> Vec<(&str, Vec<&str>)> {
        core.headers()
            .iter()
            .map(|(name, values)| (*name, values.iter().map(String::as_str).collect()))
            .collect()
    }

    fn load(src: &str) -> StandardMetadata {
        let data: Table = toml::from_str(src).unwrap();
        StandardMetadata::from_pyproject(&data, ".").unwrap()
    }

    #[test]
    fn full_metadata() {
        let dir = project_dir(FULL_METADATA);
        let metadata = StandardMetadata::from_pyproject_path(dir.path().join("pyproject.toml")).unwrap();
        let core = metadata.as_rfc822().unwrap();
        assert_eq!(
            headers(&core),
            vec![
                ("Metadata-Version", vec!["2.1"]),
                ("Name", vec!["full_metadata"]),
                ("Summary", vec!["A package with all the metadata :)"]),
                ("Version", vec!["3.2.1"]),
                ("Keywords", vec!["trampolim,is,interesting"]),
                ("Home-page", vec!["example.com"]),
                ("Author", vec!["Example!"]),
                ("Author-Email", vec!["example@example.com"]),
                ("Maintainer-Email", vec!["Other Example <other@example.com>"]),
                ("License", vec!["some license text"]),
                (
                    "Classifier",
                    vec!["Development Status :: 4 - Beta", "Programming Language :: Python"]
                ),
                (
                    "Project-URL",
                    vec![
                        "Homepage, example.com",
                        "Documentation, readthedocs.org",
                        "Repository, github.com/some/repo",
                        "Changelog, github.com/some/repo/blob/master/CHANGELOG.rst",
                    ]
                ),
                ("Requires-Python", vec![">=3.8"]),
                (
                    "Requires-Dist",
                    vec![
                        "dependency1",
                        "dependency2>1.0.0",
                        "dependency3[extra]",
                        "dependency4; os_name != \"nt\"",
                        "dependency5[other-extra]>1.0; os_name == \"nt\"",
                        "test_dependency; extra == \"test\"",
                        "test_dependency[test_extra]; extra == \"test\"",
                        "test_dependency[test_extra2]>3.0; os_name == \"nt\" and extra == \"test\"",
                    ]
                ),
                ("Provides-Extra", vec!["test"]),
                ("Description-Content-Type", vec!["text/markdown"]),
            ]
        );
        assert_eq!(core.body(), Some(README));
        assert_eq!(core.get("Name"), Some(&["full_metadata".to_string()][..]));
        assert_eq!(core.get("Dynamic"), None);

        // emission leaves the model untouched
        assert!(metadata.dynamic().is_empty());
        assert_eq!(metadata.version().unwrap().to_string(), "3.2.1");
    }

    #[test]
    fn dynamic_description() {
        let metadata = load("[project]\nname = 'dynamic-description'\nversion = '1.0.0'\ndynamic = ['description']\n");
        let core = metadata.as_rfc822().unwrap();
        assert_eq!(
            headers(&core),
            vec![
                ("Metadata-Version", vec!["2.2"]),
                ("Name", vec!["dynamic-description"]),
                ("Version", vec!["1.0.0"]),
                ("Dynamic", vec!["description"]),
            ]
        );
        assert_eq!(core.body(), None);
    }

    #[test]
    fn dynamic_headers_are_sorted_by_name() {
        let mut metadata = StandardMetadata::new("x").unwrap();
        metadata.set_version("1".parse().unwrap());
        metadata.set_dynamic([Field::Urls, Field::Authors, Field::Readme]);
        let core = metadata.as_rfc822().unwrap();
        assert_eq!(
            core.get("Dynamic").unwrap(),
            ["authors".to_string(), "readme".to_string(), "urls".to_string()]
        );
    }

    #[test]
    fn extras_are_canonicalized_at_every_metadata_version() {
        let data: Table = toml::from_str(
            r#"
            [project]
            name = 'hi'
            version = '1.2'
            [project.optional-dependencies]
            under_score = ['some_package']
            da-sh = ['some-package']
            'do.t' = ['some.package']
            empty = []
            "#,
        )
        .unwrap();
        for version in [MetadataVersion::V2_1, MetadataVersion::V2_2, MetadataVersion::V2_3] {
            let options = LoadOptions::new().with_metadata_version(version);
            let metadata = StandardMetadata::from_pyproject_with_options(&data, ".", &options).unwrap();
            assert_eq!(metadata.metadata_version(), version);

            let rfc822 = metadata.as_rfc822().unwrap().to_string();
            assert!(rfc822.contains(&format!("Metadata-Version: {version}")));
            for line in [
                "Provides-Extra: under-score",
                "Provides-Extra: da-sh",
                "Provides-Extra: do-t",
                "Provides-Extra: empty",
                "Requires-Dist: some_package; extra == \"under-score\"",
                "Requires-Dist: some-package; extra == \"da-sh\"",
                "Requires-Dist: some.package; extra == \"do-t\"",
            ] {
                assert!(rfc822.contains(line), "{line} missing at {version}:\n{rfc822}");
            }
        }
    }

    #[test]
    fn name_and_version_cannot_be_dynamic() {
        let mut metadata = StandardMetadata::new("something").unwrap();
        metadata.set_version("1.0.0".parse().unwrap());

        metadata.set_dynamic([Field::Name]);
        assert_eq!(metadata.as_rfc822().unwrap_err().to_string(), "Field cannot be dynamic: name");

        metadata.set_dynamic([Field::Version]);
        assert_eq!(
            metadata.as_rfc822().unwrap_err().to_string(),
            "Field cannot be dynamic: version"
        );
    }

    #[test]
    fn dynamic_field_with_value_is_rejected() {
        let mut metadata = StandardMetadata::new("x").unwrap();
        metadata.set_version("1".parse().unwrap());
        metadata.set_description("static summary");
        metadata.set_dynamic([Field::Description]);
        let err = metadata.as_rfc822().unwrap_err();
        assert_eq!(err, Error::DynamicConflict("description".to_string()));
        assert_eq!(
            err.to_string(),
            "Field \"project.description\" declared as dynamic in \"project.dynamic\" but is defined"
        );

        // empty collections count as unset
        metadata.set_keywords(Vec::new());
        metadata.set_dynamic([Field::Keywords]);
        assert!(metadata.as_rfc822().is_ok());
    }

    #[test]
    fn home_page_label_is_case_insensitive() {
        let metadata = load("[project]\nname = 'x'\nversion = '1'\n[project.urls]\nHomepage = 'example.com'\n");
        let core = metadata.as_rfc822().unwrap();
        assert_eq!(core.get("Home-page").unwrap(), ["example.com".to_string()]);
        assert_eq!(core.get("Project-URL").unwrap(), ["Homepage, example.com".to_string()]);
    }

    #[test]
    fn missing_version() {
        let metadata = StandardMetadata::new("something").unwrap();
        assert_eq!(metadata.as_rfc822().unwrap_err(), Error::MissingVersionField);
        assert_eq!(metadata.as_rfc822().unwrap_err().to_string(), "Missing version field");
    }

    #[test]
    fn dynamic_dropped_at_2_1() {
        let mut metadata = load("[project]\nname = 'x'\nversion = '1'\ndynamic = ['keywords']\n");
        metadata.set_metadata_version(Some(MetadataVersion::V2_1));
        let core = metadata.as_rfc822().unwrap();
        assert_eq!(core.get("Metadata-Version").unwrap(), ["2.1".to_string()]);
        assert_eq!(core.get("Dynamic"), None);
    }

    #[test]
    fn file_license_emits_no_header() {
        let dir = project_dir("");
        let data: Table =
            toml::from_str("[project]\nname = 'x'\nversion = '1'\nlicense = { file = 'LICENSE' }\n").unwrap();
        let metadata = StandardMetadata::from_pyproject(&data, dir.path()).unwrap();
        assert_eq!(metadata.as_rfc822().unwrap().get("License"), None);
    }

    #[test]
    fn people_headers() {
        let mut metadata = StandardMetadata::new("x").unwrap();
        metadata.set_version("1".parse().unwrap());
        metadata.set_authors(vec![
            Person::new("Jane", None),
            Person::new("John", None),
            Person::new("Doe, Jr.", Some("doe@example.com".into())),
            Person::new("Plain", Some("plain@example.com".into())),
        ]);
        let core = metadata.as_rfc822().unwrap();
        assert_eq!(core.get("Author").unwrap(), ["Jane, John".to_string()]);
        assert_eq!(
            core.get("Author-Email").unwrap(),
            ["\"Doe, Jr.\" <doe@example.com>, Plain <plain@example.com>".to_string()]
        );
        assert_eq!(core.get("Maintainer"), None);
    }

    #[test]
    fn project_url_order() {
        let mut urls = IndexMap::new();
        urls.insert("Bug Tracker".to_string(), "bugs.example.com".to_string());
        urls.insert("CHANGELOG".to_string(), "changes.example.com".to_string());
        urls.insert("homepage".to_string(), "example.com".to_string());
        assert_eq!(
            project_urls(&urls),
            [
                "Homepage, example.com",
                "Changelog, changes.example.com",
                "Bug tracker, bugs.example.com",
            ]
        );
    }

    #[test]
    fn display_folds_multiline_values() {
        let mut core = CoreMetadata::default();
        core.push("Name", "x");
        core.push("License", "line one\nline two");
        core.body = Some("body\n".to_string());
        assert_eq!(core.to_string(), "Name: x\nLicense: line one\n        line two\n\nbody\n");
    }
}
