use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use toml::Table;
use tracing::{debug, warn};

use crate::accessor::{expect_str, expect_table, qualified, render, FieldAccessor};
use crate::adapters::{parse_requirement, parse_specifier_set, parse_version};
use crate::error::{Error, Result};
use crate::license;
use crate::metadata::{Field, StandardMetadata};
use crate::name::is_valid_name;
use crate::options::LoadOptions;
use crate::readme;
use crate::requirement::Requirement;

/// Whether a field may be left out of `[project]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    RequiredUnlessDynamic,
    Optional,
}

struct Context<'a> {
    accessor: FieldAccessor<'a>,
    project_root: &'a Path,
}

type LoadFn = fn(&mut Context<'_>, &mut StandardMetadata) -> Result<()>;

struct FieldRule {
    field: Field,
    presence: Presence,
    load: LoadFn,
}

/// The `[project]` schema, in validation order.
const RULES: &[FieldRule] = &[
    FieldRule { field: Field::Name, presence: Presence::Required, load: load_name },
    FieldRule { field: Field::Version, presence: Presence::RequiredUnlessDynamic, load: load_version },
    FieldRule { field: Field::Description, presence: Presence::Optional, load: load_description },
    FieldRule { field: Field::License, presence: Presence::Optional, load: load_license },
    FieldRule { field: Field::Readme, presence: Presence::Optional, load: load_readme },
    FieldRule { field: Field::RequiresPython, presence: Presence::Optional, load: load_requires_python },
    FieldRule { field: Field::Dependencies, presence: Presence::Optional, load: load_dependencies },
    FieldRule {
        field: Field::OptionalDependencies,
        presence: Presence::Optional,
        load: load_optional_dependencies,
    },
    FieldRule { field: Field::Scripts, presence: Presence::Optional, load: load_scripts },
    FieldRule { field: Field::GuiScripts, presence: Presence::Optional, load: load_gui_scripts },
    FieldRule { field: Field::EntryPoints, presence: Presence::Optional, load: load_entrypoints },
    FieldRule { field: Field::Keywords, presence: Presence::Optional, load: load_keywords },
    FieldRule { field: Field::Classifiers, presence: Presence::Optional, load: load_classifiers },
    FieldRule { field: Field::Authors, presence: Presence::Optional, load: load_authors },
    FieldRule { field: Field::Maintainers, presence: Presence::Optional, load: load_maintainers },
    FieldRule { field: Field::Urls, presence: Presence::Optional, load: load_urls },
];

/// Entry-point groups with a dedicated `[project]` key.
const RESERVED_GROUPS: [(&str, &str); 2] = [("console_scripts", "scripts"), ("gui_scripts", "gui-scripts")];

impl StandardMetadata {
    /// Load and validate the `[project]` table of a parsed `pyproject.toml`.
    ///
    /// `project_root` is the directory `license.file` and `readme` paths are
    /// resolved against. Validation stops at the first violation, checking
    /// fields in a fixed order.
    ///
    /// # Examples
    ///
    /// ```
    /// use pyproject_metadata::StandardMetadata;
    ///
    /// let pyproject: toml::Table = toml::from_str(r#"
    ///     [project]
    ///     name = "example"
    ///     version = "0.1.0"
    ///     dependencies = ["requests >= 2"]
    /// "#).unwrap();
    ///
    /// let metadata = StandardMetadata::from_pyproject(&pyproject, ".").unwrap();
    /// assert_eq!(metadata.name(), "example");
    /// assert_eq!(metadata.dependencies()[0].to_string(), "requests>=2");
    ///
    /// let err = StandardMetadata::from_pyproject(&toml::Table::new(), ".").unwrap_err();
    /// assert_eq!(err.to_string(), "Section \"project\" missing in pyproject.toml");
    /// ```
    pub fn from_pyproject(data: &Table, project_root: impl AsRef<Path>) -> Result<Self> {
        Self::from_pyproject_with_options(data, project_root, &LoadOptions::default())
    }

    pub fn from_pyproject_with_options(
        data: &Table,
        project_root: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Self> {
        let project_root = project_root.as_ref();
        debug!(root = %project_root.display(), "loading [project] table");

        let project = data.get("project").ok_or(Error::MissingSection)?;
        let project = expect_table("project", project, "a dictionary")?;
        let mut ctx = Context {
            accessor: FieldAccessor::new(project),
            project_root,
        };

        let mut metadata = StandardMetadata::empty();
        metadata.metadata_version = options.metadata_version;
        metadata.dynamic = load_dynamic(&mut ctx.accessor)?;

        for rule in RULES {
            let present = ctx.accessor.get(rule.field.as_str()).is_some();
            if metadata.dynamic.contains(&rule.field) {
                if present {
                    return Err(Error::DynamicConflict(rule.field.to_string()));
                }
                continue;
            }
            if present {
                (rule.load)(&mut ctx, &mut metadata)?;
                continue;
            }
            match rule.presence {
                Presence::Required => {
                    return Err(Error::MissingField {
                        key: qualified(rule.field.as_str()),
                    })
                }
                Presence::RequiredUnlessDynamic => {
                    return Err(Error::MissingStatic {
                        field: rule.field.to_string(),
                    })
                }
                Presence::Optional => {}
            }
        }

        let extra_keys = ctx.accessor.unconsulted();
        if !extra_keys.is_empty() {
            if !options.allow_extra_keys {
                return Err(Error::ExtraKeys(extra_keys));
            }
            for key in &extra_keys {
                warn!(key = %key, "ignoring unknown key in [project]");
            }
        }

        debug!(
            name = %metadata.name,
            dynamic = metadata.dynamic.len(),
            "loaded [project] table"
        );
        Ok(metadata)
    }

    /// Read `pyproject.toml` from disk and load its `[project]` table.
    ///
    /// The file's directory is the project root.
    pub fn from_pyproject_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let data: Table = toml::from_str(&source).map_err(|e| Error::Toml {
            path: path.display().to_string(),
            reason: e.message().to_string(),
        })?;
        let project_root = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_pyproject(&data, project_root)
    }
}

fn load_dynamic(accessor: &mut FieldAccessor) -> Result<BTreeSet<Field>> {
    accessor
        .get_str_list("dynamic")?
        .unwrap_or_default()
        .iter()
        .map(|entry| -> Result<Field> {
            let field: Field = entry.parse()?;
            if field.is_dynamic_eligible() {
                Ok(field)
            } else {
                Err(Error::UnsupportedDynamic(entry.clone()))
            }
        })
        .collect()
}

fn load_name(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    let name = ctx.accessor.get_str("name")?.unwrap_or_default();
    if !is_valid_name(name) {
        return Err(Error::InvalidName(name.to_string()));
    }
    metadata.name = name.to_string();
    Ok(())
}

fn load_version(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.version = ctx
        .accessor
        .get_str("version")?
        .map(|version| parse_version("project.version", version))
        .transpose()?;
    Ok(())
}

fn load_description(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    if let Some(description) = ctx.accessor.get_str("description")? {
        if description.contains(|c: char| c == '\n' || c == '\r') {
            return Err(Error::MultilineDescription);
        }
        metadata.description = Some(description.to_string());
    }
    Ok(())
}

fn load_license(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    if let Some(value) = ctx.accessor.get("license") {
        metadata.license = Some(license::resolve(&mut ctx.accessor, value, ctx.project_root)?);
    }
    Ok(())
}

fn load_readme(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    if let Some(value) = ctx.accessor.get("readme") {
        metadata.readme = Some(readme::resolve(&mut ctx.accessor, value, ctx.project_root)?);
    }
    Ok(())
}

fn load_requires_python(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.requires_python = ctx
        .accessor
        .get_str("requires-python")?
        .map(|specifiers| parse_specifier_set("project.requires-python", specifiers))
        .transpose()?;
    Ok(())
}

fn load_dependencies(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.dependencies = ctx
        .accessor
        .get_str_list("dependencies")?
        .unwrap_or_default()
        .iter()
        .map(|dependency| parse_requirement("project.dependencies", dependency))
        .collect::<Result<_>>()?;
    Ok(())
}

fn load_optional_dependencies(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    let Some(value) = ctx.accessor.get("optional-dependencies") else {
        return Ok(());
    };
    let extras = expect_table(
        "project.optional-dependencies",
        value,
        "a dictionary of PEP 508 requirement strings",
    )?;

    let mut optional_dependencies = IndexMap::with_capacity(extras.len());
    for (extra, requirements) in extras {
        let key = format!("project.optional-dependencies.{extra}");
        let requirements = requirements.as_array().ok_or_else(|| Error::InvalidType {
            key: key.clone(),
            expected: "a dictionary PEP 508 requirement strings",
            got: render(requirements),
        })?;
        let requirements = requirements
            .iter()
            .map(|item| -> Result<Requirement> {
                let requirement = item.as_str().ok_or_else(|| Error::InvalidType {
                    key: key.clone(),
                    expected: "a PEP 508 requirement string",
                    got: render(item),
                })?;
                parse_requirement(&key, requirement)
            })
            .collect::<Result<Vec<Requirement>>>()?;
        optional_dependencies.insert(extra.clone(), requirements);
    }
    metadata.optional_dependencies = optional_dependencies;
    Ok(())
}

fn load_scripts(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.scripts = ctx.accessor.get_str_table("scripts")?.unwrap_or_default();
    Ok(())
}

fn load_gui_scripts(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.gui_scripts = ctx.accessor.get_str_table("gui-scripts")?.unwrap_or_default();
    Ok(())
}

fn load_entrypoints(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    let Some(value) = ctx.accessor.get("entry-points") else {
        return Ok(());
    };
    let groups = expect_table("project.entry-points", value, "a dictionary of entrypoint sections")?;

    let mut entrypoints = IndexMap::with_capacity(groups.len());
    for (group, entries) in groups {
        if let Some((_, replacement)) = RESERVED_GROUPS.iter().find(|(reserved, _)| *reserved == group.as_str()) {
            return Err(Error::ReservedEntryPointGroup {
                group: group.clone(),
                replacement: *replacement,
            });
        }
        let key = format!("project.entry-points.{group}");
        let entries = expect_table(&key, entries, "a dictionary of entrypoints")?;
        let entries = entries
            .iter()
            .map(|(name, target)| -> Result<(String, String)> {
                let target = expect_str(&format!("{key}.{name}"), target)?;
                Ok((name.clone(), target.to_string()))
            })
            .collect::<Result<IndexMap<_, _>>>()?;
        entrypoints.insert(group.clone(), entries);
    }
    metadata.entrypoints = entrypoints;
    Ok(())
}

fn load_keywords(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.keywords = ctx.accessor.get_str_list("keywords")?.unwrap_or_default();
    Ok(())
}

fn load_classifiers(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.classifiers = ctx.accessor.get_str_list("classifiers")?.unwrap_or_default();
    Ok(())
}

fn load_authors(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.authors = ctx.accessor.get_people("authors")?.unwrap_or_default();
    Ok(())
}

fn load_maintainers(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.maintainers = ctx.accessor.get_people("maintainers")?.unwrap_or_default();
    Ok(())
}

fn load_urls(ctx: &mut Context<'_>, metadata: &mut StandardMetadata) -> Result<()> {
    metadata.urls = ctx.accessor.get_str_table("urls")?.unwrap_or_default();
    Ok(())
}
