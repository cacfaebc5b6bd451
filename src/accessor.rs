use std::collections::BTreeSet;

use indexmap::IndexMap;
use toml::{Table, Value};

use crate::error::{Error, Result};
use crate::metadata::Person;

const PEOPLE: &str = "a list of dictionaries containing the \"name\" and/or \"email\" keys";

/// Typed, path-qualified access to the `[project]` table.
///
/// Paths are dotted and relative to `project` (`readme.content-type`); every
/// segment must be a literal schema key. Values under user-chosen keys (extra
/// names, entry-point groups) are checked with the free `expect_*` functions
/// instead. The accessor remembers which top-level keys were looked at so
/// the loader can report the rest.
pub(crate) struct FieldAccessor<'a> {
    project: &'a Table,
    consulted: BTreeSet<String>,
}

impl<'a> FieldAccessor<'a> {
    pub(crate) fn new(project: &'a Table) -> Self {
        FieldAccessor {
            project,
            consulted: BTreeSet::new(),
        }
    }

    pub(crate) fn get(&mut self, path: &str) -> Option<&'a Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut value = self.project.get(first)?;
        self.consulted.insert(first.to_string());
        for segment in segments {
            value = value.as_table()?.get(segment)?;
        }
        Some(value)
    }

    pub(crate) fn get_str(&mut self, path: &str) -> Result<Option<&'a str>> {
        self.get(path)
            .map(|value| expect_str(&qualified(path), value))
            .transpose()
    }

    pub(crate) fn get_str_list(&mut self, path: &str) -> Result<Option<Vec<String>>> {
        self.get(path)
            .map(|value| expect_str_list(&qualified(path), value))
            .transpose()
    }

    pub(crate) fn get_str_table(&mut self, path: &str) -> Result<Option<IndexMap<String, String>>> {
        self.get(path)
            .map(|value| expect_str_table(&qualified(path), value))
            .transpose()
    }

    pub(crate) fn get_people(&mut self, path: &str) -> Result<Option<Vec<Person>>> {
        self.get(path)
            .map(|value| expect_people(&qualified(path), value))
            .transpose()
    }

    /// Top-level keys of `[project]` nothing has looked at, in table order.
    pub(crate) fn unconsulted(&self) -> Vec<String> {
        self.project
            .keys()
            .filter(|key| !self.consulted.contains(*key))
            .cloned()
            .collect()
    }
}

/// `readme.file` → `project.readme.file`.
pub(crate) fn qualified(path: &str) -> String {
    format!("project.{path}")
}

pub(crate) fn expect_str<'v>(key: &str, value: &'v Value) -> Result<&'v str> {
    value.as_str().ok_or_else(|| Error::InvalidType {
        key: key.to_string(),
        expected: "a string",
        got: render(value),
    })
}

pub(crate) fn expect_str_list(key: &str, value: &Value) -> Result<Vec<String>> {
    let items = value.as_array().ok_or_else(|| Error::InvalidType {
        key: key.to_string(),
        expected: "a list of strings",
        got: render(value),
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidItemType {
                    key: key.to_string(),
                    expected: "a string",
                    got: render(item),
                })
        })
        .collect()
}

pub(crate) fn expect_table<'v>(key: &str, value: &'v Value, expected: &'static str) -> Result<&'v Table> {
    value.as_table().ok_or_else(|| Error::InvalidType {
        key: key.to_string(),
        expected,
        got: render(value),
    })
}

/// A table whose values are all strings, e.g. `project.urls`.
pub(crate) fn expect_str_table(key: &str, value: &Value) -> Result<IndexMap<String, String>> {
    let table = expect_table(key, value, "a dictionary of strings")?;
    table
        .iter()
        .map(|(name, item)| -> Result<(String, String)> {
            let item = expect_str(&format!("{key}.{name}"), item)?;
            Ok((name.clone(), item.to_string()))
        })
        .collect()
}

pub(crate) fn expect_people(key: &str, value: &Value) -> Result<Vec<Person>> {
    let invalid = || Error::InvalidType {
        key: key.to_string(),
        expected: PEOPLE,
        got: render(value),
    };
    let entries = value.as_array().ok_or_else(invalid)?;
    entries
        .iter()
        .map(|entry| -> Result<Person> {
            let table = entry.as_table().ok_or_else(invalid)?;
            let mut name = None;
            let mut email = None;
            for (field, item) in table {
                let item = item.as_str().ok_or_else(invalid)?;
                match field.as_str() {
                    "name" => name = Some(item.to_string()),
                    "email" => email = Some(item.to_string()),
                    _ => return Err(invalid()),
                }
            }
            Ok(Person::new(
                name.unwrap_or_else(|| Person::UNKNOWN.to_string()),
                email,
            ))
        })
        .collect()
}

/// Fail on the first key of `table` outside `allowed`.
pub(crate) fn reject_unknown_keys(key: &str, table: &Table, allowed: &[&str]) -> Result<()> {
    match table.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(unexpected) => Err(Error::UnexpectedField {
            key: format!("{key}.{unexpected}"),
        }),
        None => Ok(()),
    }
}

/// Render an offending value for an error message.
///
/// Top-level strings appear bare; everything else uses Python literal
/// notation (`True`, `[1, 'a']`, `{'file': 'x'}`) since that is how
/// `pyproject.toml` users see these values reported elsewhere.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => repr(other),
    }
}

fn repr(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => repr_float(*f),
        Value::Boolean(true) => "True".to_string(),
        Value::Boolean(false) => "False".to_string(),
        Value::Datetime(dt) => dt.to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Table(table) => {
            let entries: Vec<String> = table
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), repr(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn repr_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c == delimiter => {
                quoted.push('\\');
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted.push(delimiter);
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(src: &str) -> Table {
        toml::from_str(src).unwrap()
    }

    fn value(src: &str) -> Value {
        let table: Table = toml::from_str(&format!("v = {src}")).unwrap();
        table["v"].clone()
    }

    #[test]
    fn render_matches_python_str() {
        assert_eq!(render(&value("true")), "True");
        assert_eq!(render(&value("'some string!'")), "some string!");
        assert_eq!(render(&value("99")), "99");
        assert_eq!(render(&value("1.0")), "1.0");
        assert_eq!(render(&value("2.5")), "2.5");
        assert_eq!(render(&value("[]")), "[]");
        assert_eq!(render(&value("{}")), "{}");
        assert_eq!(render(&value("[true]")), "[True]");
        assert_eq!(
            render(&value("{ file = '...', text = '...' }")),
            "{'file': '...', 'text': '...'}"
        );
        assert_eq!(render(&value("[\"it's\"]")), "[\"it's\"]");
    }

    #[test]
    fn get_walks_dotted_paths() {
        let table = project("name = 'x'\n[readme]\nfile = 'README.md'\n");
        let mut accessor = FieldAccessor::new(&table);
        assert_eq!(accessor.get_str("readme.file").unwrap(), Some("README.md"));
        assert_eq!(accessor.get_str("readme.text").unwrap(), None);
        assert_eq!(accessor.get("missing"), None);
        assert_eq!(accessor.unconsulted(), vec!["name".to_string()]);
    }

    #[test]
    fn get_str_reports_qualified_path() {
        let table = project("name = true");
        let mut accessor = FieldAccessor::new(&table);
        let err = accessor.get_str("name").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field \"project.name\" has an invalid type, expecting a string (got \"True\")"
        );
    }

    #[test]
    fn str_list_errors() {
        let table = project("keywords = 'some string!'\nclassifiers = [true]");
        let mut accessor = FieldAccessor::new(&table);
        assert_eq!(
            accessor.get_str_list("keywords").unwrap_err().to_string(),
            "Field \"project.keywords\" has an invalid type, expecting a list of strings (got \"some string!\")"
        );
        assert_eq!(
            accessor.get_str_list("classifiers").unwrap_err().to_string(),
            "Field \"project.classifiers\" contains item with invalid type, expecting a string (got \"True\")"
        );
    }

    #[test]
    fn str_table_errors() {
        let table = project("scripts = []\n[urls]\nhomepage = true\n");
        let mut accessor = FieldAccessor::new(&table);
        assert_eq!(
            accessor.get_str_table("scripts").unwrap_err().to_string(),
            "Field \"project.scripts\" has an invalid type, expecting a dictionary of strings (got \"[]\")"
        );
        assert_eq!(
            accessor.get_str_table("urls").unwrap_err().to_string(),
            "Field \"project.urls.homepage\" has an invalid type, expecting a string (got \"True\")"
        );
    }

    #[test]
    fn people() {
        let table = project(
            "authors = [{ email = 'example@example.com' }, { name = 'Example!' }]\nmaintainers = [10]",
        );
        let mut accessor = FieldAccessor::new(&table);
        let authors = accessor.get_people("authors").unwrap().unwrap();
        assert_eq!(
            authors,
            vec![
                Person::new("Unknown", Some("example@example.com".into())),
                Person::new("Example!", None),
            ]
        );
        assert_eq!(
            accessor.get_people("maintainers").unwrap_err().to_string(),
            "Field \"project.maintainers\" has an invalid type, expecting a list of dictionaries containing the \"name\" and/or \"email\" keys (got \"[10]\")"
        );
    }

    #[test]
    fn people_reject_unknown_keys() {
        let err = expect_people("project.authors", &value("[{ name = 'a', url = 'b' }]")).unwrap_err();
        assert!(matches!(err, Error::InvalidType { .. }));
    }

    #[test]
    fn unknown_keys() {
        let table = project("made-up = ':('");
        let err = reject_unknown_keys("project.license", &table, &["file", "text"]).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected field \"project.license.made-up\"");
    }
}
