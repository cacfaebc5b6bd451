use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, separated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::error::{describe_parse_error, GrammarError};
use crate::marker::{marker, MarkerTree};
use crate::name::is_valid_name;
use crate::specifier::{specifier_list, SpecifierSet};

/// A PEP 508 dependency specification.
///
/// Renders the way Python's `packaging` library does: extras sorted,
/// specifiers sorted and comma-joined, markers double-quoted.
///
/// See [PEP 508](https://peps.python.org/pep-0508/).
///
/// # Examples
///
/// ```
/// use pyproject_metadata::Requirement;
///
/// let req: Requirement = "dependency5[other-extra] > 1.0 ; os_name=='nt'".parse().unwrap();
/// assert_eq!(req.name(), "dependency5");
/// assert_eq!(req.to_string(), "dependency5[other-extra]>1.0; os_name == \"nt\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    name: String,
    extras: BTreeSet<String>,
    specifier: SpecifierSet,
    url: Option<String>,
    marker: Option<MarkerTree>,
}

impl Requirement {
    /// The distribution name, spelled as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extras(&self) -> impl Iterator<Item = &str> {
        self.extras.iter().map(String::as_str)
    }

    pub fn specifier(&self) -> &SpecifierSet {
        &self.specifier
    }

    /// Direct reference given with `name @ url`.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn marker(&self) -> Option<&MarkerTree> {
        self.marker.as_ref()
    }

    /// This requirement restricted to the optional-dependency group `extra`.
    ///
    /// The extra name is used as given; callers canonicalize it first.
    pub fn with_extra_marker(&self, extra: &str) -> Requirement {
        let marker = match &self.marker {
            Some(existing) => existing.clone().and_extra(extra),
            None => MarkerTree::extra(extra),
        };
        Requirement {
            marker: Some(marker),
            ..self.clone()
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras().collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        write!(f, "{}", self.specifier)?;
        if let Some(url) = &self.url {
            write!(f, "@ {url}")?;
            if self.marker.is_some() {
                write!(f, " ")?;
            }
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}

impl FromStr for Requirement {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        delimited(multispace0, requirement, multispace0)
            .parse(s)
            .map_err(|e| GrammarError::InvalidRequirement(describe_parse_error(&e)))
    }
}

// Winnow parsers

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn identifier<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., is_name_char)
        .verify(|name: &str| is_valid_name(name))
        .context(StrContext::Expected(StrContextValue::Description(
            "a name starting and ending with a letter or digit",
        )))
        .parse_next(input)
}

fn extras(input: &mut &str) -> ModalResult<BTreeSet<String>> {
    preceded(
        ('[', multispace0),
        cut_err((
            separated(
                0..,
                identifier.map(|s: &str| s.to_string()),
                (multispace0, ',', multispace0),
            ),
            multispace0,
            ']',
        ))
        .context(StrContext::Label("extras")),
    )
    .map(|(names, _, _): (Vec<String>, _, _)| names.into_iter().collect())
    .parse_next(input)
}

fn url(input: &mut &str) -> ModalResult<String> {
    preceded(
        ('@', multispace0),
        cut_err(take_while(1.., |c: char| !c.is_whitespace()))
            .context(StrContext::Expected(StrContextValue::Description("a URL"))),
    )
    .map(|s: &str| s.to_string())
    .parse_next(input)
}

fn specifiers(input: &mut &str) -> ModalResult<SpecifierSet> {
    alt((
        preceded(
            ('(', multispace0),
            cut_err((specifier_list, multispace0, ')')).context(StrContext::Label("version specifier")),
        )
        .map(|(set, _, _)| set),
        specifier_list,
    ))
    .parse_next(input)
}

fn requirement(input: &mut &str) -> ModalResult<Requirement> {
    let name = identifier.context(StrContext::Label("name")).parse_next(input)?;
    multispace0.parse_next(input)?;
    let extras = opt(extras).parse_next(input)?.unwrap_or_default();
    multispace0.parse_next(input)?;
    let (url, specifier) = match opt(url).parse_next(input)? {
        Some(url) => (Some(url), SpecifierSet::default()),
        None => (None, specifiers(input)?),
    };
    multispace0.parse_next(input)?;
    let marker = opt(preceded(
        (';', multispace0),
        cut_err(marker).context(StrContext::Label("marker")),
    ))
    .parse_next(input)?;
    Ok(Requirement {
        name: name.to_string(),
        extras,
        specifier,
        url,
        marker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(s: &str) -> Requirement {
        s.parse().unwrap()
    }

    #[test]
    fn renders_like_packaging() {
        for (input, rendered) in [
            ("dependency1", "dependency1"),
            ("dependency2>1.0.0", "dependency2>1.0.0"),
            ("dependency3[extra]", "dependency3[extra]"),
            ("dependency4; os_name != \"nt\"", "dependency4; os_name != \"nt\""),
            (
                "dependency5[other-extra]>1.0; os_name == \"nt\"",
                "dependency5[other-extra]>1.0; os_name == \"nt\"",
            ),
            ("test_dependency[test_extra]", "test_dependency[test_extra]"),
            ("some.package", "some.package"),
            ("pkg (>=1.0, <2)", "pkg<2,>=1.0"),
            ("pkg[b, a,a]", "pkg[a,b]"),
            ("pkg @ https://example.com/pkg.whl", "pkg@ https://example.com/pkg.whl"),
            (
                "pkg @ https://example.com/pkg.whl ; os_name == 'nt'",
                "pkg@ https://example.com/pkg.whl ; os_name == \"nt\"",
            ),
        ] {
            assert_eq!(r(input).to_string(), rendered, "{input}");
        }
    }

    #[test]
    fn accessors() {
        let req = r("Foo.Bar[Security] ~= 2.1 ; python_version < '3.9'");
        assert_eq!(req.name(), "Foo.Bar");
        assert_eq!(req.extras().collect::<Vec<_>>(), vec!["Security"]);
        assert_eq!(req.specifier().to_string(), "~=2.1");
        assert!(req.url().is_none());
        assert!(req.marker().is_some());
    }

    #[test]
    fn extra_marker_without_existing_marker() {
        let req = r("some_package").with_extra_marker("under-score");
        assert_eq!(req.to_string(), "some_package; extra == \"under-score\"");
    }

    #[test]
    fn extra_marker_with_existing_marker() {
        let req = r("test_dependency[test_extra2]>3.0; os_name == \"nt\"").with_extra_marker("test");
        assert_eq!(
            req.to_string(),
            "test_dependency[test_extra2]>3.0; os_name == \"nt\" and extra == \"test\""
        );
    }

    #[test]
    fn extra_marker_with_or_marker() {
        let req = r("dep; os_name == 'nt' or os_name == 'posix'").with_extra_marker("cli");
        assert_eq!(
            req.to_string(),
            "dep; (os_name == \"nt\" or os_name == \"posix\") and extra == \"cli\""
        );
    }

    #[test]
    fn trailing_specifier_comma() {
        assert_eq!(r("pkg>=1.0,").to_string(), "pkg>=1.0");
        assert_eq!(r("pkg >=1.0, <2 ,; os_name == 'nt'").to_string(), "pkg<2,>=1.0; os_name == \"nt\"");
    }

    #[test]
    fn invalid_requirements() {
        for input in [
            "",
            "definitely not a valid PEP 508 requirement!",
            "-pkg",
            "pkg-",
            "pkg[",
            "pkg[extra",
            "pkg >=",
            "pkg (>=1.0",
            "pkg; ",
            "pkg; os_name",
            "pkg @ ",
        ] {
            assert!(input.parse::<Requirement>().is_err(), "{input:?}");
        }
    }

    #[test]
    fn error_kind() {
        let err = "!!".parse::<Requirement>().unwrap_err();
        assert!(matches!(err, GrammarError::InvalidRequirement(_)));
    }
}
