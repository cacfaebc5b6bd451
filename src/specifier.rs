use std::fmt;
use std::str::FromStr;

use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, delimited, opt, separated, terminated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::error::{describe_parse_error, GrammarError};
use crate::version::Version;

/// Comparison operator of a version specifier.
///
/// See [PEP 440](https://peps.python.org/pep-0440/#version-specifiers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `~=`
    Compatible,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `===`
    Arbitrary,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Compatible => "~=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Arbitrary => "===",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single version specifier such as `>=3.8` or `==1.*`.
///
/// The version text is kept as written so the specifier renders back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    operator: Operator,
    version: String,
    parsed: Option<Version>,
    wildcard: bool,
}

impl Specifier {
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The version text as written (including any `.*`).
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether `version` satisfies this specifier.
    pub fn contains(&self, version: &Version) -> bool {
        let Some(spec) = &self.parsed else {
            return version.to_string().eq_ignore_ascii_case(self.version.trim());
        };
        match self.operator {
            Operator::Equal if self.wildcard => prefix_match(spec, version),
            Operator::NotEqual if self.wildcard => !prefix_match(spec, version),
            Operator::Equal => equal(spec, version),
            Operator::NotEqual => !equal(spec, version),
            Operator::Compatible => {
                let prefix = Version::from_release(
                    spec.release()[..spec.release().len() - 1].iter().copied(),
                );
                version >= spec && prefix_match(&prefix, version)
            }
            Operator::LessEqual => version.public() <= *spec,
            Operator::GreaterEqual => version.public() >= *spec,
            Operator::Less => {
                version < spec
                    && !(!spec.is_prerelease()
                        && version.is_prerelease()
                        && version.base() == spec.base())
            }
            Operator::Greater => {
                version > spec
                    && !(!spec.is_postrelease()
                        && version.is_postrelease()
                        && version.base() == spec.base())
                    && !(!version.local().is_empty() && version.base() == spec.base())
            }
            // arbitrary specifiers are matched textually above
            Operator::Arbitrary => false,
        }
    }
}

fn equal(spec: &Version, version: &Version) -> bool {
    if spec.local().is_empty() {
        version.public() == *spec
    } else {
        version == spec
    }
}

fn prefix_match(prefix: &Version, version: &Version) -> bool {
    version.epoch() == prefix.epoch()
        && prefix
            .release()
            .iter()
            .enumerate()
            .all(|(i, part)| version.release().get(i).copied().unwrap_or(0) == *part)
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

impl FromStr for Specifier {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        delimited(multispace0, specifier, multispace0)
            .parse(s)
            .map_err(|e| GrammarError::InvalidSpecifier(describe_parse_error(&e)))
    }
}

/// A comma-separated set of version specifiers, all of which must hold.
///
/// Renders sorted and comma-joined without spaces, e.g. `<3.11,>3.7`.
///
/// # Examples
///
/// ```
/// use pyproject_metadata::{SpecifierSet, Version};
///
/// let set: SpecifierSet = ">3.7, <3.11, !=3.8.4".parse().unwrap();
/// assert_eq!(set.to_string(), "!=3.8.4,<3.11,>3.7");
/// assert!(set.contains(&"3.9".parse::<Version>().unwrap()));
/// assert!(!set.contains(&"3.8.4".parse::<Version>().unwrap()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecifierSet(Vec<Specifier>);

impl SpecifierSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Specifier> {
        self.0.iter()
    }

    /// Whether `version` satisfies every specifier in the set.
    pub fn contains(&self, version: &Version) -> bool {
        self.0.iter().all(|spec| spec.contains(version))
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut rendered: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        rendered.sort();
        f.write_str(&rendered.join(","))
    }
}

impl FromStr for SpecifierSet {
    type Err = GrammarError;

    /// Blank comma-separated parts are skipped, so `>=3.8,` is `>=3.8`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Specifier>, _>>()
            .map(SpecifierSet)
    }
}

fn check_version(operator: Operator, text: &str) -> Result<Specifier, GrammarError> {
    let invalid = |why: &str| GrammarError::InvalidSpecifier(format!("{operator}{text}: {why}"));

    if operator == Operator::Arbitrary {
        return Ok(Specifier {
            operator,
            version: text.to_string(),
            parsed: None,
            wildcard: false,
        });
    }

    let (body, wildcard) = match text.strip_suffix(".*") {
        Some(prefix) => (prefix, true),
        None => (text, false),
    };
    let parsed: Version = body.parse()?;

    if wildcard {
        if !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(invalid("wildcards are only allowed with == and !="));
        }
        if parsed.is_prerelease() || parsed.is_postrelease() || !parsed.local().is_empty() {
            return Err(invalid("a wildcard may only follow a release segment"));
        }
    }
    if !parsed.local().is_empty() && !matches!(operator, Operator::Equal | Operator::NotEqual) {
        return Err(invalid("local versions are only allowed with == and !="));
    }
    if operator == Operator::Compatible && parsed.release().len() < 2 {
        return Err(invalid("~= requires at least two release segments"));
    }

    Ok(Specifier {
        operator,
        version: text.to_string(),
        parsed: Some(parsed),
        wildcard,
    })
}

// Winnow parsers

fn operator(input: &mut &str) -> ModalResult<Operator> {
    alt((
        "===".value(Operator::Arbitrary),
        "~=".value(Operator::Compatible),
        "==".value(Operator::Equal),
        "!=".value(Operator::NotEqual),
        "<=".value(Operator::LessEqual),
        ">=".value(Operator::GreaterEqual),
        "<".value(Operator::Less),
        ">".value(Operator::Greater),
    ))
    .parse_next(input)
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+' | '!' | '*')
}

fn is_arbitrary_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | ';' | ')')
}

/// Parse one specifier, e.g. `>= 1.0`.
pub(crate) fn specifier(input: &mut &str) -> ModalResult<Specifier> {
    let operator = operator(input)?;
    multispace0.parse_next(input)?;
    let text = if operator == Operator::Arbitrary {
        cut_err(take_while(1.., is_arbitrary_char))
            .context(StrContext::Expected(StrContextValue::Description("a version")))
            .parse_next(input)?
    } else {
        cut_err(take_while(1.., is_version_char))
            .context(StrContext::Expected(StrContextValue::Description("a version")))
            .parse_next(input)?
    };
    cut_err(winnow::combinator::empty.try_map(move |_: ()| check_version(operator, text)))
        .context(StrContext::Label("version specifier"))
        .parse_next(input)
}

/// Parse a possibly empty comma-separated specifier list with an optional
/// trailing comma.
pub(crate) fn specifier_list(input: &mut &str) -> ModalResult<SpecifierSet> {
    terminated(
        separated(0.., specifier, (multispace0, ',', multispace0)),
        opt((multispace0, ',')),
    )
    .map(SpecifierSet)
    .parse_next(input)
}
