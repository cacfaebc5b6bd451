use std::fmt;
use std::str::FromStr;

use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, cut_err, delimited, preceded, repeat};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

use crate::error::{describe_parse_error, GrammarError};

/// An environment marker variable.
///
/// Legacy dotted spellings (`os.name`, `sys.platform`, ...) are accepted and
/// normalized to their PEP 508 names.
///
/// See [PEP 508](https://peps.python.org/pep-0508/#environment-markers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerVariable {
    ImplementationName,
    ImplementationVersion,
    OsName,
    PlatformMachine,
    PlatformPythonImplementation,
    PlatformRelease,
    PlatformSystem,
    PlatformVersion,
    PythonFullVersion,
    PythonVersion,
    SysPlatform,
    Extra,
}

impl MarkerVariable {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerVariable::ImplementationName => "implementation_name",
            MarkerVariable::ImplementationVersion => "implementation_version",
            MarkerVariable::OsName => "os_name",
            MarkerVariable::PlatformMachine => "platform_machine",
            MarkerVariable::PlatformPythonImplementation => "platform_python_implementation",
            MarkerVariable::PlatformRelease => "platform_release",
            MarkerVariable::PlatformSystem => "platform_system",
            MarkerVariable::PlatformVersion => "platform_version",
            MarkerVariable::PythonFullVersion => "python_full_version",
            MarkerVariable::PythonVersion => "python_version",
            MarkerVariable::SysPlatform => "sys_platform",
            MarkerVariable::Extra => "extra",
        }
    }
}

impl FromStr for MarkerVariable {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "implementation_name" => Ok(MarkerVariable::ImplementationName),
            "implementation_version" => Ok(MarkerVariable::ImplementationVersion),
            "os_name" | "os.name" => Ok(MarkerVariable::OsName),
            "platform_machine" | "platform.machine" => Ok(MarkerVariable::PlatformMachine),
            "platform_python_implementation"
            | "platform.python_implementation"
            | "python_implementation" => Ok(MarkerVariable::PlatformPythonImplementation),
            "platform_release" => Ok(MarkerVariable::PlatformRelease),
            "platform_system" => Ok(MarkerVariable::PlatformSystem),
            "platform_version" | "platform.version" => Ok(MarkerVariable::PlatformVersion),
            "python_full_version" => Ok(MarkerVariable::PythonFullVersion),
            "python_version" => Ok(MarkerVariable::PythonVersion),
            "sys_platform" | "sys.platform" => Ok(MarkerVariable::SysPlatform),
            "extra" => Ok(MarkerVariable::Extra),
            _ => Err(GrammarError::InvalidMarker(format!(
                "unknown marker variable {s:?}"
            ))),
        }
    }
}

/// One side of a marker comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerValue {
    Variable(MarkerVariable),
    /// A quoted string literal, without its quotes.
    String(String),
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MarkerValue::Variable(var) => f.write_str(var.as_str()),
            MarkerValue::String(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Comparison operator inside a marker expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerOperator {
    Arbitrary,
    Equal,
    NotEqual,
    Compatible,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    In,
    NotIn,
}

impl MarkerOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerOperator::Arbitrary => "===",
            MarkerOperator::Equal => "==",
            MarkerOperator::NotEqual => "!=",
            MarkerOperator::Compatible => "~=",
            MarkerOperator::LessEqual => "<=",
            MarkerOperator::GreaterEqual => ">=",
            MarkerOperator::Less => "<",
            MarkerOperator::Greater => ">",
            MarkerOperator::In => "in",
            MarkerOperator::NotIn => "not in",
        }
    }
}

/// A single `lhs op rhs` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerExpression {
    pub lhs: MarkerValue,
    pub op: MarkerOperator,
    pub rhs: MarkerValue,
}

impl fmt::Display for MarkerExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op.as_str(), self.rhs)
    }
}

/// Boolean connective between marker atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }
}

/// An operand of a marker chain: a comparison or a parenthesized group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerAtom {
    Expression(MarkerExpression),
    Group(MarkerTree),
}

/// A parsed PEP 508 environment marker.
///
/// The marker is kept as written: a flat chain of atoms joined by `and`/`or`
/// (with `and` binding tighter), where explicit parentheses become nested
/// [`MarkerAtom::Group`]s. Rendering normalizes quoting and spacing only.
///
/// # Examples
///
/// ```
/// use pyproject_metadata::MarkerTree;
///
/// let marker: MarkerTree = "os_name=='nt' or sys_platform == 'win32'".parse().unwrap();
/// assert_eq!(marker.to_string(), "os_name == \"nt\" or sys_platform == \"win32\"");
/// assert_eq!(
///     marker.and_extra("test").to_string(),
///     "(os_name == \"nt\" or sys_platform == \"win32\") and extra == \"test\""
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTree {
    first: Box<MarkerAtom>,
    rest: Vec<(BoolOp, MarkerAtom)>,
}

impl MarkerTree {
    /// A marker consisting of a single comparison.
    pub fn expression(expression: MarkerExpression) -> Self {
        MarkerTree {
            first: Box::new(MarkerAtom::Expression(expression)),
            rest: Vec::new(),
        }
    }

    /// The `extra == "<name>"` marker.
    pub fn extra(name: &str) -> Self {
        MarkerTree::expression(MarkerExpression {
            lhs: MarkerValue::Variable(MarkerVariable::Extra),
            op: MarkerOperator::Equal,
            rhs: MarkerValue::String(name.to_string()),
        })
    }

    pub fn first(&self) -> &MarkerAtom {
        &self.first
    }

    pub fn rest(&self) -> &[(BoolOp, MarkerAtom)] {
        &self.rest
    }

    /// Whether an `or` appears at the top level of the chain.
    pub fn has_top_level_or(&self) -> bool {
        self.rest.iter().any(|(op, _)| *op == BoolOp::Or)
    }

    /// Conjoin this marker with `extra == "<extra>"`.
    ///
    /// A top-level `or` chain is parenthesized first so the added clause
    /// applies to the whole marker.
    pub fn and_extra(self, extra: &str) -> MarkerTree {
        let mut tree = self.unwrap_group();
        if tree.has_top_level_or() {
            tree = MarkerTree {
                first: Box::new(MarkerAtom::Group(tree)),
                rest: Vec::new(),
            };
        }
        let extra = MarkerTree::extra(extra);
        tree.rest.push((BoolOp::And, *extra.first));
        tree
    }

    /// Strip parentheses that enclose the whole marker.
    fn unwrap_group(self) -> MarkerTree {
        let mut tree = self;
        while tree.rest.is_empty() {
            match *tree.first {
                MarkerAtom::Group(inner) => tree = inner,
                first => {
                    return MarkerTree {
                        first: Box::new(first),
                        rest: Vec::new(),
                    }
                }
            }
        }
        tree
    }

    fn fmt_chain(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_atom(f, &self.first)?;
        for (op, atom) in &self.rest {
            write!(f, " {} ", op.as_str())?;
            fmt_atom(f, atom)?;
        }
        Ok(())
    }
}

fn fmt_atom(f: &mut fmt::Formatter, atom: &MarkerAtom) -> fmt::Result {
    match atom {
        MarkerAtom::Expression(expr) => write!(f, "{expr}"),
        MarkerAtom::Group(tree) => {
            write!(f, "(")?;
            tree.fmt_chain(f)?;
            write!(f, ")")
        }
    }
}

impl fmt::Display for MarkerTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut tree = self;
        while let (MarkerAtom::Group(inner), true) = (tree.first.as_ref(), tree.rest.is_empty()) {
            tree = inner;
        }
        tree.fmt_chain(f)
    }
}

impl FromStr for MarkerTree {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        delimited(multispace0, marker, multispace0)
            .parse(s)
            .map_err(|e| GrammarError::InvalidMarker(describe_parse_error(&e)))
    }
}

// Winnow parsers

fn quoted_string(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .map(|s: &str| s.to_string())
    .parse_next(input)
}

fn is_variable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn marker_value(input: &mut &str) -> ModalResult<MarkerValue> {
    alt((
        quoted_string.map(MarkerValue::String),
        take_while(1.., is_variable_char)
            .try_map(|name: &str| name.parse::<MarkerVariable>())
            .map(MarkerValue::Variable),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "a marker variable or quoted string",
    )))
    .parse_next(input)
}

fn marker_operator(input: &mut &str) -> ModalResult<MarkerOperator> {
    alt((
        "===".value(MarkerOperator::Arbitrary),
        "==".value(MarkerOperator::Equal),
        "!=".value(MarkerOperator::NotEqual),
        "~=".value(MarkerOperator::Compatible),
        "<=".value(MarkerOperator::LessEqual),
        ">=".value(MarkerOperator::GreaterEqual),
        "<".value(MarkerOperator::Less),
        ">".value(MarkerOperator::Greater),
        ("not", multispace1, "in").value(MarkerOperator::NotIn),
        "in".value(MarkerOperator::In),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "a marker operator",
    )))
    .parse_next(input)
}

fn marker_expression(input: &mut &str) -> ModalResult<MarkerExpression> {
    let lhs = marker_value(input)?;
    multispace0.parse_next(input)?;
    let op = cut_err(marker_operator).parse_next(input)?;
    multispace0.parse_next(input)?;
    let rhs = cut_err(marker_value).parse_next(input)?;
    Ok(MarkerExpression { lhs, op, rhs })
}

fn marker_atom(input: &mut &str) -> ModalResult<MarkerAtom> {
    alt((
        preceded(
            ('(', multispace0),
            cut_err((marker, multispace0, ')')).context(StrContext::Label("marker group")),
        )
        .map(|(tree, _, _)| MarkerAtom::Group(tree)),
        marker_expression.map(MarkerAtom::Expression),
    ))
    .parse_next(input)
}

fn bool_op(input: &mut &str) -> ModalResult<BoolOp> {
    delimited(
        multispace0,
        alt(("and".value(BoolOp::And), "or".value(BoolOp::Or))),
        multispace0,
    )
    .parse_next(input)
}

/// Parse a full marker chain.
pub(crate) fn marker(input: &mut &str) -> ModalResult<MarkerTree> {
    let first = marker_atom(input)?;
    let rest: Vec<(BoolOp, MarkerAtom)> =
        repeat(0.., (bool_op, cut_err(marker_atom))).parse_next(input)?;
    Ok(MarkerTree {
        first: Box::new(first),
        rest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> MarkerTree {
        s.parse().unwrap()
    }

    #[test]
    fn normalizes_quotes_and_spacing() {
        assert_eq!(m("os_name != 'nt'").to_string(), "os_name != \"nt\"");
        assert_eq!(
            m("python_version>='3.8'and os_name=='posix'").to_string(),
            "python_version >= \"3.8\" and os_name == \"posix\""
        );
        assert_eq!(
            m("'linux' not   in sys_platform").to_string(),
            "\"linux\" not in sys_platform"
        );
    }

    #[test]
    fn legacy_variables_are_normalized() {
        assert_eq!(m("os.name == 'nt'").to_string(), "os_name == \"nt\"");
        assert_eq!(
            m("python_implementation == 'CPython'").to_string(),
            "platform_python_implementation == \"CPython\""
        );
    }

    #[test]
    fn groups_are_kept() {
        assert_eq!(
            m("(os_name == 'nt' or os_name == 'posix') and python_version < '3.9'").to_string(),
            "(os_name == \"nt\" or os_name == \"posix\") and python_version < \"3.9\""
        );
        assert_eq!(m("((os_name == 'nt'))").to_string(), "os_name == \"nt\"");
    }

    #[test]
    fn and_extra_without_or() {
        let tree = m("os_name == 'nt'").and_extra("test");
        assert_eq!(tree.to_string(), "os_name == \"nt\" and extra == \"test\"");
    }

    #[test]
    fn and_extra_parenthesizes_or() {
        let tree = m("os_name == 'nt' or python_version < '3.8'").and_extra("test");
        assert_eq!(
            tree.to_string(),
            "(os_name == \"nt\" or python_version < \"3.8\") and extra == \"test\""
        );
    }

    #[test]
    fn and_extra_keeps_meaning_of_outer_group() {
        let tree = m("(os_name == 'nt' or os_name == 'posix')").and_extra("x");
        assert_eq!(
            tree.to_string(),
            "(os_name == \"nt\" or os_name == \"posix\") and extra == \"x\""
        );
    }

    #[test]
    fn and_extra_round_trips() {
        let tree = m("os_name == 'nt' or python_version < '3.8'").and_extra("test");
        assert_eq!(m(&tree.to_string()), tree);
    }

    #[test]
    fn invalid_markers() {
        for input in [
            "",
            "os_name",
            "os_name ==",
            "unknown_var == 'x'",
            "os_name == 'nt' and",
            "(os_name == 'nt'",
            "os_name == 'nt",
        ] {
            assert!(input.parse::<MarkerTree>().is_err(), "{input:?}");
        }
    }
}
