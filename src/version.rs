use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use winnow::combinator::{alt, cut_err, empty, opt, preceded, repeat, terminated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::error::{describe_parse_error, GrammarError};

/// Pre-release phase of a version.
///
/// See [PEP 440](https://peps.python.org/pep-0440/#pre-releases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreKind {
    /// `a` / `alpha`.
    Alpha,
    /// `b` / `beta`.
    Beta,
    /// `rc` / `c` / `pre` / `preview`.
    ReleaseCandidate,
}

impl PreKind {
    /// Normalized spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            PreKind::Alpha => "a",
            PreKind::Beta => "b",
            PreKind::ReleaseCandidate => "rc",
        }
    }
}

/// A segment of the local version label (`+ubuntu.1` has two).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocalSegment {
    /// All-digit segment, compared numerically.
    Number(u64),
    /// Alphanumeric segment, compared lexically.
    String(String),
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LocalSegment::Number(n) => write!(f, "{n}"),
            LocalSegment::String(s) => write!(f, "{s}"),
        }
    }
}

/// A PEP 440 version.
///
/// Parsing accepts every spelling PEP 440 allows; [`Display`](fmt::Display)
/// renders the normalized form. Comparison follows PEP 440 ordering, so
/// `1.0` and `1.0.0` compare equal.
///
/// See [PEP 440](https://peps.python.org/pep-0440/).
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
}

impl Version {
    /// Build a final release from its release segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use pyproject_metadata::Version;
    ///
    /// let v = Version::from_release([1, 2, 3]);
    /// assert_eq!(v.to_string(), "1.2.3");
    /// assert_eq!(v, "1.2.3".parse::<Version>().unwrap());
    /// ```
    pub fn from_release(release: impl IntoIterator<Item = u64>) -> Self {
        let release: Vec<u64> = release.into_iter().collect();
        Version {
            epoch: 0,
            release: if release.is_empty() { vec![0] } else { release },
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre(&self) -> Option<(PreKind, u64)> {
        self.pre
    }

    pub fn post(&self) -> Option<u64> {
        self.post
    }

    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    pub fn local(&self) -> &[LocalSegment] {
        &self.local
    }

    /// Whether this is a pre-release or a development release.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// The version without its local label.
    pub fn public(&self) -> Version {
        Version {
            local: Vec::new(),
            ..self.clone()
        }
    }

    /// Epoch and release only (`1!2.0rc1+abc` → `1!2.0`).
    pub fn base(&self) -> Version {
        Version {
            epoch: self.epoch,
            release: self.release.clone(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    fn cmp_key(&self) -> (u64, &[u64], PreKey, PostKey, DevKey) {
        let mut release = self.release.as_slice();
        while let [rest @ .., 0] = release {
            release = rest;
        }
        let pre = match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (None, _, _) => PreKey::Final,
            (Some((kind, n)), _, _) => PreKey::Pre(kind, n),
        };
        let post = self.post.map_or(PostKey::None, PostKey::Post);
        let dev = self.dev.map_or(DevKey::None, DevKey::Dev);
        (self.epoch, release, pre, post, dev)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum PostKey {
    None,
    Post(u64),
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    None,
}

fn cmp_local(a: &[LocalSegment], b: &[LocalSegment]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = match (x, y) {
            (LocalSegment::Number(x), LocalSegment::Number(y)) => x.cmp(y),
            (LocalSegment::String(x), LocalSegment::String(y)) => x.cmp(y),
            (LocalSegment::Number(_), LocalSegment::String(_)) => Ordering::Greater,
            (LocalSegment::String(_), LocalSegment::Number(_)) => Ordering::Less,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_key()
            .cmp(&other.cmp_key())
            .then_with(|| cmp_local(&self.local, &other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        for (i, part) in self.release.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{part}")?;
        }
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{n}", kind.as_str())?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if !self.local.is_empty() {
            write!(f, "+")?;
            for (i, segment) in self.local.iter().enumerate() {
                if i > 0 {
                    write!(f, ".")?;
                }
                write!(f, "{segment}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        parse_version
            .parse(lowered.as_str())
            .map_err(|e| GrammarError::InvalidVersion(describe_parse_error(&e)))
    }
}

// Winnow parsers

fn number(input: &mut &str) -> ModalResult<u64> {
    let digits = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    cut_err(empty.try_map(move |_: ()| digits.parse::<u64>()))
        .context(StrContext::Label("version number"))
        .context(StrContext::Expected(StrContextValue::Description(
            "an integer below 2^64",
        )))
        .parse_next(input)
}

fn separator(input: &mut &str) -> ModalResult<char> {
    one_of(['-', '_', '.']).parse_next(input)
}

fn release(input: &mut &str) -> ModalResult<Vec<u64>> {
    let first = number(input)?;
    let rest: Vec<u64> = repeat(0.., preceded('.', number)).parse_next(input)?;
    let mut release = Vec::with_capacity(rest.len() + 1);
    release.push(first);
    release.extend(rest);
    Ok(release)
}

fn pre_kind(input: &mut &str) -> ModalResult<PreKind> {
    alt((
        "alpha".value(PreKind::Alpha),
        "beta".value(PreKind::Beta),
        "preview".value(PreKind::ReleaseCandidate),
        "pre".value(PreKind::ReleaseCandidate),
        "rc".value(PreKind::ReleaseCandidate),
        "a".value(PreKind::Alpha),
        "b".value(PreKind::Beta),
        "c".value(PreKind::ReleaseCandidate),
    ))
    .parse_next(input)
}

fn pre_release(input: &mut &str) -> ModalResult<(PreKind, u64)> {
    (opt(separator), pre_kind, opt(separator), opt(number))
        .map(|(_, kind, _, n)| (kind, n.unwrap_or(0)))
        .parse_next(input)
}

fn post_release(input: &mut &str) -> ModalResult<u64> {
    alt((
        preceded('-', number),
        (
            opt(separator),
            alt(("post", "rev", "r")),
            opt(separator),
            opt(number),
        )
            .map(|(_, _, _, n)| n.unwrap_or(0)),
    ))
    .parse_next(input)
}

fn dev_release(input: &mut &str) -> ModalResult<u64> {
    (opt(separator), "dev", opt(separator), opt(number))
        .map(|(_, _, _, n)| n.unwrap_or(0))
        .parse_next(input)
}

fn local_segment(input: &mut &str) -> ModalResult<LocalSegment> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric())
        .map(|s: &str| match s.parse::<u64>() {
            Ok(n) if s.bytes().all(|b| b.is_ascii_digit()) => LocalSegment::Number(n),
            _ => LocalSegment::String(s.to_string()),
        })
        .parse_next(input)
}

fn local_label(input: &mut &str) -> ModalResult<Vec<LocalSegment>> {
    let first = local_segment(input)?;
    let rest: Vec<LocalSegment> =
        repeat(0.., preceded(separator, local_segment)).parse_next(input)?;
    let mut segments = vec![first];
    segments.extend(rest);
    Ok(segments)
}

/// Parse a lower-cased, trimmed version string.
pub(crate) fn parse_version(input: &mut &str) -> ModalResult<Version> {
    opt('v').parse_next(input)?;
    let epoch = opt(terminated(number, '!')).parse_next(input)?.unwrap_or(0);
    let release = release(input)?;
    let pre = opt(pre_release).parse_next(input)?;
    let post = opt(post_release).parse_next(input)?;
    let dev = opt(dev_release).parse_next(input)?;
    let local = opt(preceded('+', local_label))
        .parse_next(input)?
        .unwrap_or_default();
    Ok(Version {
        epoch,
        release,
        pre,
        post,
        dev,
        local,
    })
}
