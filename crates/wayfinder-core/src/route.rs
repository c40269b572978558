// ── Route addresses ──
//
// A Route is a normalized `/`-separated path: leading segments address
// nested graphs, the trailing segment addresses a screen. Segments of
// the form `{name}` are template placeholders, only meaningful inside
// deep-link templates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NavError;

/// Hierarchical string address of a destination.
///
/// Normalized at construction: no leading or trailing slash, no empty
/// segments. Comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Route(String);

impl Route {
    /// Parse and normalize a route expression.
    ///
    /// Strips at most one leading and trailing `/`. Rejects empty routes,
    /// empty segments, and segments with unbalanced `{`/`}` braces.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, NavError> {
        let raw = raw.as_ref();
        let trimmed = raw.trim_start_matches('/').trim_end_matches('/');

        if trimmed.is_empty() {
            return Err(NavError::malformed(raw, "route has no segments"));
        }

        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(NavError::malformed(raw, "empty segment"));
            }
            validate_braces(raw, segment)?;
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// Whether any segment is a `{name}` placeholder.
    pub fn is_template(&self) -> bool {
        self.segments().any(is_placeholder)
    }
}

/// `{name}` placeholder check. Assumes the segment already passed
/// brace validation.
pub(crate) fn is_placeholder(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2
}

/// Extract the name from a `{name}` placeholder segment.
pub(crate) fn placeholder_name(segment: &str) -> &str {
    &segment[1..segment.len() - 1]
}

/// A segment is either a well-formed `{name}` placeholder or a literal
/// containing no braces at all.
fn validate_braces(route: &str, segment: &str) -> Result<(), NavError> {
    let opens = segment.matches('{').count();
    let closes = segment.matches('}').count();

    if opens == 0 && closes == 0 {
        return Ok(());
    }
    if is_placeholder(segment) && opens == 1 && closes == 1 {
        return Ok(());
    }
    Err(NavError::malformed(
        route,
        format!("unbalanced braces in segment {segment:?}"),
    ))
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Route {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Route {
    type Error = NavError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Route> for String {
    fn from(r: Route) -> Self {
        r.0
    }
}
