// ── Deep link matching ──
//
// Matches an absolute URI's path against registered route templates.
// Templates mix literal segments with `{name}` placeholders; matching
// is segment-by-segment, exact count, case-sensitive. Only the path
// component of the URI participates -- scheme, host, query, and
// fragment are ignored.

use tracing::debug;
use url::Url;

use crate::error::NavError;
use crate::params::{ParamValue, Params};
use crate::route::{self, Route};

/// Successful deep-link match: the template's literal base route plus
/// the placeholder bindings extracted from the path.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepLinkMatch {
    pub route: Route,
    pub params: Params,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Template {
    declared: Route,
    segments: Vec<Segment>,
    /// Literal segments joined -- the route a match resolves to.
    base: Route,
}

/// Registry of deep-link route templates.
///
/// Templates are registered at configuration time; the first template
/// (in registration order) matching a path wins.
#[derive(Debug, Clone, Default)]
pub struct DeepLinkParser {
    templates: Vec<Template>,
}

impl DeepLinkParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route template such as `user/edit/{id}`.
    ///
    /// Fails with [`NavError::MalformedRoute`] on unbalanced braces
    /// (via [`Route::parse`]) or a template with no literal segments.
    pub fn register(&mut self, template: impl AsRef<str>) -> Result<(), NavError> {
        let declared = Route::parse(template.as_ref())?;

        let segments: Vec<Segment> = declared
            .segments()
            .map(|s| {
                if route::is_placeholder(s) {
                    Segment::Param(route::placeholder_name(s).to_owned())
                } else {
                    Segment::Literal(s.to_owned())
                }
            })
            .collect();

        let literals: Vec<&str> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(l) => Some(l.as_str()),
                Segment::Param(_) => None,
            })
            .collect();
        if literals.is_empty() {
            return Err(NavError::malformed(
                declared.as_str(),
                "template needs at least one literal segment",
            ));
        }
        let base = Route::parse(literals.join("/"))?;

        self.templates.push(Template {
            declared,
            segments,
            base,
        });
        Ok(())
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Match an absolute URI against the registered templates.
    pub fn parse(&self, uri: &str) -> Result<DeepLinkMatch, NavError> {
        let url = Url::parse(uri)
            .map_err(|e| NavError::malformed(uri, format!("not an absolute URI: {e}")))?;

        let path = url.path().trim_matches('/');
        let segments: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };

        for template in &self.templates {
            if let Some(params) = template.capture(&segments) {
                debug!(
                    template = %template.declared,
                    route = %template.base,
                    "deep link matched"
                );
                return Ok(DeepLinkMatch {
                    route: template.base.clone(),
                    params,
                });
            }
        }

        Err(NavError::NoMatchingRoute {
            uri: uri.to_owned(),
        })
    }
}

impl Template {
    /// Segment-by-segment match: exact count, case-sensitive literals,
    /// placeholders binding positionally.
    fn capture(&self, path: &[&str]) -> Option<Params> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut bindings: Vec<(String, ParamValue)> = Vec::new();
        for (segment, value) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(l) if l == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    bindings.push((name.clone(), ParamValue::from(*value)));
                }
            }
        }
        Some(bindings.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parser() -> DeepLinkParser {
        let mut p = DeepLinkParser::new();
        p.register("user/edit/{id}").unwrap();
        p.register("user/list").unwrap();
        p.register("news/{category}/{article}").unwrap();
        p
    }

    #[test]
    fn extracts_named_placeholder() {
        let m = parser().parse("https://x/user/edit/456").unwrap();
        assert_eq!(m.route.as_str(), "user/edit");
        assert_eq!(m.params.get_str("id"), Some("456"));
    }

    #[test]
    fn literal_template_matches_without_params() {
        let m = parser().parse("https://host.example/user/list").unwrap();
        assert_eq!(m.route.as_str(), "user/list");
        assert!(m.params.is_empty());
    }

    #[test]
    fn multiple_placeholders_bind_positionally() {
        let m = parser().parse("app://x/news/tech/42?ref=push").unwrap();
        assert_eq!(m.route.as_str(), "news");
        assert_eq!(m.params.get_str("category"), Some("tech"));
        assert_eq!(m.params.get_str("article"), Some("42"));
    }

    #[test]
    fn segment_count_must_match_exactly() {
        let p = parser();
        assert!(matches!(
            p.parse("https://x/user/edit"),
            Err(NavError::NoMatchingRoute { .. })
        ));
        assert!(matches!(
            p.parse("https://x/user/edit/456/extra"),
            Err(NavError::NoMatchingRoute { .. })
        ));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(matches!(
            parser().parse("https://x/User/edit/456"),
            Err(NavError::NoMatchingRoute { .. })
        ));
    }

    #[test]
    fn unbalanced_braces_fail_registration() {
        let mut p = DeepLinkParser::new();
        let err = p.register("user/delete/{456").unwrap_err();
        assert!(matches!(err, NavError::MalformedRoute { .. }));
    }

    #[test]
    fn all_placeholder_template_rejected() {
        let mut p = DeepLinkParser::new();
        let err = p.register("{a}/{b}").unwrap_err();
        assert!(matches!(err, NavError::MalformedRoute { .. }));
    }

    #[test]
    fn relative_uri_rejected() {
        let err = parser().parse("/user/edit/456").unwrap_err();
        assert!(matches!(err, NavError::MalformedRoute { .. }));
    }

    #[test]
    fn first_registered_template_wins() {
        let mut p = DeepLinkParser::new();
        p.register("a/{x}").unwrap();
        p.register("a/b").unwrap();

        let m = p.parse("https://x/a/b").unwrap();
        assert_eq!(m.route.as_str(), "a");
        assert_eq!(m.params.get_str("x"), Some("b"));
    }
}
