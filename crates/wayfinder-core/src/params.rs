// ── Navigation parameters ──
//
// Immutable key/value payload attached to a back-stack entry or flow
// step. Replaced wholesale on update, never patched in place -- the
// shared Arc makes clones free and mutation impossible.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Number(f64),
    Bool(bool),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for ParamValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(m: BTreeMap<String, ParamValue>) -> Self {
        Self::Map(m)
    }
}

/// Immutable parameter map.
///
/// Cheap to clone (`Arc`-backed). There is deliberately no `insert` --
/// build a new map with [`Params::builder`] or derive one with
/// [`Params::merged_over`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Arc<BTreeMap<String, ParamValue>>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ParamsBuilder {
        ParamsBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Produce a new map with `self` layered over `base`: keys present
    /// in both take `self`'s value.
    pub fn merged_over(&self, base: &Params) -> Params {
        if base.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return base.clone();
        }
        let mut merged = (*base.0).clone();
        for (k, v) in &*self.0 {
            merged.insert(k.clone(), v.clone());
        }
        Params(Arc::new(merged))
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&*self.0) {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "{{..}}"),
        }
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

/// Builder for [`Params`].
#[derive(Debug, Default)]
pub struct ParamsBuilder {
    entries: BTreeMap<String, ParamValue>,
}

impl ParamsBuilder {
    pub fn set(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Params {
        Params(Arc::new(self.entries))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builder_builds_sorted_map() {
        let params = Params::builder().set("b", 2i64).set("a", "x").build();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get_str("a"), Some("x"));
        assert_eq!(params.get("b").unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn merged_over_prefers_self() {
        let base = Params::builder().set("id", "1").set("tab", "info").build();
        let over = Params::builder().set("id", "2").build();

        let merged = over.merged_over(&base);
        assert_eq!(merged.get_str("id"), Some("2"));
        assert_eq!(merged.get_str("tab"), Some("info"));
    }

    #[test]
    fn clones_share_storage() {
        let params = Params::builder().set("k", true).build();
        let clone = params.clone();
        assert_eq!(params, clone);
        assert_eq!(clone.get("k").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn display_renders_json() {
        let params = Params::builder().set("id", "456").build();
        assert_eq!(params.to_string(), r#"{"id":"456"}"#);
    }
}
