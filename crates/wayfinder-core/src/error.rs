// ── Core error types ──
//
// Every way a dispatch can be rejected. Rejections are synchronous and
// leave navigation state untouched -- no partial mutation is ever
// committed. Benign terminal states (back-navigation exhaustion,
// PreviousStep at index 0) are no-ops, not errors, and do not appear here.

use thiserror::Error;

/// Unified error type for the navigation core.
#[derive(Debug, Clone, Error)]
pub enum NavError {
    // ── Resolution errors ────────────────────────────────────────────
    #[error("Route not found: {route}")]
    RouteNotFound { route: String },

    #[error("Ambiguous route {route:?} in graph {graph:?}: duplicate across sibling scopes")]
    AmbiguousRoute { route: String, graph: String },

    #[error("Malformed route {input:?}: {reason}")]
    MalformedRoute { input: String, reason: String },

    // ── Deep link errors ─────────────────────────────────────────────
    #[error("No registered template matches deep link: {uri}")]
    NoMatchingRoute { uri: String },

    // ── Back stack errors ────────────────────────────────────────────
    #[error("popUpTo target not on the back stack: {route}")]
    TargetNotFound { route: String },

    #[error("Invalid navigation options: {reason}")]
    InvalidNavigationOptions { reason: String },

    // ── Guided flow errors ───────────────────────────────────────────
    #[error("Unknown guided flow: {route}")]
    UnknownGuidedFlow { route: String },

    #[error("Step index {index} out of range (flow has {len} steps)")]
    StepIndexOutOfRange { index: usize, len: usize },
}

impl NavError {
    pub(crate) fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRoute {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
