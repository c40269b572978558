// ── Navigation actions ──
//
// Actions are the sole mechanism for navigation state mutation: hosts
// dispatch them through the store, the reducer applies them one at a
// time in submission order.

use strum::EnumDiscriminants;

use crate::error::NavError;
use crate::params::Params;
use crate::route::Route;

/// Options modifying a [`NavAction::Navigate`] dispatch.
///
/// `clear_back_stack`, `pop_up_to`, and the final push/replace apply as
/// one atomic stack transformation within the dispatch -- never as
/// sequential dispatches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Collapse the stack before pushing the new entry.
    pub clear_back_stack: bool,
    /// Trim from the top until this route is found. Matched literally
    /// against each entry's concrete full route, not the expression it
    /// was navigated with: navigating to `home` lands on `home/feed`,
    /// so the target here must be `home/feed`.
    pub pop_up_to: Option<Route>,
    /// With `pop_up_to`: also remove the matching entry.
    pub inclusive: bool,
    /// Swap the top entry instead of pushing (size unchanged).
    /// Mutually exclusive with `clear_back_stack`.
    pub replace_with: bool,
}

impl NavigateOptions {
    pub fn clear() -> Self {
        Self {
            clear_back_stack: true,
            ..Self::default()
        }
    }

    pub fn replace() -> Self {
        Self {
            replace_with: true,
            ..Self::default()
        }
    }

    /// `route` must be the target entry's concrete full route (the
    /// start screen a graph expression resolved to, not the expression
    /// itself).
    pub fn pop_up_to(route: Route, inclusive: bool) -> Self {
        Self {
            pop_up_to: Some(route),
            inclusive,
            ..Self::default()
        }
    }

    /// `replace_with` preserves stack size while `clear_back_stack`
    /// collapses it; the combination has no coherent meaning.
    pub(crate) fn validate(&self) -> Result<(), NavError> {
        if self.replace_with && self.clear_back_stack {
            return Err(NavError::InvalidNavigationOptions {
                reason: "replace_with and clear_back_stack are mutually exclusive".into(),
            });
        }
        Ok(())
    }
}

/// Every navigation state transition is expressed as a NavAction.
#[derive(Debug, Clone, EnumDiscriminants)]
#[strum_discriminants(name(ActionKind), derive(Hash, strum::Display))]
pub enum NavAction {
    /// Resolve `route` and apply the combined stack transformation.
    Navigate {
        route: Route,
        params: Params,
        options: NavigateOptions,
    },
    /// Pop the current entry; exhaustion is a no-op.
    Back,
    SetLoading(bool),

    // ── Guided flows ──────────────────────────────────────────────
    StartGuidedFlow {
        flow_route: Route,
    },
    NextStep,
    PreviousStep,

    /// Replace the current entry's params with an empty map; identity
    /// is preserved and no lifecycle events fire.
    ClearCurrentScreenParams,

    /// Restore the configuration-time initial state. Coordinated by the
    /// store's reset gate, not the reducer.
    Reset,
}

impl NavAction {
    /// Plain navigation to a route, no params, default options.
    pub fn navigate(route: Route) -> Self {
        Self::Navigate {
            route,
            params: Params::new(),
            options: NavigateOptions::default(),
        }
    }

    pub fn navigate_with(route: Route, params: Params, options: NavigateOptions) -> Self {
        Self::Navigate {
            route,
            params,
            options,
        }
    }

    pub fn kind(&self) -> ActionKind {
        ActionKind::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_options_rejected() {
        let options = NavigateOptions {
            clear_back_stack: true,
            replace_with: true,
            ..NavigateOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(NavError::InvalidNavigationOptions { .. })
        ));
    }

    #[test]
    fn default_options_valid() {
        assert!(NavigateOptions::default().validate().is_ok());
        assert!(NavigateOptions::clear().validate().is_ok());
        assert!(NavigateOptions::replace().validate().is_ok());
    }

    #[test]
    fn kind_tracks_variant() {
        let action = NavAction::Back;
        assert_eq!(action.kind(), ActionKind::Back);
        assert_eq!(action.kind().to_string(), "Back");
    }
}
