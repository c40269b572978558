// ── Navigation state snapshot ──
//
// The immutable value published to subscribers after every committed
// dispatch. Observers only ever see complete before/after snapshots,
// never a partially applied state.

use std::sync::Arc;

use crate::action::ActionKind;
use crate::route::Route;
use crate::stack::{BackStack, BackStackEntry};

/// Cursor into an active guided flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidedFlowState {
    pub flow_route: Route,
    pub step_index: usize,
}

/// One committed navigation state.
///
/// Invariants for every published snapshot: the back stack is never
/// empty and the current entry is its last element.
#[derive(Debug, Clone)]
pub struct NavState {
    pub(crate) stack: BackStack,
    pub(crate) active_flow: Option<GuidedFlowState>,
    pub(crate) last_action: Option<ActionKind>,
    pub(crate) is_loading: bool,
}

impl NavState {
    pub(crate) fn initial(stack: BackStack) -> Self {
        Self {
            stack,
            active_flow: None,
            last_action: None,
            is_loading: false,
        }
    }

    pub fn back_stack(&self) -> &BackStack {
        &self.stack
    }

    /// The top of the back stack.
    pub fn current_entry(&self) -> &Arc<BackStackEntry> {
        // Committed states always hold at least one entry.
        let Some(entry) = self.stack.current() else {
            unreachable!("published NavState with empty back stack")
        };
        entry
    }

    pub fn can_go_back(&self) -> bool {
        self.stack.len() > 1
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn active_flow(&self) -> Option<&GuidedFlowState> {
        self.active_flow.as_ref()
    }

    /// Kind of the action that produced this snapshot; `None` only for
    /// the configuration-time initial state.
    pub fn last_action(&self) -> Option<ActionKind> {
        self.last_action
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }
}
