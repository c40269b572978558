// ── Guided flows ──
//
// A guided flow is a scripted ordered sequence of destinations with a
// step cursor. Definitions are created at configuration time and
// mutated only through the atomic edit batch; they are never deleted,
// only deactivated on completion.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::NavError;
use crate::params::Params;
use crate::route::Route;

/// Invoked when a flow advances past its final step.
pub type OnComplete = Arc<dyn Fn() + Send + Sync>;

/// One step of a guided flow: a destination reference plus the params
/// to navigate with.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowStep {
    pub route: Route,
    pub params: Params,
}

impl FlowStep {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            params: Params::new(),
        }
    }

    pub fn with_params(route: Route, params: Params) -> Self {
        Self { route, params }
    }
}

/// Ordered steps plus an optional completion callback.
#[derive(Clone, Default)]
pub struct GuidedFlowDefinition {
    steps: Vec<FlowStep>,
    on_complete: Option<OnComplete>,
}

impl GuidedFlowDefinition {
    pub fn new(steps: Vec<FlowStep>) -> Self {
        Self {
            steps,
            on_complete: None,
        }
    }

    pub fn on_complete(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn steps(&self) -> &[FlowStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&FlowStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn completion(&self) -> Option<OnComplete> {
        self.on_complete.clone()
    }
}

impl fmt::Debug for GuidedFlowDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuidedFlowDefinition")
            .field("steps", &self.steps)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

// ── Edit DSL ──────────────────────────────────────────────────────

/// One atomic edit to a stored flow definition.
///
/// A batch of edits is applied in order as a single transaction before
/// any navigation directive in the same invocation is evaluated.
pub enum FlowEdit {
    /// Insert steps at position `at` (0..=len).
    AddSteps { at: usize, steps: Vec<FlowStep> },
    /// Remove the steps at these indices (de-duplicated, any order).
    RemoveSteps { indices: Vec<usize> },
    /// Replace the step at `index` wholesale.
    ReplaceStep { index: usize, step: FlowStep },
    /// Merge `patch` over the step's current params, producing a new
    /// map (params objects themselves stay immutable).
    UpdateStepParams { index: usize, patch: Params },
    UpdateOnComplete(OnComplete),
}

impl fmt::Debug for FlowEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddSteps { at, steps } => f
                .debug_struct("AddSteps")
                .field("at", at)
                .field("count", &steps.len())
                .finish(),
            Self::RemoveSteps { indices } => {
                f.debug_struct("RemoveSteps").field("indices", indices).finish()
            }
            Self::ReplaceStep { index, .. } => {
                f.debug_struct("ReplaceStep").field("index", index).finish()
            }
            Self::UpdateStepParams { index, patch } => f
                .debug_struct("UpdateStepParams")
                .field("index", index)
                .field("patch", patch)
                .finish(),
            Self::UpdateOnComplete(_) => f.write_str("UpdateOnComplete"),
        }
    }
}

/// Cursor outcome of an edit batch applied while the flow is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CursorAfterEdit {
    /// Flow was not active during the edit.
    Inactive,
    /// Flow stays active at this (possibly shifted) index.
    Active(usize),
    /// Every step was removed; active state must be cleared.
    Emptied,
}

/// Registry of guided flow definitions, keyed by flow route.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: IndexMap<Route, GuidedFlowDefinition>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, flow_route: Route, definition: GuidedFlowDefinition) {
        self.flows.insert(flow_route, definition);
    }

    pub fn get(&self, flow_route: &Route) -> Option<&GuidedFlowDefinition> {
        self.flows.get(flow_route)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.flows.keys()
    }

    pub(crate) fn require(&self, flow_route: &Route) -> Result<&GuidedFlowDefinition, NavError> {
        self.flows
            .get(flow_route)
            .ok_or_else(|| NavError::UnknownGuidedFlow {
                route: flow_route.as_str().to_owned(),
            })
    }

    /// Apply an edit batch atomically to a stored definition.
    ///
    /// `cursor` is the active step index when this flow is the active
    /// one; the returned value carries its maintained position. The
    /// batch is validated edit-by-edit but the definition is only
    /// swapped in when the whole batch succeeds, so a failing batch
    /// leaves both definition and cursor untouched.
    pub(crate) fn apply_edits(
        &mut self,
        flow_route: &Route,
        edits: Vec<FlowEdit>,
        cursor: Option<usize>,
    ) -> Result<CursorAfterEdit, NavError> {
        let stored = self.require(flow_route)?;

        let mut steps = stored.steps.clone();
        let mut on_complete = stored.on_complete.clone();
        let mut index = cursor;

        for edit in edits {
            apply_one(&mut steps, &mut on_complete, &mut index, edit)?;
        }

        let outcome = match (cursor, index) {
            (None, _) => CursorAfterEdit::Inactive,
            (Some(_), _) if steps.is_empty() => CursorAfterEdit::Emptied,
            // Cursor may sit at len after trailing removals; clamp to
            // the final step.
            (Some(_), Some(i)) => CursorAfterEdit::Active(i.min(steps.len() - 1)),
            (Some(_), None) => CursorAfterEdit::Emptied,
        };

        if let Some(definition) = self.flows.get_mut(flow_route) {
            definition.steps = steps;
            definition.on_complete = on_complete;
        }
        Ok(outcome)
    }
}

fn apply_one(
    steps: &mut Vec<FlowStep>,
    on_complete: &mut Option<OnComplete>,
    cursor: &mut Option<usize>,
    edit: FlowEdit,
) -> Result<(), NavError> {
    match edit {
        FlowEdit::AddSteps { at, steps: new } => {
            if at > steps.len() {
                return Err(NavError::StepIndexOutOfRange {
                    index: at,
                    len: steps.len(),
                });
            }
            let count = new.len();
            steps.splice(at..at, new);
            // Inserting at or before the cursor shifts it right.
            if let Some(i) = cursor {
                if at <= *i {
                    *i += count;
                }
            }
        }
        FlowEdit::RemoveSteps { indices } => {
            let mut sorted: Vec<usize> = indices;
            sorted.sort_unstable();
            sorted.dedup();
            if let Some(&max) = sorted.last() {
                if max >= steps.len() {
                    return Err(NavError::StepIndexOutOfRange {
                        index: max,
                        len: steps.len(),
                    });
                }
            }
            // Highest-first so earlier removals cannot shift later ones.
            for &p in sorted.iter().rev() {
                steps.remove(p);
                // Removing a step before the cursor shifts it left;
                // removal at or after the cursor leaves it unchanged.
                if let Some(i) = cursor {
                    if *i > p {
                        *i -= 1;
                    }
                }
            }
            if steps.is_empty() {
                *cursor = None;
            }
        }
        FlowEdit::ReplaceStep { index, step } => {
            let len = steps.len();
            let slot = steps
                .get_mut(index)
                .ok_or(NavError::StepIndexOutOfRange { index, len })?;
            *slot = step;
        }
        FlowEdit::UpdateStepParams { index, patch } => {
            let len = steps.len();
            let slot = steps
                .get_mut(index)
                .ok_or(NavError::StepIndexOutOfRange { index, len })?;
            slot.params = patch.merged_over(&slot.params);
        }
        FlowEdit::UpdateOnComplete(callback) => {
            *on_complete = Some(callback);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn route(s: &str) -> Route {
        Route::parse(s).unwrap()
    }

    fn registry_with(steps: &[&str]) -> (FlowRegistry, Route) {
        let flow = route("onboarding");
        let mut registry = FlowRegistry::new();
        registry.insert(
            flow.clone(),
            GuidedFlowDefinition::new(steps.iter().map(|s| FlowStep::new(route(s))).collect()),
        );
        (registry, flow)
    }

    #[test]
    fn remove_before_cursor_decrements() {
        let (mut registry, flow) = registry_with(&["a", "b", "c", "d"]);
        let outcome = registry
            .apply_edits(&flow, vec![FlowEdit::RemoveSteps { indices: vec![0] }], Some(2))
            .unwrap();
        assert_eq!(outcome, CursorAfterEdit::Active(1));
        assert_eq!(registry.get(&flow).unwrap().len(), 3);
    }

    #[test]
    fn remove_at_or_after_cursor_leaves_it() {
        let (mut registry, flow) = registry_with(&["a", "b", "c", "d"]);
        let outcome = registry
            .apply_edits(&flow, vec![FlowEdit::RemoveSteps { indices: vec![2, 3] }], Some(1))
            .unwrap();
        assert_eq!(outcome, CursorAfterEdit::Active(1));
    }

    #[test]
    fn insert_at_cursor_increments() {
        let (mut registry, flow) = registry_with(&["a", "b"]);
        let outcome = registry
            .apply_edits(
                &flow,
                vec![FlowEdit::AddSteps {
                    at: 1,
                    steps: vec![FlowStep::new(route("x"))],
                }],
                Some(1),
            )
            .unwrap();
        assert_eq!(outcome, CursorAfterEdit::Active(2));
        assert_eq!(registry.get(&flow).unwrap().step(1).unwrap().route.as_str(), "x");
    }

    #[test]
    fn insert_after_cursor_leaves_it() {
        let (mut registry, flow) = registry_with(&["a", "b"]);
        let outcome = registry
            .apply_edits(
                &flow,
                vec![FlowEdit::AddSteps {
                    at: 2,
                    steps: vec![FlowStep::new(route("x"))],
                }],
                Some(1),
            )
            .unwrap();
        assert_eq!(outcome, CursorAfterEdit::Active(1));
    }

    #[test]
    fn duplicate_removal_indices_deduplicated() {
        let (mut registry, flow) = registry_with(&["a", "b", "c"]);
        let outcome = registry
            .apply_edits(
                &flow,
                vec![FlowEdit::RemoveSteps {
                    indices: vec![0, 0, 0],
                }],
                Some(2),
            )
            .unwrap();
        assert_eq!(outcome, CursorAfterEdit::Active(1));
        assert_eq!(registry.get(&flow).unwrap().len(), 2);
    }

    #[test]
    fn removing_every_step_empties_flow() {
        let (mut registry, flow) = registry_with(&["a", "b"]);
        let outcome = registry
            .apply_edits(
                &flow,
                vec![FlowEdit::RemoveSteps { indices: vec![0, 1] }],
                Some(0),
            )
            .unwrap();
        assert_eq!(outcome, CursorAfterEdit::Emptied);
        assert!(registry.get(&flow).unwrap().is_empty());
    }

    #[test]
    fn failing_batch_leaves_definition_untouched() {
        let (mut registry, flow) = registry_with(&["a", "b"]);
        let err = registry
            .apply_edits(
                &flow,
                vec![
                    FlowEdit::RemoveSteps { indices: vec![0] },
                    FlowEdit::ReplaceStep {
                        index: 9,
                        step: FlowStep::new(route("x")),
                    },
                ],
                Some(1),
            )
            .unwrap_err();
        assert!(matches!(err, NavError::StepIndexOutOfRange { .. }));
        // First edit of the failing batch was not committed.
        assert_eq!(registry.get(&flow).unwrap().len(), 2);
    }

    #[test]
    fn update_step_params_merges_patch() {
        let flow = route("setup");
        let mut registry = FlowRegistry::new();
        registry.insert(
            flow.clone(),
            GuidedFlowDefinition::new(vec![FlowStep::with_params(
                route("a"),
                Params::builder().set("keep", "1").set("swap", "old").build(),
            )]),
        );

        registry
            .apply_edits(
                &flow,
                vec![FlowEdit::UpdateStepParams {
                    index: 0,
                    patch: Params::builder().set("swap", "new").build(),
                }],
                None,
            )
            .unwrap();

        let step = registry.get(&flow).unwrap().step(0).unwrap();
        assert_eq!(step.params.get_str("keep"), Some("1"));
        assert_eq!(step.params.get_str("swap"), Some("new"));
    }

    #[test]
    fn unknown_flow_rejected() {
        let (mut registry, _) = registry_with(&["a"]);
        let err = registry
            .apply_edits(&route("missing"), Vec::new(), None)
            .unwrap_err();
        assert!(matches!(err, NavError::UnknownGuidedFlow { .. }));
    }
}
