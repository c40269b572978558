// ── Action reducer ──
//
// Pure function from (state, action) to the next state. Every composite
// mutation -- clear + push, popUpTo + replace, flow step navigation --
// happens inside a single call, so the diff and the final stack reflect
// the combined effect and no intermediate state is ever observable.

use crate::action::{ActionKind, NavAction, NavigateOptions};
use crate::error::NavError;
use crate::flow::FlowRegistry;
use crate::graph::Graph;
use crate::params::Params;
use crate::route::Route;
use crate::stack::{BackStackEntry, StackDiff};
use crate::state::{GuidedFlowState, NavState};

/// Read-only configuration the reducer resolves against.
pub(crate) struct ReduceCtx<'a> {
    pub graph: &'a Graph,
    pub flows: &'a FlowRegistry,
}

/// Outcome of one reduction: the next state, the identity diff of the
/// stack transformation, and a flow completion to fire after commit.
#[derive(Debug)]
pub(crate) struct Reduced {
    pub state: NavState,
    pub diff: StackDiff,
    pub completed_flow: Option<Route>,
}

impl Reduced {
    fn unchanged(current: &NavState, kind: ActionKind) -> Self {
        let mut state = current.clone();
        state.last_action = Some(kind);
        Self {
            state,
            diff: StackDiff::default(),
            completed_flow: None,
        }
    }
}

/// Apply one action. Failures reject the dispatch synchronously and
/// leave the input state untouched.
#[allow(clippy::too_many_lines)]
pub(crate) fn reduce(
    current: &NavState,
    action: &NavAction,
    ctx: &ReduceCtx<'_>,
) -> Result<Reduced, NavError> {
    match action {
        NavAction::Navigate {
            route,
            params,
            options,
        } => navigate(
            current,
            route,
            params.clone(),
            options,
            ctx.graph,
            current.active_flow.clone(),
            ActionKind::Navigate,
        ),

        NavAction::Back => {
            let mut state = current.clone();
            state.last_action = Some(ActionKind::Back);
            let removed = state.stack.pop();
            // Exhaustion pops nothing: a normal terminal state.
            Ok(Reduced {
                state,
                diff: StackDiff {
                    removed,
                    pushed: Vec::new(),
                },
                completed_flow: None,
            })
        }

        NavAction::SetLoading(loading) => {
            let mut state = current.clone();
            state.is_loading = *loading;
            state.last_action = Some(ActionKind::SetLoading);
            Ok(Reduced {
                state,
                diff: StackDiff::default(),
                completed_flow: None,
            })
        }

        // ── Guided flows ──────────────────────────────────────────
        NavAction::StartGuidedFlow { flow_route } => {
            let definition = ctx.flows.require(flow_route)?;
            let Some(step) = definition.step(0) else {
                // An empty flow completes the moment it starts.
                let mut reduced = Reduced::unchanged(current, ActionKind::StartGuidedFlow);
                reduced.completed_flow = Some(flow_route.clone());
                return Ok(reduced);
            };

            navigate(
                current,
                &step.route,
                step.params.clone(),
                &NavigateOptions::default(),
                ctx.graph,
                Some(GuidedFlowState {
                    flow_route: flow_route.clone(),
                    step_index: 0,
                }),
                ActionKind::StartGuidedFlow,
            )
        }

        NavAction::NextStep => {
            let Some(active) = &current.active_flow else {
                return Ok(Reduced::unchanged(current, ActionKind::NextStep));
            };
            let definition = ctx.flows.require(&active.flow_route)?;

            let next_index = active.step_index + 1;
            match definition.step(next_index) {
                Some(step) => navigate(
                    current,
                    &step.route,
                    step.params.clone(),
                    &NavigateOptions::default(),
                    ctx.graph,
                    Some(GuidedFlowState {
                        flow_route: active.flow_route.clone(),
                        step_index: next_index,
                    }),
                    ActionKind::NextStep,
                ),
                None => {
                    // Past the final step: deactivate and complete.
                    let flow_route = active.flow_route.clone();
                    let mut reduced = Reduced::unchanged(current, ActionKind::NextStep);
                    reduced.state.active_flow = None;
                    reduced.completed_flow = Some(flow_route);
                    Ok(reduced)
                }
            }
        }

        NavAction::PreviousStep => {
            let Some(active) = &current.active_flow else {
                return Ok(Reduced::unchanged(current, ActionKind::PreviousStep));
            };
            if active.step_index == 0 {
                return Ok(Reduced::unchanged(current, ActionKind::PreviousStep));
            }
            let definition = ctx.flows.require(&active.flow_route)?;

            let prev_index = active.step_index - 1;
            let step = definition
                .step(prev_index)
                .ok_or(NavError::StepIndexOutOfRange {
                    index: prev_index,
                    len: definition.len(),
                })?;
            navigate(
                current,
                &step.route,
                step.params.clone(),
                &NavigateOptions::default(),
                ctx.graph,
                Some(GuidedFlowState {
                    flow_route: active.flow_route.clone(),
                    step_index: prev_index,
                }),
                ActionKind::PreviousStep,
            )
        }

        NavAction::ClearCurrentScreenParams => {
            let mut state = current.clone();
            let replacement = current.current_entry().with_params(Params::new());
            state.stack.swap_current(replacement);
            state.last_action = Some(ActionKind::ClearCurrentScreenParams);
            // Identity preserved: no lifecycle events, empty diff.
            Ok(Reduced {
                state,
                diff: StackDiff::default(),
                completed_flow: None,
            })
        }

        // Reset tears down state outside the pure reducer; the store's
        // coordinator intercepts it before reduction.
        NavAction::Reset => Ok(Reduced::unchanged(current, ActionKind::Reset)),
    }
}

/// Resolve a route and apply the combined clear/popUpTo/push-or-replace
/// transformation as one unit.
fn navigate(
    current: &NavState,
    route: &Route,
    params: Params,
    options: &NavigateOptions,
    graph: &Graph,
    active_flow: Option<GuidedFlowState>,
    kind: ActionKind,
) -> Result<Reduced, NavError> {
    options.validate()?;
    let resolution = graph.resolve(route, params)?;

    let mut stack = current.stack.clone();
    if options.clear_back_stack {
        // Combined with the push below this yields exactly one entry.
        stack.drain_all();
    }
    if let Some(target) = &options.pop_up_to {
        stack.pop_up_to(target, options.inclusive)?;
    }

    let entry = BackStackEntry::from_resolution(resolution);
    if options.replace_with {
        stack.replace(entry);
    } else {
        stack.push(entry);
    }

    let diff = StackDiff::between(&current.stack, &stack);
    Ok(Reduced {
        state: NavState {
            stack,
            active_flow,
            last_action: Some(kind),
            is_loading: current.is_loading,
        },
        diff,
        completed_flow: None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::flow::{FlowStep, GuidedFlowDefinition};
    use crate::graph::Screen;
    use crate::stack::BackStack;

    fn graph() -> Graph {
        Graph::builder("app")
            .start_graph("home")
            .subgraph(
                Graph::builder("home")
                    .start_screen("feed")
                    .screen(Screen::new("feed"))
                    .subgraph(
                        Graph::builder("news")
                            .start_screen("list")
                            .screen(Screen::new("list"))
                            .screen(Screen::new("detail")),
                    ),
            )
            .screen(Screen::new("settings"))
            .screen(Screen::new("welcome"))
            .screen(Screen::new("profile"))
            .build()
            .unwrap()
    }

    fn route(s: &str) -> Route {
        Route::parse(s).unwrap()
    }

    fn initial(graph: &Graph) -> NavState {
        let resolution = graph.resolve_start(Params::new()).unwrap();
        NavState::initial(BackStack::with_initial(BackStackEntry::from_resolution(
            resolution,
        )))
    }

    fn flows() -> FlowRegistry {
        let mut registry = FlowRegistry::new();
        registry.insert(
            route("onboarding"),
            GuidedFlowDefinition::new(vec![
                FlowStep::new(route("welcome")),
                FlowStep::new(route("profile")),
                FlowStep::new(route("settings")),
            ]),
        );
        registry
    }

    fn ctx<'a>(graph: &'a Graph, flows: &'a FlowRegistry) -> ReduceCtx<'a> {
        ReduceCtx { graph, flows }
    }

    #[test]
    fn navigate_pushes_and_enables_back() {
        let g = graph();
        let f = flows();
        let state = initial(&g);

        let reduced = reduce(&state, &NavAction::navigate(route("home")), &ctx(&g, &f)).unwrap();
        let reduced = reduce(
            &reduced.state,
            &NavAction::navigate(route("home/news/list")),
            &ctx(&g, &f),
        )
        .unwrap();

        assert_eq!(reduced.state.depth(), 3);
        assert!(reduced.state.can_go_back());
        assert_eq!(reduced.state.current_entry().route().as_str(), "home/news/list");
    }

    #[test]
    fn clear_plus_navigate_is_one_transaction() {
        let g = graph();
        let f = flows();
        let mut state = initial(&g);
        for r in ["settings", "home/news/list"] {
            state = reduce(&state, &NavAction::navigate(route(r)), &ctx(&g, &f))
                .unwrap()
                .state;
        }
        assert_eq!(state.depth(), 3);

        let reduced = reduce(
            &state,
            &NavAction::navigate_with(route("home"), Params::new(), NavigateOptions::clear()),
            &ctx(&g, &f),
        )
        .unwrap();

        // Exactly one entry: not zero, not two.
        assert_eq!(reduced.state.depth(), 1);
        assert_eq!(reduced.state.current_entry().route().as_str(), "home/feed");
        assert_eq!(reduced.diff.removed.len(), 3);
        assert_eq!(reduced.diff.pushed.len(), 1);
    }

    #[test]
    fn pop_up_to_then_push() {
        let g = graph();
        let f = flows();
        let mut state = initial(&g);
        for r in ["settings", "home/news/list"] {
            state = reduce(&state, &NavAction::navigate(route(r)), &ctx(&g, &f))
                .unwrap()
                .state;
        }

        let reduced = reduce(
            &state,
            &NavAction::navigate_with(
                route("profile"),
                Params::new(),
                NavigateOptions::pop_up_to(route("settings"), false),
            ),
            &ctx(&g, &f),
        )
        .unwrap();

        assert_eq!(reduced.state.depth(), 3);
        assert_eq!(reduced.state.current_entry().route().as_str(), "profile");
        assert_eq!(reduced.diff.removed.len(), 1);
    }

    #[test]
    fn pop_up_to_targets_the_resolved_route() {
        let g = graph();
        let f = flows();
        let mut state = initial(&g);
        // Navigating to the "home" graph expression lands on its start
        // screen, so the entry's route is "home/feed".
        for r in ["home", "settings"] {
            state = reduce(&state, &NavAction::navigate(route(r)), &ctx(&g, &f))
                .unwrap()
                .state;
        }

        let err = reduce(
            &state,
            &NavAction::navigate_with(
                route("profile"),
                Params::new(),
                NavigateOptions::pop_up_to(route("home"), false),
            ),
            &ctx(&g, &f),
        )
        .unwrap_err();
        assert!(matches!(err, NavError::TargetNotFound { .. }));

        let reduced = reduce(
            &state,
            &NavAction::navigate_with(
                route("profile"),
                Params::new(),
                NavigateOptions::pop_up_to(route("home/feed"), false),
            ),
            &ctx(&g, &f),
        )
        .unwrap();
        assert_eq!(reduced.state.current_entry().route().as_str(), "profile");
        assert_eq!(reduced.diff.removed.len(), 1);
    }

    #[test]
    fn pop_up_to_missing_target_rejects_dispatch() {
        let g = graph();
        let f = flows();
        let state = initial(&g);

        let err = reduce(
            &state,
            &NavAction::navigate_with(
                route("profile"),
                Params::new(),
                NavigateOptions::pop_up_to(route("settings"), false),
            ),
            &ctx(&g, &f),
        )
        .unwrap_err();
        assert!(matches!(err, NavError::TargetNotFound { .. }));
    }

    #[test]
    fn replace_preserves_depth() {
        let g = graph();
        let f = flows();
        let state = initial(&g);
        let state = reduce(&state, &NavAction::navigate(route("settings")), &ctx(&g, &f))
            .unwrap()
            .state;

        let reduced = reduce(
            &state,
            &NavAction::navigate_with(route("profile"), Params::new(), NavigateOptions::replace()),
            &ctx(&g, &f),
        )
        .unwrap();

        assert_eq!(reduced.state.depth(), 2);
        assert_eq!(reduced.state.current_entry().route().as_str(), "profile");
        assert_eq!(reduced.diff.removed.len(), 1);
        assert_eq!(reduced.diff.pushed.len(), 1);
    }

    #[test]
    fn conflicting_options_rejected() {
        let g = graph();
        let f = flows();
        let state = initial(&g);
        let options = NavigateOptions {
            clear_back_stack: true,
            replace_with: true,
            ..NavigateOptions::default()
        };

        let err = reduce(
            &state,
            &NavAction::navigate_with(route("settings"), Params::new(), options),
            &ctx(&g, &f),
        )
        .unwrap_err();
        assert!(matches!(err, NavError::InvalidNavigationOptions { .. }));
    }

    #[test]
    fn back_exhaustion_is_noop() {
        let g = graph();
        let f = flows();
        let state = initial(&g);

        let reduced = reduce(&state, &NavAction::Back, &ctx(&g, &f)).unwrap();
        assert_eq!(reduced.state.depth(), 1);
        assert!(reduced.diff.is_empty());
        assert_eq!(reduced.state.last_action(), Some(ActionKind::Back));
    }

    #[test]
    fn start_flow_navigates_to_step_zero() {
        let g = graph();
        let f = flows();
        let state = initial(&g);

        let reduced = reduce(
            &state,
            &NavAction::StartGuidedFlow {
                flow_route: route("onboarding"),
            },
            &ctx(&g, &f),
        )
        .unwrap();

        let active = reduced.state.active_flow().unwrap();
        assert_eq!(active.flow_route.as_str(), "onboarding");
        assert_eq!(active.step_index, 0);
        assert_eq!(reduced.state.current_entry().route().as_str(), "welcome");
    }

    #[test]
    fn next_step_advances_then_completes() {
        let g = graph();
        let f = flows();
        let mut state = initial(&g);
        state = reduce(
            &state,
            &NavAction::StartGuidedFlow {
                flow_route: route("onboarding"),
            },
            &ctx(&g, &f),
        )
        .unwrap()
        .state;

        for expected in ["profile", "settings"] {
            let reduced = reduce(&state, &NavAction::NextStep, &ctx(&g, &f)).unwrap();
            assert!(reduced.completed_flow.is_none());
            assert_eq!(reduced.state.current_entry().route().as_str(), expected);
            state = reduced.state;
        }

        let reduced = reduce(&state, &NavAction::NextStep, &ctx(&g, &f)).unwrap();
        assert!(reduced.state.active_flow().is_none());
        assert_eq!(reduced.completed_flow.unwrap().as_str(), "onboarding");
    }

    #[test]
    fn previous_step_at_zero_is_noop() {
        let g = graph();
        let f = flows();
        let state = initial(&g);
        let state = reduce(
            &state,
            &NavAction::StartGuidedFlow {
                flow_route: route("onboarding"),
            },
            &ctx(&g, &f),
        )
        .unwrap()
        .state;

        let reduced = reduce(&state, &NavAction::PreviousStep, &ctx(&g, &f)).unwrap();
        assert_eq!(reduced.state.active_flow().unwrap().step_index, 0);
        assert!(reduced.diff.is_empty());
    }

    #[test]
    fn next_step_when_inactive_is_noop() {
        let g = graph();
        let f = flows();
        let state = initial(&g);

        let reduced = reduce(&state, &NavAction::NextStep, &ctx(&g, &f)).unwrap();
        assert!(reduced.state.active_flow().is_none());
        assert!(reduced.diff.is_empty());
        assert!(reduced.completed_flow.is_none());
    }

    #[test]
    fn unknown_flow_rejected() {
        let g = graph();
        let f = flows();
        let state = initial(&g);

        let err = reduce(
            &state,
            &NavAction::StartGuidedFlow {
                flow_route: route("missing"),
            },
            &ctx(&g, &f),
        )
        .unwrap_err();
        assert!(matches!(err, NavError::UnknownGuidedFlow { .. }));
    }

    #[test]
    fn clear_params_preserves_identity() {
        let g = graph();
        let f = flows();
        let state = initial(&g);
        let state = reduce(
            &state,
            &NavAction::navigate_with(
                route("settings"),
                Params::builder().set("tab", "privacy").build(),
                NavigateOptions::default(),
            ),
            &ctx(&g, &f),
        )
        .unwrap()
        .state;
        let id = state.current_entry().id();

        let reduced = reduce(&state, &NavAction::ClearCurrentScreenParams, &ctx(&g, &f)).unwrap();
        assert_eq!(reduced.state.current_entry().id(), id);
        assert!(reduced.state.current_entry().params().is_empty());
        assert!(reduced.diff.is_empty());
    }

    #[test]
    fn failed_resolution_leaves_state_unchanged() {
        let g = graph();
        let f = flows();
        let state = initial(&g);
        let depth = state.depth();

        let err = reduce(&state, &NavAction::navigate(route("nowhere")), &ctx(&g, &f));
        assert!(matches!(err, Err(NavError::RouteNotFound { .. })));
        assert_eq!(state.depth(), depth);
    }
}
