// ── Navigation store ──
//
// The store-context object hosts construct once per application
// session. Owns the configured graph, deep links, and flow
// definitions; serializes every dispatch through one mutex so the
// reducer never runs concurrently; broadcasts committed snapshots on a
// replay-latest watch channel. Lifecycle callbacks and flow completion
// run after the state lock is released, so re-entrant work (including
// another dispatch or a reset) can never deadlock against a dispatch
// in progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::action::{ActionKind, NavAction, NavigateOptions};
use crate::deeplink::DeepLinkParser;
use crate::error::NavError;
use crate::flow::{FlowEdit, FlowRegistry, GuidedFlowDefinition, OnComplete};
use crate::graph::{Graph, Resolution};
use crate::lifecycle::{LifecycleManager, LifecycleObserver};
use crate::params::Params;
use crate::reducer::{self, ReduceCtx};
use crate::route::Route;
use crate::stack::{BackStack, BackStackEntry, StackDiff};
use crate::state::NavState;
use crate::stream::StateStream;

/// Renderer collaborator. The core never paints; it only tells the
/// renderer when an authentication-gated destination was entered and
/// when the loading slot toggles.
pub trait RenderSink: Send + Sync {
    fn auth_required(&self, entry: &BackStackEntry) {
        let _ = entry;
    }

    fn set_loading(&self, loading: bool) {
        let _ = loading;
    }
}

/// Trailing navigation directive of a flow edit invocation, evaluated
/// against the already-edited step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirective {
    NextStep,
    PreviousStep,
}

impl FlowDirective {
    fn into_action(self) -> NavAction {
        match self {
            Self::NextStep => NavAction::NextStep,
            Self::PreviousStep => NavAction::PreviousStep,
        }
    }
}

struct StoreState {
    nav: NavState,
    flows: FlowRegistry,
}

struct StoreInner {
    graph: Graph,
    deep_links: DeepLinkParser,
    /// Configuration-time initial resolution, re-materialized on reset.
    initial: Resolution,
    state: Mutex<StoreState>,
    snapshot_tx: watch::Sender<Arc<NavState>>,
    /// Single-writer reset gate. Held (true) from teardown start until
    /// the last removal callback has fired.
    resetting: AtomicBool,
    lifecycle: LifecycleManager,
    render: Option<Arc<dyn RenderSink>>,
}

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc`; all clones dispatch into the same
/// serialized state.
#[derive(Clone)]
pub struct NavStore {
    inner: Arc<StoreInner>,
}

impl NavStore {
    pub fn builder(graph: Graph) -> NavStoreBuilder {
        NavStoreBuilder::new(graph)
    }

    pub fn graph(&self) -> &Graph {
        &self.inner.graph
    }

    /// Latest committed snapshot.
    pub fn state(&self) -> Arc<NavState> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Subscribe to the replay-latest snapshot stream.
    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.inner.snapshot_tx.subscribe())
    }

    /// Snapshot of a registered flow definition, if any.
    pub async fn flow_definition(&self, flow_route: &Route) -> Option<GuidedFlowDefinition> {
        self.inner.state.lock().await.flows.get(flow_route).cloned()
    }

    // ── Dispatch ─────────────────────────────────────────────────

    /// Apply one action.
    ///
    /// Concurrent callers are serialized: the reducer runs one action
    /// at a time in lock-acquisition order, and subscribers only ever
    /// observe complete before/after snapshots. A rejected action
    /// leaves state untouched and publishes nothing.
    pub async fn dispatch(&self, action: NavAction) -> Result<(), NavError> {
        if matches!(action, NavAction::Reset) {
            self.reset().await;
            return Ok(());
        }

        let (diff, completion) = {
            let mut store = self.inner.state.lock().await;
            let reduced = match reducer::reduce(
                &store.nav,
                &action,
                &ReduceCtx {
                    graph: &self.inner.graph,
                    flows: &store.flows,
                },
            ) {
                Ok(reduced) => reduced,
                Err(e) => {
                    warn!(action = %action.kind(), error = %e, "dispatch rejected");
                    return Err(e);
                }
            };

            let completion = completion_of(&store.flows, reduced.completed_flow.as_ref());
            store.nav = reduced.state;
            self.publish(&store.nav);
            debug!(
                action = %action.kind(),
                depth = store.nav.depth(),
                removed = reduced.diff.removed.len(),
                pushed = reduced.diff.pushed.len(),
                "dispatch committed"
            );
            (reduced.diff, completion)
        };

        self.after_commit(&diff, completion, Some(&action));
        Ok(())
    }

    /// Match a deep link and navigate to it. `params` are merged over
    /// the values extracted from the URI (caller wins).
    pub async fn open_deep_link(
        &self,
        uri: &str,
        params: Params,
        options: NavigateOptions,
    ) -> Result<(), NavError> {
        let matched = self.inner.deep_links.parse(uri)?;
        let merged = params.merged_over(&matched.params);
        self.dispatch(NavAction::navigate_with(matched.route, merged, options))
            .await
    }

    // ── Guided flow edits ────────────────────────────────────────

    /// Apply an edit batch to a flow definition, then optionally a
    /// trailing step directive, as one transaction.
    ///
    /// The directive observes the already-edited step list, and
    /// subscribers see a single snapshot for the whole invocation. On
    /// any failure the definition, cursor, and stack are all left as
    /// they were.
    pub async fn edit_flow(
        &self,
        flow_route: &Route,
        edits: Vec<FlowEdit>,
        then: Option<FlowDirective>,
    ) -> Result<(), NavError> {
        use crate::flow::CursorAfterEdit;

        let (diff, completion) = {
            let mut store = self.inner.state.lock().await;

            // Backup for rollback if the trailing directive fails.
            let saved_definition = store.flows.require(flow_route)?.clone();
            let saved_flow = store.nav.active_flow.clone();

            let cursor = store
                .nav
                .active_flow
                .as_ref()
                .filter(|active| &active.flow_route == flow_route)
                .map(|active| active.step_index);

            let outcome = store.flows.apply_edits(flow_route, edits, cursor)?;
            match outcome {
                CursorAfterEdit::Inactive => {}
                CursorAfterEdit::Active(index) => {
                    if let Some(active) = &mut store.nav.active_flow {
                        active.step_index = index;
                    }
                }
                CursorAfterEdit::Emptied => {
                    debug!(flow = %flow_route, "flow emptied by edit; deactivating");
                    store.nav.active_flow = None;
                }
            }

            let mut diff = StackDiff::default();
            let mut completion = None;
            if let Some(directive) = then {
                let action = directive.into_action();
                let reduced = match reducer::reduce(
                    &store.nav,
                    &action,
                    &ReduceCtx {
                        graph: &self.inner.graph,
                        flows: &store.flows,
                    },
                ) {
                    Ok(reduced) => reduced,
                    Err(e) => {
                        store.flows.insert(flow_route.clone(), saved_definition);
                        store.nav.active_flow = saved_flow;
                        warn!(flow = %flow_route, error = %e, "flow edit rolled back");
                        return Err(e);
                    }
                };
                completion = completion_of(&store.flows, reduced.completed_flow.as_ref());
                diff = reduced.diff;
                store.nav = reduced.state;
            }

            self.publish(&store.nav);
            debug!(flow = %flow_route, directive = ?then, "flow edit committed");
            (diff, completion)
        };

        self.after_commit(&diff, completion, None);
        Ok(())
    }

    // ── Reset coordination ───────────────────────────────────────

    /// Restore the configuration-time initial state.
    ///
    /// Tears down every current entry (firing removals), rebuilds the
    /// initial stack, and fires creation for the initial entry. Returns
    /// `true` if this call performed the reset; `false` when a
    /// concurrent or re-entrant call already holds the gate -- exactly
    /// one of any N overlapping calls executes the teardown.
    pub async fn reset(&self) -> bool {
        let gate = self
            .inner
            .resetting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
        if gate.is_err() {
            debug!("reset skipped: another reset in progress");
            return false;
        }

        let diff = {
            let mut store = self.inner.state.lock().await;
            let before = store.nav.back_stack().clone();

            let entry = BackStackEntry::from_resolution(self.inner.initial.clone());
            store.nav = NavState {
                stack: BackStack::with_initial(entry),
                active_flow: None,
                last_action: Some(ActionKind::Reset),
                is_loading: false,
            };
            let diff = StackDiff::between(&before, store.nav.back_stack());
            self.publish(&store.nav);
            diff
        };

        info!(removed = diff.removed.len(), "navigation state reset");
        // Callbacks run outside the state lock; a reset requested from
        // inside one sees the gate still held and returns false.
        self.inner.lifecycle.notify(&diff);
        self.inner.resetting.store(false, Ordering::Release);
        true
    }

    // ── Internals ────────────────────────────────────────────────

    fn publish(&self, nav: &NavState) {
        let _ = self.inner.snapshot_tx.send(Arc::new(nav.clone()));
    }

    /// Post-commit side effects, in order: lifecycle notifications from
    /// the dispatch-level diff, renderer signals, flow completion.
    fn after_commit(&self, diff: &StackDiff, completion: Option<OnComplete>, action: Option<&NavAction>) {
        self.inner.lifecycle.notify(diff);

        if let Some(render) = &self.inner.render {
            for entry in &diff.pushed {
                if entry.destination().requires_auth() {
                    render.auth_required(entry);
                }
            }
            if let Some(NavAction::SetLoading(loading)) = action {
                render.set_loading(*loading);
            }
        }

        if let Some(callback) = completion {
            callback();
        }
    }
}

fn completion_of(flows: &FlowRegistry, completed: Option<&Route>) -> Option<OnComplete> {
    completed
        .and_then(|route| flows.get(route))
        .and_then(GuidedFlowDefinition::completion)
}

// ── Builder ───────────────────────────────────────────────────────

/// Configures and constructs a [`NavStore`].
pub struct NavStoreBuilder {
    graph: Graph,
    deep_links: DeepLinkParser,
    flows: FlowRegistry,
    initial_route: Option<Route>,
    initial_params: Params,
    observer: Option<Arc<dyn LifecycleObserver>>,
    render: Option<Arc<dyn RenderSink>>,
}

impl NavStoreBuilder {
    fn new(graph: Graph) -> Self {
        Self {
            graph,
            deep_links: DeepLinkParser::new(),
            flows: FlowRegistry::new(),
            initial_route: None,
            initial_params: Params::new(),
            observer: None,
            render: None,
        }
    }

    /// Initial route of the session. Defaults to the graph's start
    /// chain.
    pub fn initial_route(mut self, route: Route) -> Self {
        self.initial_route = Some(route);
        self
    }

    pub fn initial_params(mut self, params: Params) -> Self {
        self.initial_params = params;
        self
    }

    /// Register a guided flow definition.
    pub fn flow(mut self, flow_route: Route, definition: GuidedFlowDefinition) -> Self {
        self.flows.insert(flow_route, definition);
        self
    }

    /// Register a deep-link route template.
    pub fn deep_link(mut self, template: impl AsRef<str>) -> Result<Self, NavError> {
        self.deep_links.register(template)?;
        Ok(self)
    }

    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn render_sink(mut self, render: Arc<dyn RenderSink>) -> Self {
        self.render = Some(render);
        self
    }

    /// Resolve the initial route and bring the store up with its
    /// one-entry stack, firing creation for the initial entry.
    pub fn build(self) -> Result<NavStore, NavError> {
        let initial = match &self.initial_route {
            Some(route) => self.graph.resolve(route, self.initial_params.clone())?,
            None => self.graph.resolve_start(self.initial_params.clone())?,
        };

        let entry = BackStackEntry::from_resolution(initial.clone());
        let nav = NavState::initial(BackStack::with_initial(entry));
        let (snapshot_tx, _) = watch::channel(Arc::new(nav.clone()));

        let lifecycle = LifecycleManager::new(self.observer);
        let diff = StackDiff {
            removed: Vec::new(),
            pushed: nav.back_stack().entries().to_vec(),
        };

        let store = NavStore {
            inner: Arc::new(StoreInner {
                graph: self.graph,
                deep_links: self.deep_links,
                initial,
                state: Mutex::new(StoreState {
                    nav,
                    flows: self.flows,
                }),
                snapshot_tx,
                resetting: AtomicBool::new(false),
                lifecycle,
                render: self.render,
            }),
        };

        store.inner.lifecycle.notify(&diff);
        info!(route = %store.state().current_entry().route(), "navigation store initialized");
        Ok(store)
    }
}
