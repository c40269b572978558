// ── Navigation graph model ──
//
// Destinations and the hierarchical graph that contains them. Graphs
// are assembled once through `GraphBuilder` at configuration time and
// are immutable afterwards -- all runtime resolution is read-only.

mod resolver;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::params::Params;

pub use resolver::Resolution;

// ── Destination capability interface ──────────────────────────────

/// Transition descriptor. Data only -- playback belongs to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    #[default]
    None,
    Fade,
    SlideHorizontal,
    SlideVertical,
    Custom(String),
}

/// Enter/exit transition pair for a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub enter: Transition,
    pub exit: Transition,
}

/// Optional per-destination lifecycle hooks, invoked when an entry for
/// this destination enters or permanently leaves the back stack.
pub trait DestinationHooks: Send + Sync {
    fn on_enter(&self, params: &Params) {
        let _ = params;
    }

    fn on_exit(&self, params: &Params) {
        let _ = params;
    }
}

/// Capability interface every destination exposes to the core.
///
/// Destinations are built once at configuration time and shared as
/// `Arc<dyn Destination>`; the core never mutates them.
pub trait Destination: Send + Sync {
    /// Local route segment of this destination within its owning graph.
    fn route(&self) -> &str;

    fn requires_auth(&self) -> bool {
        false
    }

    fn transitions(&self) -> TransitionSpec {
        TransitionSpec::default()
    }

    /// Lazily produced display title.
    fn title(&self) -> String {
        self.route().to_owned()
    }

    fn hooks(&self) -> Option<&dyn DestinationHooks> {
        None
    }
}

impl fmt::Debug for dyn Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("route", &self.route())
            .field("requires_auth", &self.requires_auth())
            .finish()
    }
}

type TitleFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Standard screen destination.
///
/// Covers the common case; hosts with richer needs implement
/// [`Destination`] directly.
#[derive(Clone)]
pub struct Screen {
    name: String,
    requires_auth: bool,
    transitions: TransitionSpec,
    title: Option<TitleFn>,
    hooks: Option<Arc<dyn DestinationHooks>>,
}

impl Screen {
    /// A screen addressed by a single route segment within its graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires_auth: false,
            transitions: TransitionSpec::default(),
            title: None,
            hooks: None,
        }
    }

    pub fn with_auth(mut self, required: bool) -> Self {
        self.requires_auth = required;
        self
    }

    pub fn with_transitions(mut self, spec: TransitionSpec) -> Self {
        self.transitions = spec;
        self
    }

    /// Lazy title producer, evaluated on each [`Destination::title`] call.
    pub fn title_with(mut self, f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.title = Some(Arc::new(f));
        self
    }

    pub fn with_hooks(mut self, hooks: impl DestinationHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }
}

impl Destination for Screen {
    fn route(&self) -> &str {
        &self.name
    }

    fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    fn transitions(&self) -> TransitionSpec {
        self.transitions.clone()
    }

    fn title(&self) -> String {
        match &self.title {
            Some(f) => f(),
            None => self.name.clone(),
        }
    }

    fn hooks(&self) -> Option<&dyn DestinationHooks> {
        self.hooks.as_deref()
    }
}

// ── Graph identity ────────────────────────────────────────────────

/// Identity of a graph scope: the `/`-joined path of sub-graph names
/// from the root. The root scope itself is the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(Arc<str>);

impl GraphId {
    pub(crate) fn root() -> Self {
        Self(Arc::from(""))
    }

    pub(crate) fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(Arc::from(name))
        } else {
            Self(Arc::from(format!("{}/{name}", self.0)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// ── Graph ─────────────────────────────────────────────────────────

/// Start destination of a graph: a direct child screen or sub-graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTarget {
    Screen(String),
    Graph(String),
}

/// Named container of screens and sub-graphs with a start destination.
///
/// Immutable after [`GraphBuilder::build`]; sub-graphs are owned by
/// value, so the hierarchy is a strict tree and start chains always
/// terminate.
pub struct Graph {
    name: String,
    id: GraphId,
    start: StartTarget,
    screens: IndexMap<String, Arc<dyn Destination>>,
    subgraphs: IndexMap<String, Graph>,
}

impl Graph {
    pub fn builder(name: impl Into<String>) -> GraphBuilder {
        GraphBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &GraphId {
        &self.id
    }

    pub fn start(&self) -> &StartTarget {
        &self.start
    }

    pub(crate) fn screen(&self, name: &str) -> Option<&Arc<dyn Destination>> {
        self.screens.get(name)
    }

    pub(crate) fn subgraph(&self, name: &str) -> Option<&Graph> {
        self.subgraphs.get(name)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("start", &self.start)
            .field("screens", &self.screens.keys().collect::<Vec<_>>())
            .field("subgraphs", &self.subgraphs.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ── Builder ───────────────────────────────────────────────────────

/// Assembles an immutable [`Graph`].
///
/// Validation happens in [`build`](Self::build): screen names must be
/// single brace-free segments, sibling routes must be unique, and the
/// declared start target must exist.
pub struct GraphBuilder {
    name: String,
    start: Option<StartTarget>,
    screens: Vec<Arc<dyn Destination>>,
    subgraphs: Vec<GraphBuilder>,
}

impl GraphBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            screens: Vec::new(),
            subgraphs: Vec::new(),
        }
    }

    /// Declare the start screen (by local segment name).
    pub fn start_screen(mut self, name: impl Into<String>) -> Self {
        self.start = Some(StartTarget::Screen(name.into()));
        self
    }

    /// Declare the start sub-graph (by local name).
    pub fn start_graph(mut self, name: impl Into<String>) -> Self {
        self.start = Some(StartTarget::Graph(name.into()));
        self
    }

    pub fn screen(mut self, screen: Screen) -> Self {
        self.screens.push(Arc::new(screen));
        self
    }

    pub fn destination(mut self, destination: Arc<dyn Destination>) -> Self {
        self.screens.push(destination);
        self
    }

    pub fn subgraph(mut self, graph: GraphBuilder) -> Self {
        self.subgraphs.push(graph);
        self
    }

    /// Validate and freeze the graph hierarchy.
    pub fn build(self) -> Result<Graph, NavError> {
        self.build_scoped(&GraphId::root())
    }

    fn build_scoped(self, scope: &GraphId) -> Result<Graph, NavError> {
        let name = self.name;
        validate_segment(&name)?;
        let id = scope.clone();

        let mut screens: IndexMap<String, Arc<dyn Destination>> = IndexMap::new();
        for destination in self.screens {
            let segment = destination.route().to_owned();
            validate_segment(&segment)?;
            if screens.contains_key(&segment) {
                return Err(NavError::AmbiguousRoute {
                    route: segment,
                    graph: name,
                });
            }
            screens.insert(segment, destination);
        }

        let mut subgraphs: IndexMap<String, Graph> = IndexMap::new();
        for sub in self.subgraphs {
            let sub_name = sub.name.clone();
            if screens.contains_key(&sub_name) || subgraphs.contains_key(&sub_name) {
                return Err(NavError::AmbiguousRoute {
                    route: sub_name,
                    graph: name,
                });
            }
            let child_id = id.child(&sub_name);
            subgraphs.insert(sub_name, sub.build_scoped(&child_id)?);
        }

        let start = self.start.ok_or_else(|| NavError::RouteNotFound {
            route: format!("{name}: no start destination declared"),
        })?;
        match &start {
            StartTarget::Screen(s) if !screens.contains_key(s) => {
                return Err(NavError::RouteNotFound { route: s.clone() });
            }
            StartTarget::Graph(g) if !subgraphs.contains_key(g) => {
                return Err(NavError::RouteNotFound { route: g.clone() });
            }
            _ => {}
        }

        Ok(Graph {
            name,
            id,
            start,
            screens,
            subgraphs,
        })
    }
}

/// Screen and graph names are single literal segments.
fn validate_segment(name: &str) -> Result<(), NavError> {
    if name.is_empty() {
        return Err(NavError::malformed(name, "empty name"));
    }
    if name.contains('/') {
        return Err(NavError::malformed(name, "names are single segments"));
    }
    if name.contains('{') || name.contains('}') {
        return Err(NavError::malformed(
            name,
            "placeholders are only valid in deep-link templates",
        ));
    }
    Ok(())
}
