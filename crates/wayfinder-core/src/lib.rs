// wayfinder-core: navigation state engine -- route graphs, back stack,
// deep links, guided flows -- behind a serialized action dispatch.

pub mod action;
pub mod deeplink;
pub mod error;
pub mod flow;
pub mod graph;
pub mod lifecycle;
pub mod params;
pub mod route;
pub mod stack;
pub mod state;
pub mod store;
pub mod stream;

mod reducer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{ActionKind, NavAction, NavigateOptions};
pub use deeplink::{DeepLinkMatch, DeepLinkParser};
pub use error::NavError;
pub use flow::{FlowEdit, FlowRegistry, FlowStep, GuidedFlowDefinition, OnComplete};
pub use graph::{
    Destination, DestinationHooks, Graph, GraphBuilder, GraphId, Resolution, Screen, StartTarget,
    Transition, TransitionSpec,
};
pub use lifecycle::{LifecycleHandle, LifecycleObserver};
pub use params::{ParamValue, Params, ParamsBuilder};
pub use route::Route;
pub use stack::{BackStack, BackStackEntry, EntryId, StackDiff};
pub use state::{GuidedFlowState, NavState};
pub use store::{FlowDirective, NavStore, NavStoreBuilder, RenderSink};
pub use stream::{StateStream, StateWatchStream};
