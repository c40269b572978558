// ── Route resolution ──
//
// Resolves a route expression against the configured graph hierarchy.
// Pure and deterministic: the same (graph, route) pair always resolves
// to the same destination.

use std::sync::Arc;

use crate::error::NavError;
use crate::params::Params;
use crate::route::Route;

use super::{Destination, Graph, GraphId, StartTarget};

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub destination: Arc<dyn Destination>,
    pub graph_id: GraphId,
    pub params: Params,
}

impl Graph {
    /// Resolve a route expression against this graph.
    ///
    /// Resolution order per scope: exact screen match, then recursion
    /// into a matching sub-graph, then -- when the expression names a
    /// graph -- the graph's declared start chain down to a concrete
    /// screen.
    pub fn resolve(&self, route: &Route, params: Params) -> Result<Resolution, NavError> {
        if route.is_template() {
            return Err(NavError::malformed(
                route.as_str(),
                "placeholders cannot be resolved directly; match a deep link first",
            ));
        }

        let segments: Vec<&str> = route.segments().collect();
        let (destination, owner) = self
            .walk(&segments)
            .ok_or_else(|| NavError::RouteNotFound {
                route: route.as_str().to_owned(),
            })?;

        Ok(Resolution {
            destination: Arc::clone(destination),
            graph_id: owner.id().clone(),
            params,
        })
    }

    /// Resolve this graph's start chain to its concrete start screen.
    pub fn resolve_start(&self, params: Params) -> Result<Resolution, NavError> {
        let (destination, owner) = self.follow_start_chain();
        Ok(Resolution {
            destination: Arc::clone(destination),
            graph_id: owner.id().clone(),
            params,
        })
    }

    fn walk(&self, segments: &[&str]) -> Option<(&Arc<dyn Destination>, &Graph)> {
        match segments {
            [] => None,
            [last] => {
                if let Some(screen) = self.screen(last) {
                    return Some((screen, self));
                }
                // A bare graph name resolves through its start chain.
                self.subgraph(last).map(Graph::follow_start_chain)
            }
            [head, rest @ ..] => self.subgraph(head)?.walk(rest),
        }
    }

    /// Follow start targets down to a concrete screen.
    ///
    /// Sub-graphs are owned by value (strict tree), so this descent
    /// always terminates; start targets were validated at build time.
    fn follow_start_chain(&self) -> (&Arc<dyn Destination>, &Graph) {
        let mut graph = self;
        loop {
            match graph.start() {
                StartTarget::Screen(name) => {
                    let Some(screen) = graph.screen(name) else {
                        unreachable!("start screen validated at build time")
                    };
                    return (screen, graph);
                }
                StartTarget::Graph(name) => {
                    let Some(sub) = graph.subgraph(name) else {
                        unreachable!("start graph validated at build time")
                    };
                    graph = sub;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::Screen;
    use super::*;

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
            .build()
            .unwrap()
    }

    fn route(s: &str) -> Route {
        Route::parse(s).unwrap()
    }

    #[test]
    fn exact_screen_match_in_scope() {
        let g = graph();
        let res = g.resolve(&route("settings"), Params::new()).unwrap();
        assert_eq!(res.destination.route(), "settings");
        assert!(res.graph_id.is_root());
    }

    #[test]
    fn recurses_into_nested_subgraphs() {
        let g = graph();
        let res = g.resolve(&route("home/news/detail"), Params::new()).unwrap();
        assert_eq!(res.destination.route(), "detail");
        assert_eq!(res.graph_id.as_str(), "home/news");
    }

    #[test]
    fn bare_graph_name_follows_start_chain() {
        let g = graph();

        // "home" names a graph whose start is the "feed" screen.
        let res = g.resolve(&route("home"), Params::new()).unwrap();
        assert_eq!(res.destination.route(), "feed");
        assert_eq!(res.graph_id.as_str(), "home");

        // A nested graph reference also chases its start.
        let res = g.resolve(&route("home/news"), Params::new()).unwrap();
        assert_eq!(res.destination.route(), "list");
        assert_eq!(res.graph_id.as_str(), "home/news");
    }

    #[test]
    fn start_chain_through_multiple_graphs() {
        let g = graph();
        // Root start -> graph "home" -> screen "feed".
        let res = g.resolve_start(Params::new()).unwrap();
        assert_eq!(res.destination.route(), "feed");
        assert_eq!(res.graph_id.as_str(), "home");
    }

    #[test]
    fn unknown_route_fails() {
        let g = graph();
        let err = g.resolve(&route("home/sports"), Params::new()).unwrap_err();
        assert!(matches!(err, NavError::RouteNotFound { .. }));
    }

    #[test]
    fn template_route_rejected() {
        let g = graph();
        let err = g
            .resolve(&route("home/news/{id}"), Params::new())
            .unwrap_err();
        assert!(matches!(err, NavError::MalformedRoute { .. }));
    }

    #[test]
    fn resolution_is_deterministic() {
        let g = graph();
        let a = g.resolve(&route("home/news"), Params::new()).unwrap();
        let b = g.resolve(&route("home/news"), Params::new()).unwrap();
        assert_eq!(a.destination.route(), b.destination.route());
        assert_eq!(a.graph_id, b.graph_id);
    }

    #[test]
    fn caller_params_carried_through() {
        let g = graph();
        let params = Params::builder().set("tab", "latest").build();
        let res = g.resolve(&route("home/news/list"), params).unwrap();
        assert_eq!(res.params.get_str("tab"), Some("latest"));
    }
}
