// ── Back stack ──
//
// Ordered visitation history, oldest first. Primitives mutate a
// working copy inside a single dispatch; a dispatch-level StackDiff is
// computed once against the pre-dispatch snapshot, so composite
// operations (e.g. clear + push) report one coherent diff.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NavError;
use crate::graph::{Destination, GraphId, Resolution};
use crate::lifecycle::LifecycleHandle;
use crate::params::Params;
use crate::route::Route;

// ── Entry identity ────────────────────────────────────────────────

/// Unique instance id of a back-stack entry.
///
/// Every push mints a fresh id, even for a route that was just
/// removed: lifecycle exactly-once is per identity, not per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Entry ─────────────────────────────────────────────────────────

/// One element of the back stack. Exclusively owned by the stack that
/// holds it; hosts only ever see shared references.
pub struct BackStackEntry {
    id: EntryId,
    destination: Arc<dyn Destination>,
    graph_id: GraphId,
    params: Params,
    lifecycle: LifecycleHandle,
}

impl BackStackEntry {
    pub(crate) fn from_resolution(resolution: Resolution) -> Arc<Self> {
        Arc::new(Self {
            id: EntryId::fresh(),
            destination: resolution.destination,
            graph_id: resolution.graph_id,
            params: resolution.params,
            lifecycle: LifecycleHandle::new(),
        })
    }

    /// Same identity and lifecycle, params replaced wholesale.
    pub(crate) fn with_params(&self, params: Params) -> Arc<Self> {
        Arc::new(Self {
            id: self.id,
            destination: Arc::clone(&self.destination),
            graph_id: self.graph_id.clone(),
            params,
            lifecycle: self.lifecycle.clone(),
        })
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn destination(&self) -> &Arc<dyn Destination> {
        &self.destination
    }

    pub fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn lifecycle(&self) -> &LifecycleHandle {
        &self.lifecycle
    }

    /// Full route of this entry: owning-graph path plus the
    /// destination's local segment.
    pub fn route(&self) -> Route {
        let full = if self.graph_id.is_root() {
            self.destination.route().to_owned()
        } else {
            format!("{}/{}", self.graph_id.as_str(), self.destination.route())
        };
        // Both components were validated at configuration time.
        let Ok(route) = Route::parse(&full) else {
            unreachable!("entry route built from validated segments")
        };
        route
    }
}

impl fmt::Debug for BackStackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackStackEntry")
            .field("id", &self.id)
            .field("route", &self.route())
            .field("params", &self.params)
            .finish()
    }
}

// ── Stack ─────────────────────────────────────────────────────────

/// Ordered back stack, oldest first. The committed stack of a
/// published state is never empty; a working copy may pass through an
/// empty interim inside a composite dispatch (clear before push).
#[derive(Clone, Default)]
pub struct BackStack {
    entries: Vec<Arc<BackStackEntry>>,
}

impl BackStack {
    pub(crate) fn with_initial(entry: Arc<BackStackEntry>) -> Self {
        Self {
            entries: vec![entry],
        }
    }

    pub fn entries(&self) -> &[Arc<BackStackEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> Option<&Arc<BackStackEntry>> {
        self.entries.last()
    }

    /// Append an entry.
    pub(crate) fn push(&mut self, entry: Arc<BackStackEntry>) {
        self.entries.push(entry);
    }

    /// Remove the top entry when more than one remains.
    ///
    /// Exhaustion (size 1) is a normal terminal state, not an error:
    /// the removed set is simply empty.
    pub(crate) fn pop(&mut self) -> Vec<Arc<BackStackEntry>> {
        if self.entries.len() <= 1 {
            return Vec::new();
        }
        match self.entries.pop() {
            Some(top) => vec![top],
            None => Vec::new(),
        }
    }

    /// Trim entries from the top until `route` is found; `inclusive`
    /// removes the matching entry as well.
    pub(crate) fn pop_up_to(
        &mut self,
        route: &Route,
        inclusive: bool,
    ) -> Result<Vec<Arc<BackStackEntry>>, NavError> {
        let position = self
            .entries
            .iter()
            .rposition(|entry| &entry.route() == route)
            .ok_or_else(|| NavError::TargetNotFound {
                route: route.as_str().to_owned(),
            })?;

        let keep = if inclusive { position } else { position + 1 };
        let mut removed: Vec<Arc<BackStackEntry>> = self.entries.split_off(keep);
        removed.reverse(); // top-down removal order
        Ok(removed)
    }

    /// Remove every entry, including the current one. Only used while
    /// a dispatch immediately repopulates the stack (reset, clear+push).
    pub(crate) fn drain_all(&mut self) -> Vec<Arc<BackStackEntry>> {
        let mut removed = std::mem::take(&mut self.entries);
        removed.reverse();
        removed
    }

    /// Swap the top entry; stack size is unchanged.
    pub(crate) fn replace(&mut self, entry: Arc<BackStackEntry>) -> Vec<Arc<BackStackEntry>> {
        match self.entries.pop() {
            Some(old) => {
                self.entries.push(entry);
                vec![old]
            }
            None => {
                self.entries.push(entry);
                Vec::new()
            }
        }
    }

    /// Swap the top entry in place without changing identity (params
    /// update on the current entry).
    pub(crate) fn swap_current(&mut self, entry: Arc<BackStackEntry>) {
        if let Some(top) = self.entries.last_mut() {
            *top = entry;
        }
    }
}

impl fmt::Debug for BackStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.route()))
            .finish()
    }
}

// ── Diff ──────────────────────────────────────────────────────────

/// Identity-based difference between two stacks, computed once per
/// dispatch however many primitives the dispatch composed.
#[derive(Debug, Default)]
pub struct StackDiff {
    /// Entries that left the stack, top-down.
    pub removed: Vec<Arc<BackStackEntry>>,
    /// Entries that joined the stack, bottom-up.
    pub pushed: Vec<Arc<BackStackEntry>>,
}

impl StackDiff {
    pub fn between(before: &BackStack, after: &BackStack) -> Self {
        let before_ids: HashSet<EntryId> = before.entries.iter().map(|e| e.id).collect();
        let after_ids: HashSet<EntryId> = after.entries.iter().map(|e| e.id).collect();

        let mut removed: Vec<Arc<BackStackEntry>> = before
            .entries
            .iter()
            .filter(|e| !after_ids.contains(&e.id))
            .cloned()
            .collect();
        removed.reverse();

        let pushed: Vec<Arc<BackStackEntry>> = after
            .entries
            .iter()
            .filter(|e| !before_ids.contains(&e.id))
            .cloned()
            .collect();

        Self { removed, pushed }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.pushed.is_empty()
    }
}
