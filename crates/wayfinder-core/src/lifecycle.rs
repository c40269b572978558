// ── Entry lifecycle notification ──
//
// Every back-stack entry carries a LifecycleHandle. Creation fires
// exactly once, the first time the entry is pushed; removal fires
// exactly once, when the entry permanently leaves the stack --
// regardless of which structural operation removed it or how many
// primitives that dispatch composed. Callbacks registered after
// removal fire immediately so no notification is ever missed.

use std::sync::Arc;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::stack::{BackStackEntry, StackDiff};

type RemovalCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct HandleState {
    callbacks: Vec<RemovalCallback>,
    created: bool,
    removed: bool,
}

/// Per-entry lifecycle handle. Cheap to clone; all clones observe the
/// same entry.
#[derive(Clone)]
pub struct LifecycleHandle {
    state: Arc<Mutex<HandleState>>,
    scope: CancellationToken,
}

impl LifecycleHandle {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HandleState::default())),
            scope: CancellationToken::new(),
        }
    }

    /// Register a callback to fire when the entry leaves the stack.
    ///
    /// At most one firing per callback. If the entry was already
    /// removed, the callback fires immediately on this call.
    pub fn on_removal(&self, callback: impl FnOnce() + Send + 'static) {
        let already_removed = {
            let mut state = self.lock();
            if state.removed {
                true
            } else {
                state.callbacks.push(Box::new(callback));
                return;
            }
        };
        if already_removed {
            callback();
        }
    }

    /// Cancellation scope for asynchronous work owned by this entry.
    ///
    /// Cancelled as part of the removal transaction; spawn entry-scoped
    /// tasks against this token.
    pub fn scope(&self) -> CancellationToken {
        self.scope.clone()
    }

    pub fn is_removed(&self) -> bool {
        self.lock().removed
    }

    /// First call returns `true`; creation fires once per entry.
    pub(crate) fn mark_created(&self) -> bool {
        let mut state = self.lock();
        if state.created {
            false
        } else {
            state.created = true;
            true
        }
    }

    /// Transition to removed, cancelling the entry scope and returning
    /// the callbacks to fire. `None` when removal already fired.
    pub(crate) fn take_removal(&self) -> Option<Vec<RemovalCallback>> {
        let callbacks = {
            let mut state = self.lock();
            if state.removed {
                return None;
            }
            state.removed = true;
            std::mem::take(&mut state.callbacks)
        };
        self.scope.cancel();
        Some(callbacks)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HandleState> {
        // Callbacks never run under this lock, so a poisoned state
        // still holds its invariants.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for LifecycleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("LifecycleHandle")
            .field("created", &state.created)
            .field("removed", &state.removed)
            .field("pending_callbacks", &state.callbacks.len())
            .finish()
    }
}

/// Host-side observer of entry creation/removal, registered on the
/// store at configuration time.
///
/// Notifications for a single dispatch arrive in order (creations,
/// then removals), but they fire after the state lock is released, so
/// two concurrent dispatches may interleave their notifications. Each
/// entry still fires creation at most once and removal at most once;
/// observers needing a strict cross-dispatch order should sequence on
/// the snapshot stream instead.
pub trait LifecycleObserver: Send + Sync {
    fn entry_created(&self, entry: &BackStackEntry) {
        let _ = entry;
    }

    fn entry_removed(&self, entry: &BackStackEntry) {
        let _ = entry;
    }
}

/// Fires lifecycle notifications from a dispatch's diff.
///
/// The diff is snapshotted before any callback runs, so re-entrant
/// dispatches from inside a callback cannot corrupt it.
pub(crate) struct LifecycleManager {
    observer: Option<Arc<dyn LifecycleObserver>>,
}

impl LifecycleManager {
    pub(crate) fn new(observer: Option<Arc<dyn LifecycleObserver>>) -> Self {
        Self { observer }
    }

    /// Fire creation for every newly pushed entry and removal for every
    /// departed entry, exactly once each.
    pub(crate) fn notify(&self, diff: &StackDiff) {
        for entry in &diff.pushed {
            if entry.lifecycle().mark_created() {
                debug!(entry = %entry.id(), route = %entry.route(), "entry created");
                if let Some(hooks) = entry.destination().hooks() {
                    hooks.on_enter(entry.params());
                }
                if let Some(observer) = &self.observer {
                    observer.entry_created(entry);
                }
            }
        }

        for entry in &diff.removed {
            let Some(callbacks) = entry.lifecycle().take_removal() else {
                continue;
            };
            debug!(entry = %entry.id(), route = %entry.route(), "entry removed");
            if let Some(hooks) = entry.destination().hooks() {
                hooks.on_exit(entry.params());
            }
            for callback in callbacks {
                callback();
            }
            if let Some(observer) = &self.observer {
                observer.entry_removed(entry);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn removal_fires_once() {
        let handle = LifecycleHandle::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        handle.on_removal(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for callback in handle.take_removal().unwrap() {
            callback();
        }
        assert!(handle.take_removal().is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registration_after_removal_fires_immediately() {
        let handle = LifecycleHandle::new();
        assert!(handle.take_removal().unwrap().is_empty());

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        handle.on_removal(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn creation_marked_once() {
        let handle = LifecycleHandle::new();
        assert!(handle.mark_created());
        assert!(!handle.mark_created());
    }

    #[test]
    fn scope_cancelled_as_part_of_removal() {
        let handle = LifecycleHandle::new();
        let scope = handle.scope();
        assert!(!scope.is_cancelled());

        handle.take_removal();
        assert!(scope.is_cancelled());
    }
}
