//! The observable unit every reactive value is built on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::tracking;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_node_id() -> u64 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Something that depends on atoms: a computed value or a reaction.
pub(crate) trait Derivation: Send + Sync {
    fn on_dependency_changed(self: Arc<Self>);
}

/// A source of change notifications.
///
/// Readers call [`Atom::report_observed`] so the evaluating computed or
/// reaction records the dependency; writers call [`Atom::report_changed`]
/// after mutating the data the atom guards. Observers are held weakly.
pub struct Atom {
    id: u64,
    name: String,
    observers: Mutex<Vec<(u64, Weak<dyn Derivation>)>>,
}

impl Atom {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: next_node_id(),
            name: name.into(),
            observers: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record this atom as a dependency of whatever is currently evaluating.
    pub fn report_observed(self: &Arc<Self>) {
        tracking::record(self);
    }

    /// Notify dependents that the guarded data changed.
    ///
    /// Notification runs inside a batch: reactions scheduled by it run once
    /// the outermost batch completes.
    pub fn report_changed(&self) {
        let observers: Vec<Arc<dyn Derivation>> = {
            let mut observers = self.observers.lock();
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };
        if observers.is_empty() {
            return;
        }

        trace!(atom = %self.name, observers = observers.len(), "atom changed");
        tracking::batch(|| {
            for observer in observers {
                observer.on_dependency_changed();
            }
        });
    }

    /// Number of live dependents.
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    pub(crate) fn subscribe(&self, id: u64, observer: Weak<dyn Derivation>) {
        let mut observers = self.observers.lock();
        if !observers.iter().any(|(existing, _)| *existing == id) {
            observers.push((id, observer));
        }
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        self.observers.lock().retain(|(existing, _)| *existing != id);
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Replace the subscriptions of derivation `id` from `old` to `new`.
pub(crate) fn resubscribe(
    id: u64,
    weak: &Weak<dyn Derivation>,
    old: &[Arc<Atom>],
    new: &[Arc<Atom>],
) {
    for atom in old {
        if !new.iter().any(|a| a.id == atom.id) {
            atom.unsubscribe(id);
        }
    }
    for atom in new {
        atom.subscribe(id, weak.clone());
    }
}
