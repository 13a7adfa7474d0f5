//! Side effects that re-run when their dependencies change.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::atom::{self, Atom, Derivation};
use crate::tracking;

pub(crate) struct ReactionCore {
    id: u64,
    name: String,
    effect: Mutex<Box<dyn FnMut() + Send>>,
    sources: Mutex<Vec<Arc<Atom>>>,
    disposed: AtomicBool,
    runs: AtomicU64,
    weak: Weak<ReactionCore>,
}

impl ReactionCore {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn execute(&self) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        // Re-entrant runs are skipped.
        let Some(mut effect) = self.effect.try_lock() else {
            trace!(reaction = %self.name, "reaction already running");
            return;
        };
        let ((), sources) = tracking::track(|| (*effect)());
        drop(effect);

        let weak: Weak<dyn Derivation> = self.weak.clone();
        let mut current = self.sources.lock();
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        atom::resubscribe(self.id, &weak, &current, &sources);
        *current = sources;
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        for source in self.sources.lock().drain(..) {
            source.unsubscribe(self.id);
        }
    }
}

impl Derivation for ReactionCore {
    fn on_dependency_changed(self: Arc<Self>) {
        if !self.disposed.load(Ordering::Acquire) {
            tracking::schedule(self);
        }
    }
}

/// Handle to a running reaction. Dropping it disposes the reaction.
pub struct Reaction {
    core: Arc<ReactionCore>,
}

impl Reaction {
    /// Stop reacting to changes.
    pub fn dispose(&self) {
        self.core.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.core.disposed.load(Ordering::Acquire)
    }

    /// How many times the effect has run (including the initial run).
    pub fn run_count(&self) -> u64 {
        self.core.runs.load(Ordering::Relaxed)
    }
}

impl Drop for Reaction {
    fn drop(&mut self) {
        self.core.dispose();
    }
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("name", &self.core.name)
            .field("runs", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `effect` now and again after every change to what it read.
pub fn autorun<F>(name: impl Into<String>, effect: F) -> Reaction
where
    F: FnMut() + Send + 'static,
{
    let core = Arc::new_cyclic(|weak| ReactionCore {
        id: atom::next_node_id(),
        name: name.into(),
        effect: Mutex::new(Box::new(effect)),
        sources: Mutex::new(Vec::new()),
        disposed: AtomicBool::new(false),
        runs: AtomicU64::new(0),
        weak: weak.clone(),
    });
    tracking::batch(|| core.execute());
    Reaction { core }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{batch, Computed, Observable};

    #[test]
    fn test_autorun_reruns_on_change() {
        let value = Observable::new("value", 1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reaction = autorun("record", {
            let (value, seen) = (value.clone(), seen.clone());
            move || seen.lock().push(value.get())
        });

        value.set(2);
        value.set(3);
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert_eq!(reaction.run_count(), 3);
    }

    #[test]
    fn test_batched_writes_are_seen_together() {
        let loading = Observable::new("loading", false);
        let payload = Observable::new("payload", Some(1));
        let pairs = Arc::new(Mutex::new(Vec::new()));
        let _reaction = autorun("pairs", {
            let (loading, payload, pairs) = (loading.clone(), payload.clone(), pairs.clone());
            move || pairs.lock().push((loading.get(), payload.get()))
        });

        batch(|| {
            loading.set(true);
            payload.set(None);
        });
        batch(|| {
            loading.set(false);
            payload.set(Some(2));
        });

        assert_eq!(
            *pairs.lock(),
            vec![(false, Some(1)), (true, None), (false, Some(2))]
        );
    }

    #[test]
    fn test_reaction_through_computed() {
        let base = Observable::new("base", 2);
        let squared = Computed::new("squared", {
            let base = base.clone();
            move || base.get() * base.get()
        });
        let last = Arc::new(Mutex::new(0));
        let _reaction = autorun("square", {
            let (squared, last) = (squared.clone(), last.clone());
            move || *last.lock() = squared.get()
        });
        assert_eq!(*last.lock(), 4);
        base.set(5);
        assert_eq!(*last.lock(), 25);
    }

    #[test]
    fn test_disposed_reaction_stops() {
        let value = Observable::new("value", 0);
        let reaction = autorun("noop", {
            let value = value.clone();
            move || {
                value.get();
            }
        });
        reaction.dispose();
        value.set(1);
        assert_eq!(reaction.run_count(), 1);
        assert_eq!(value.atom().observer_count(), 0);
    }

    #[test]
    fn test_chained_reactions_settle_in_one_flush() {
        let source = Observable::new("source", 1);
        let mirror = Observable::new("mirror", 0);
        let _copy = autorun("copy", {
            let (source, mirror) = (source.clone(), mirror.clone());
            move || {
                mirror.set(source.get() * 10);
            }
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _watch = autorun("watch", {
            let (mirror, seen) = (mirror.clone(), seen.clone());
            move || seen.lock().push(mirror.get())
        });

        source.set(2);
        assert_eq!(mirror.get(), 20);
        assert_eq!(*seen.lock(), vec![10, 20]);
    }
}
