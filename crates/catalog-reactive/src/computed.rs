//! Memoized derived values with automatic dependency tracking.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::atom::{self, Atom, Derivation};
use crate::tracking;

/// A derived value that caches its result until a dependency changes.
///
/// Unlike a manually invalidated binding, a `Computed` discovers its
/// dependencies by recording what it reads: every [`Observable`] or other
/// `Computed` touched by the closure. Dependencies are re-recorded on each
/// evaluation, so conditional reads are handled. A change marks the value
/// (and, transitively, everything derived from it) stale; the closure runs
/// again on the next `get()`.
///
/// Cloning a `Computed` yields another handle to the same cache.
///
/// [`Observable`]: crate::Observable
pub struct Computed<T> {
    core: Arc<ComputedCore<T>>,
}

struct ComputedState<T> {
    value: Option<T>,
    stale: bool,
    // Bumped on every invalidation so a change that lands while the closure
    // is running keeps the result stale.
    generation: u64,
    sources: Vec<Arc<Atom>>,
}

struct ComputedCore<T> {
    id: u64,
    atom: Arc<Atom>,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    state: Mutex<ComputedState<T>>,
    evaluating: AtomicBool,
    runs: AtomicU64,
    weak: Weak<ComputedCore<T>>,
}

struct EvaluatingGuard<'a>(&'a AtomicBool);

impl Drop for EvaluatingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T: Clone + Send + Sync + 'static> Computed<T> {
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let name = name.into();
        let core = Arc::new_cyclic(|weak| ComputedCore {
            id: atom::next_node_id(),
            atom: Atom::new(name),
            compute: Box::new(compute),
            state: Mutex::new(ComputedState {
                value: None,
                stale: true,
                generation: 0,
                sources: Vec::new(),
            }),
            evaluating: AtomicBool::new(false),
            runs: AtomicU64::new(0),
            weak: weak.clone(),
        });
        Self { core }
    }

    /// Get the current value, recomputing it if a dependency changed.
    ///
    /// # Panics
    ///
    /// Panics if the computation reads its own value (a dependency cycle).
    pub fn get(&self) -> T {
        self.core.atom.report_observed();
        {
            let state = self.core.state.lock();
            if !state.stale {
                if let Some(value) = &state.value {
                    return value.clone();
                }
            }
        }
        self.core.recompute()
    }

    /// Mark the value stale without a dependency change.
    pub fn invalidate(&self) {
        Arc::clone(&self.core).on_dependency_changed();
    }

    /// Whether the next `get()` will run the computation.
    pub fn is_stale(&self) -> bool {
        self.core.state.lock().stale
    }

    /// How many times the computation has run.
    pub fn compute_count(&self) -> u64 {
        self.core.runs.load(Ordering::Relaxed)
    }

    /// Number of atoms the last evaluation depended on.
    pub fn dependency_count(&self) -> usize {
        self.core.state.lock().sources.len()
    }

    pub fn name(&self) -> &str {
        self.core.atom.name()
    }
}

impl<T: Clone + Send + Sync + 'static> ComputedCore<T> {
    fn recompute(&self) -> T {
        if self.evaluating.swap(true, Ordering::AcqRel) {
            panic!("cycle detected while computing '{}'", self.atom.name());
        }
        let guard = EvaluatingGuard(&self.evaluating);

        let generation = self.state.lock().generation;
        let (value, sources) = tracking::track(|| (self.compute)());
        drop(guard);

        let weak: Weak<dyn Derivation> = self.weak.clone();
        let mut state = self.state.lock();
        atom::resubscribe(self.id, &weak, &state.sources, &sources);
        state.sources = sources;
        state.value = Some(value.clone());
        state.stale = state.generation != generation;
        self.runs.fetch_add(1, Ordering::Relaxed);
        value
    }
}

impl<T: Send + Sync + 'static> Derivation for ComputedCore<T> {
    fn on_dependency_changed(self: Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.generation += 1;
            if state.stale {
                return;
            }
            state.stale = true;
        }
        self.atom.report_changed();
    }
}

impl<T> Drop for ComputedCore<T> {
    fn drop(&mut self) {
        for source in self.state.get_mut().sources.drain(..) {
            source.unsubscribe(self.id);
        }
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.lock();
        f.debug_struct("Computed")
            .field("name", &self.core.atom.name())
            .field("stale", &state.stale)
            .field("cached", &state.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{batch, Observable};

    #[test]
    fn test_computed_caches_until_dependency_changes() {
        let first = Observable::new("first", "John".to_string());
        let last = Observable::new("last", "Doe".to_string());
        let full = Computed::new("full", {
            let (first, last) = (first.clone(), last.clone());
            move || format!("{} {}", first.get(), last.get())
        });

        assert_eq!(full.get(), "John Doe");
        assert_eq!(full.get(), "John Doe");
        assert_eq!(full.compute_count(), 1);

        first.set("Jane".to_string());
        assert!(full.is_stale());
        assert_eq!(full.get(), "Jane Doe");
        assert_eq!(full.compute_count(), 2);
    }

    #[test]
    fn test_unchanged_write_does_not_invalidate() {
        let source = Observable::new("source", 1);
        let doubled = Computed::new("doubled", {
            let source = source.clone();
            move || source.get() * 2
        });
        assert_eq!(doubled.get(), 2);
        source.set(1);
        assert!(!doubled.is_stale());
        assert_eq!(doubled.compute_count(), 1);
    }

    #[test]
    fn test_diamond_recomputes_once() {
        let base = Observable::new("base", 1);
        let left = Computed::new("left", {
            let base = base.clone();
            move || base.get() + 1
        });
        let right = Computed::new("right", {
            let base = base.clone();
            move || base.get() * 10
        });
        let sum = Computed::new("sum", {
            let (left, right) = (left.clone(), right.clone());
            move || left.get() + right.get()
        });

        assert_eq!(sum.get(), 12);
        base.set(2);
        assert_eq!(sum.get(), 23);
        assert_eq!(sum.compute_count(), 2);
        assert_eq!(left.compute_count(), 2);
        assert_eq!(right.compute_count(), 2);
    }

    #[test]
    fn test_conditional_dependencies_are_retracked() {
        let use_a = Observable::new("use_a", true);
        let a = Observable::new("a", 1);
        let b = Observable::new("b", 2);
        let picked = Computed::new("picked", {
            let (use_a, a, b) = (use_a.clone(), a.clone(), b.clone());
            move || if use_a.get() { a.get() } else { b.get() }
        });

        assert_eq!(picked.get(), 1);
        assert_eq!(b.atom().observer_count(), 0);

        use_a.set(false);
        assert_eq!(picked.get(), 2);
        assert_eq!(a.atom().observer_count(), 0);

        // `a` is no longer read, so changing it costs nothing.
        a.set(100);
        assert!(!picked.is_stale());
        assert_eq!(picked.compute_count(), 2);
    }

    #[test]
    fn test_batch_invalidates_once() {
        let x = Observable::new("x", 1);
        let y = Observable::new("y", 1);
        let product = Computed::new("product", {
            let (x, y) = (x.clone(), y.clone());
            move || x.get() * y.get()
        });
        assert_eq!(product.get(), 1);

        batch(|| {
            x.set(3);
            y.set(4);
        });
        assert_eq!(product.get(), 12);
        assert_eq!(product.compute_count(), 2);
    }

    #[test]
    fn test_manual_invalidate() {
        let runs = Arc::new(AtomicU64::new(0));
        let counter = Computed::new("counter", {
            let runs = runs.clone();
            move || runs.fetch_add(1, Ordering::SeqCst)
        });
        assert_eq!(counter.get(), 0);
        counter.invalidate();
        assert_eq!(counter.get(), 1);
    }

    #[test]
    #[should_panic(expected = "cycle detected")]
    fn test_cycle_panics() {
        let slot: Arc<Mutex<Option<Computed<i32>>>> = Arc::new(Mutex::new(None));
        let cyclic = Computed::new("cyclic", {
            let slot = slot.clone();
            move || {
                let me = slot.lock().clone();
                me.map(|c| c.get()).unwrap_or(0) + 1
            }
        });
        *slot.lock() = Some(cyclic.clone());
        cyclic.get();
    }
}
