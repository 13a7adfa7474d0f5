//! Observable value cells.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::atom::Atom;

/// A value whose reads are tracked and whose writes invalidate dependents.
///
/// # Example
///
/// ```ignore
/// let opacity = Observable::new("opacity", 0.8);
/// let percent = Computed::new("percent", {
///     let opacity = opacity.clone();
///     move || (opacity.get() * 100.0) as u32
/// });
///
/// assert_eq!(percent.get(), 80);
/// assert!(opacity.set(0.5));
/// assert_eq!(percent.get(), 50);
/// ```
///
/// Cloning an `Observable` yields another handle to the same cell.
pub struct Observable<T> {
    value: Arc<RwLock<T>>,
    atom: Arc<Atom>,
}

impl<T: Clone> Observable<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
            atom: Atom::new(name),
        }
    }

    /// Get the current value, recording the read.
    pub fn get(&self) -> T {
        self.atom.report_observed();
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.atom.report_observed();
        f(&self.value.read())
    }

    /// Mutate in place. Dependents are always notified.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        f(&mut self.value.write());
        self.atom.report_changed();
    }

    /// The atom guarding this cell.
    pub fn atom(&self) -> &Arc<Atom> {
        &self.atom
    }
}

impl<T: Clone + PartialEq> Observable<T> {
    /// Set the value, returning `true` (and notifying dependents) if it changed.
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let mut current = self.value.write();
            if *current != value {
                *current = value;
                true
            } else {
                false
            }
        };
        if changed {
            self.atom.report_changed();
        }
        changed
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let old = {
            let mut current = self.value.write();
            if *current != value {
                Some(std::mem::replace(&mut *current, value))
            } else {
                None
            }
        };
        if old.is_some() {
            self.atom.report_changed();
        }
        old
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            atom: Arc::clone(&self.atom),
        }
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("name", &self.atom.name())
            .field("value", &*self.value.read())
            .finish()
    }
}
