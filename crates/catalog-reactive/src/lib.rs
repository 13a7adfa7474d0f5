//! Reactive engine for catalog models.
//!
//! Values live in [`Observable`] cells. A [`Computed`] records every
//! observable (or other computed) it reads while evaluating and is marked
//! stale when any of them changes; it recomputes lazily on the next read, at
//! most once per change. A [`Reaction`] is the eager counterpart: it re-runs
//! its effect after a change, deferred until the outermost [`batch`] ends so
//! that it never observes half of a multi-value update.
//!
//! [`MemoCache`] is a content-addressed cache for expensive derived objects:
//! the key must carry every input that affects construction.
//!
//! Tracking state is thread-local; the engine assumes the single-threaded,
//! cooperative scheduling of a map viewer.

mod atom;
mod computed;
mod memo;
mod observable;
mod reaction;
mod tracking;

pub use atom::Atom;
pub use computed::Computed;
pub use memo::{MemoCache, MemoStats};
pub use observable::Observable;
pub use reaction::{autorun, Reaction};
pub use tracking::{batch, is_tracking, untracked};
