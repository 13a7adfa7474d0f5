//! Thread-local dependency tracking and batching.

use std::cell::RefCell;
use std::sync::Arc;

use tracing::error;

use crate::atom::Atom;
use crate::reaction::ReactionCore;

/// Reactions that keep re-triggering each other are cut off after this many
/// flush rounds.
const MAX_REACTION_ROUNDS: usize = 100;

struct BatchState {
    depth: usize,
    flushing: bool,
    pending: Vec<Arc<ReactionCore>>,
}

thread_local! {
    // `None` frames come from `untracked` and swallow reads.
    static FRAMES: RefCell<Vec<Option<Vec<Arc<Atom>>>>> = const { RefCell::new(Vec::new()) };
    static BATCH: RefCell<BatchState> = const {
        RefCell::new(BatchState {
            depth: 0,
            flushing: false,
            pending: Vec::new(),
        })
    };
}

pub(crate) fn record(atom: &Arc<Atom>) {
    FRAMES.with(|frames| {
        if let Some(Some(frame)) = frames.borrow_mut().last_mut() {
            if !frame.iter().any(|a| a.id() == atom.id()) {
                frame.push(Arc::clone(atom));
            }
        }
    });
}

struct FrameGuard {
    finished: bool,
}

impl FrameGuard {
    fn push(frame: Option<Vec<Arc<Atom>>>) -> Self {
        FRAMES.with(|frames| frames.borrow_mut().push(frame));
        Self { finished: false }
    }

    fn finish(mut self) -> Vec<Arc<Atom>> {
        self.finished = true;
        FRAMES
            .with(|frames| frames.borrow_mut().pop())
            .flatten()
            .unwrap_or_default()
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if !self.finished {
            let _ = FRAMES.try_with(|frames| frames.borrow_mut().pop());
        }
    }
}

/// Run `f`, returning its result and every atom it observed.
pub(crate) fn track<R>(f: impl FnOnce() -> R) -> (R, Vec<Arc<Atom>>) {
    let guard = FrameGuard::push(Some(Vec::new()));
    let result = f();
    (result, guard.finish())
}

/// Run `f` without recording its reads as dependencies of the caller.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let guard = FrameGuard::push(None);
    let result = f();
    guard.finish();
    result
}

/// True while a computed value or reaction is evaluating.
pub fn is_tracking() -> bool {
    FRAMES.with(|frames| matches!(frames.borrow().last(), Some(Some(_))))
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let flush = BATCH.with(|batch| {
            let mut batch = batch.borrow_mut();
            batch.depth -= 1;
            batch.depth == 0 && !batch.flushing
        });
        if flush && !std::thread::panicking() {
            flush_reactions();
        }
    }
}

/// Apply several changes as one: reactions triggered inside `f` run once,
/// after the outermost batch returns.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    BATCH.with(|batch| batch.borrow_mut().depth += 1);
    let _guard = BatchGuard;
    f()
}

pub(crate) fn schedule(reaction: Arc<ReactionCore>) {
    let run_now = BATCH.with(|batch| {
        let mut batch = batch.borrow_mut();
        if !batch.pending.iter().any(|r| r.id() == reaction.id()) {
            batch.pending.push(reaction);
        }
        batch.depth == 0 && !batch.flushing
    });
    if run_now {
        flush_reactions();
    }
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let _ = BATCH.try_with(|batch| batch.borrow_mut().flushing = false);
    }
}

fn flush_reactions() {
    BATCH.with(|batch| batch.borrow_mut().flushing = true);
    let _guard = FlushGuard;

    for _ in 0..MAX_REACTION_ROUNDS {
        let pending = BATCH.with(|batch| std::mem::take(&mut batch.borrow_mut().pending));
        if pending.is_empty() {
            return;
        }
        for reaction in pending {
            reaction.execute();
        }
    }

    let dropped = BATCH.with(|batch| std::mem::take(&mut batch.borrow_mut().pending));
    error!(
        reactions = dropped.len(),
        "Reactions did not settle after {} rounds", MAX_REACTION_ROUNDS
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untracked_reads_are_not_recorded() {
        let a = Atom::new("a");
        let b = Atom::new("b");
        let ((), deps) = track(|| {
            a.report_observed();
            untracked(|| b.report_observed());
            a.report_observed();
        });
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].id(), a.id());
    }

    #[test]
    fn test_is_tracking() {
        assert!(!is_tracking());
        let (inside, _) = track(is_tracking);
        assert!(inside);
        let (nested, _) = track(|| untracked(is_tracking));
        assert!(!nested);
    }
}
