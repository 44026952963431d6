// ============================================================================
// spark-reconcile - Batching
// Deferring notification across several writes, and reading without tracking
// ============================================================================

use crate::core::context::with_context;
use crate::reactivity::tracking::flush_pending_reactions;

// =============================================================================
// BATCH
// =============================================================================

/// Group several writes so that dependent computations run once afterwards.
///
/// Writes inside `f` mark their subscribers dirty but nothing runs until the
/// outermost batch exits. Batches nest.
///
/// # Example
///
/// ```
/// use spark_reconcile::{batch, create_computation, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = signal(1);
/// let b = signal(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let _c = create_computation({
///     let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
///     move || {
///         let _ = a.get() + b.get();
///         runs.set(runs.get() + 1);
///     }
/// });
/// assert_eq!(runs.get(), 1);
///
/// batch(|| {
///     a.set(10);
///     b.set(20);
/// });
/// assert_eq!(runs.get(), 2);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    // Leaves the batch and flushes even if `f` panics
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());
            if depth == 0 {
                if std::thread::panicking() {
                    // Queued reactions stay queued; the next write flushes them
                    return;
                }
                flush_pending_reactions();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

// =============================================================================
// UNTRACK
// =============================================================================

/// Run `f` without attributing its reads to the ambient computation.
///
/// # Example
///
/// ```
/// use spark_reconcile::{create_computation, signal, untrack};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = signal(1);
/// let b = signal(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let _c = create_computation({
///     let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
///     move || {
///         let _ = a.get();
///         let _ = untrack(|| b.get());
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// a.set(10);
/// assert_eq!(runs.get(), 2);
/// b.set(20);
/// assert_eq!(runs.get(), 2);
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let prev = with_context(|ctx| ctx.set_untracking(true));

    struct UntrackGuard {
        prev: bool,
    }

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_untracking(self.prev));
        }
    }

    let _guard = UntrackGuard { prev };
    f()
}

/// Alias for [`untrack`].
pub fn peek<T>(f: impl FnOnce() -> T) -> T {
    untrack(f)
}

// =============================================================================
// FLUSH
// =============================================================================

/// Run every queued computation now.
///
/// Outside a batch the queue is always empty after a write returns, so this
/// only matters for reactions left queued by a panic.
pub fn flush_sync() {
    if with_context(|ctx| ctx.is_batching()) {
        return;
    }
    flush_pending_reactions();
}
