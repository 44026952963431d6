// ============================================================================
// spark-reconcile - Dependency Tracking
// Attributing reads to the ambient computation and propagating writes
// ============================================================================
//
// Borrow scoping is the recurring problem here: RefCell borrows on subscriber
// sets and dependency lists must be released before any user code runs, so
// everything follows "collect, then mutate".
// ============================================================================

use std::rc::{Rc, Weak};

use crate::config::with_config;
use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};

// =============================================================================
// TRACK READ - Register dependency when reading a cell
// =============================================================================

/// Attribute a read of `source` to the ambient computation, if there is one.
///
/// The first read of a source in a run subscribes the computation right
/// away, so a write later in the same run re-queues it. The run's full
/// dependency set is settled when it finishes.
///
/// Reads outside any computation, or inside `untrack`, register nothing.
pub fn track_read(source: Rc<dyn AnySource>) {
    with_context(|ctx| {
        if ctx.is_untracking() {
            return;
        }

        let Some(reaction) = ctx.active_reaction().and_then(|w| w.upgrade()) else {
            return;
        };

        if (reaction.flags() & REACTION_IS_UPDATING) != 0 {
            // Version-based deduplication: first read of this source in this run
            let read_version = ctx.get_read_version();
            if source.read_version() != read_version {
                source.set_read_version(read_version);
                source.add_reaction(Rc::downgrade(&reaction));
                ctx.add_new_dep(source);
            }
        } else {
            reaction.add_dep(source.clone());
            source.add_reaction(Rc::downgrade(&reaction));
        }
    });
}

// =============================================================================
// NOTIFY WRITE - Called when a cell's value changes
// =============================================================================

/// Notify the subscriber set of `source` after its value changed.
///
/// # Panics
/// Writing from inside a derived value's computation panics: derived
/// computations must be pure.
pub fn notify_write(source: Rc<dyn AnySource>) {
    let in_derived = with_context(|ctx| {
        ctx.active_reaction()
            .and_then(|w| w.upgrade())
            .is_some_and(|r| (r.flags() & DERIVED) != 0)
    });
    if in_derived {
        panic!(
            "Cannot write to cells inside a derived value. \
             Derived computations should be pure."
        );
    }

    with_context(|ctx| ctx.increment_write_version());
    mark_reactions(source);
}

// =============================================================================
// MARK REACTIONS - Mark subscribers dirty and queue them
// =============================================================================

/// Mark every live subscriber of `source` dirty and queue it for the flush loop.
///
/// Subscribers that are already dirty are already queued and are skipped, so
/// a computation fed by several changed cells still runs once per pass.
/// Outside a batch and outside a running flush the queue is flushed before
/// returning, which is what makes notification synchronous.
pub fn mark_reactions(source: Rc<dyn AnySource>) {
    source.cleanup_dead_reactions();

    // Collect first: the subscriber set must not stay borrowed
    let mut reactions: Vec<Rc<dyn AnyReaction>> = Vec::new();
    source.for_each_reaction(&mut |reaction| {
        reactions.push(reaction);
        true
    });

    tracing::trace!(message = "notify", subscribers = reactions.len());

    with_context(|ctx| {
        for reaction in &reactions {
            let flags = reaction.flags();
            if (flags & (DIRTY | DESTROYED)) != 0 {
                continue;
            }
            set_signal_status(&**reaction, DIRTY);
            ctx.add_pending_reaction(Rc::downgrade(reaction));
        }
    });

    let should_flush = with_context(|ctx| !ctx.is_batching() && !ctx.is_flushing());
    if should_flush {
        flush_pending_reactions();
    }
}

// =============================================================================
// FLUSH - Run queued reactions to completion
// =============================================================================

/// Restores the flushing flag and puts unprocessed reactions back on the
/// queue, also when a computation body panics mid-pass.
struct FlushGuard {
    was_flushing: bool,
    /// Deriveds still to settle, popped from the back
    derived: Vec<Weak<dyn AnyReaction>>,
    /// Computations of the current pass, popped from the back
    computations: Vec<Weak<dyn AnyReaction>>,
    /// Computations queued for the next pass
    next: Vec<Weak<dyn AnyReaction>>,
}

impl FlushGuard {
    fn drain(&mut self) -> Vec<Weak<dyn AnyReaction>> {
        let mut remaining: Vec<_> = self.derived.drain(..).rev().collect();
        remaining.extend(self.computations.drain(..).rev());
        remaining.append(&mut self.next);
        remaining
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let remaining = self.drain();
        with_context(|ctx| {
            for reaction in remaining {
                ctx.add_pending_reaction(reaction);
            }
            ctx.set_flushing(self.was_flushing);
        });
    }
}

fn run_if_dirty(weak: &Weak<dyn AnyReaction>) {
    let Some(reaction) = weak.upgrade() else {
        return;
    };
    let flags = reaction.flags();
    if (flags & DESTROYED) != 0 || (flags & DIRTY) == 0 {
        return;
    }
    reaction.update();
}

/// Give up on a suspected cycle: leave nothing dirty behind, then panic.
fn abort_cycle(guard: &mut FlushGuard, passes: u32) -> ! {
    let mut stuck = guard.drain();
    stuck.extend(with_context(|ctx| ctx.take_pending_reactions()));

    tracing::error!(
        message = "flush.cycle",
        passes,
        queued = stuck.len(),
        "dependency cycle suspected, dropping queued reactions"
    );
    for reaction in stuck.iter().filter_map(Weak::upgrade) {
        set_signal_status(&*reaction, CLEAN);
    }
    panic!("{CYCLE_MESSAGE}");
}

/// Run every queued dirty reaction until nothing is left.
///
/// Work proceeds in passes. Before each computation of a pass runs, every
/// queued derived value is settled, including deriveds queued by other
/// deriveds changing. So a computation reading both a cell and any chain of
/// deriveds over that cell sees consistent values and runs once per write.
/// Computations queued while a pass runs form the next pass.
///
/// # Panics
/// If more than `max_flush_iterations` passes (or derived rounds within one
/// pass) are needed, a dependency cycle is assumed: the queue is dropped and
/// the flush panics.
pub fn flush_pending_reactions() {
    let was_flushing = with_context(|ctx| ctx.set_flushing(true));
    if was_flushing {
        // The outer flush loop picks up anything queued by this caller
        return;
    }

    let max_passes = with_config(|cfg| cfg.max_flush_iterations);
    let mut guard = FlushGuard {
        was_flushing,
        derived: Vec::new(),
        computations: Vec::new(),
        next: Vec::new(),
    };
    let mut passes: u32 = 0;
    let mut derived_rounds: u32 = 0;

    loop {
        if let Some(weak) = guard.derived.pop() {
            run_if_dirty(&weak);
            continue;
        }

        let pending = with_context(|ctx| ctx.take_pending_reactions());
        let (derived, computations): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|w| w.upgrade().is_some_and(|r| r.is_derived()));
        guard.next.extend(computations);
        if !derived.is_empty() {
            derived_rounds += 1;
            if derived_rounds > max_passes {
                abort_cycle(&mut guard, passes);
            }
            guard.derived = derived.into_iter().rev().collect();
            continue;
        }

        if let Some(weak) = guard.computations.pop() {
            run_if_dirty(&weak);
            continue;
        }

        if guard.next.is_empty() {
            break;
        }
        passes += 1;
        if passes > max_passes {
            abort_cycle(&mut guard, passes);
        }
        derived_rounds = 0;
        guard.computations = std::mem::take(&mut guard.next).into_iter().rev().collect();
    }
}

// =============================================================================
// RUN TRACKED - Execute a reaction body as the ambient computation
// =============================================================================

/// Pops the ambient frame and installs the collected dependencies, on the
/// normal path and during unwinding alike.
struct RunGuard {
    reaction: Rc<dyn AnyReaction>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let deps = with_context(|ctx| ctx.pop_reaction());
        let flags = self.reaction.flags();
        self.reaction.set_flags(flags & !REACTION_IS_UPDATING);
        install_dependencies(&self.reaction, deps);
    }
}

/// Run `f` with `reaction` as the ambient computation.
///
/// Pushes the reaction on the computation stack, runs `f` to completion and
/// pops it again. The reaction's dependency set is replaced by whatever `f`
/// read. The stack is restored even if `f` panics.
pub fn run_tracked<R>(reaction: Rc<dyn AnyReaction>, f: impl FnOnce() -> R) -> R {
    set_signal_status(&*reaction, CLEAN);
    reaction.set_flags(reaction.flags() | REACTION_IS_UPDATING);

    with_context(|ctx| ctx.push_reaction(Rc::downgrade(&reaction)));

    let _guard = RunGuard { reaction };
    f()
}

// =============================================================================
// STATUS HELPERS
// =============================================================================

/// Replace the status bits (CLEAN, DIRTY) of a reaction.
pub fn set_signal_status(target: &dyn AnyReaction, status: u32) {
    target.set_flags((target.flags() & STATUS_MASK) | status);
}

/// True if the reaction needs to run.
pub fn is_dirty(reaction: &dyn AnyReaction) -> bool {
    (reaction.flags() & DIRTY) != 0
}

// =============================================================================
// DEPENDENCY INSTALL / REMOVAL
// =============================================================================

/// Remove `reaction` from the subscriber sets of its dependencies from index
/// `start` onwards, then truncate its dependency list.
pub fn remove_reactions(reaction: &Rc<dyn AnyReaction>, start: usize) {
    let mut stale: Vec<Rc<dyn AnySource>> = Vec::new();
    let mut idx = 0;
    reaction.for_each_dep(&mut |dep| {
        if idx >= start {
            stale.push(dep.clone());
        }
        idx += 1;
        true
    });

    for dep in stale {
        dep.remove_reaction(reaction);
    }

    reaction.remove_deps_from(start);
}

/// Replace the dependency set of `reaction` with `new_deps`.
pub fn install_dependencies(reaction: &Rc<dyn AnyReaction>, new_deps: Vec<Rc<dyn AnySource>>) {
    remove_reactions(reaction, 0);

    if (reaction.flags() & DESTROYED) != 0 {
        return;
    }

    let mut seen: Vec<*const ()> = Vec::with_capacity(new_deps.len());
    for dep in new_deps {
        let ptr = Rc::as_ptr(&dep) as *const ();
        if seen.contains(&ptr) {
            continue;
        }
        seen.push(ptr);
        dep.add_reaction(Rc::downgrade(reaction));
        reaction.add_dep(dep);
    }
}
