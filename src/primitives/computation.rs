// ============================================================================
// spark-reconcile - Computation Primitive
// A re-runnable unit of work whose reads become its dependencies
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::with_config;
use crate::core::constants::*;
use crate::core::types::{AnyReaction, AnySource};
use crate::reactivity::tracking::{remove_reactions, run_tracked, set_signal_status};

type ComputationFn = Box<dyn FnMut()>;

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_id() -> u64 {
    NEXT_ID.with(|n| {
        let id = n.get();
        n.set(id + 1);
        id
    })
}

// =============================================================================
// COMPUTATION INNER
// =============================================================================

/// Graph node of a computation.
///
/// Implements `AnyReaction` only: a computation has no value, so nothing
/// can depend on it.
pub struct ComputationInner {
    id: u64,
    flags: Cell<u32>,

    /// Taken out while running, gone after disposal
    func: RefCell<Option<ComputationFn>>,

    /// Sources read during the last run
    deps: RefCell<Vec<Rc<dyn AnySource>>>,

    /// Asked to run again while already running
    rerun: Cell<bool>,

    runs: Cell<u64>,

    self_weak: Weak<ComputationInner>,
}

impl ComputationInner {
    fn new(func: ComputationFn) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            id: next_id(),
            flags: Cell::new(COMPUTATION | CLEAN),
            func: RefCell::new(Some(func)),
            deps: RefCell::new(Vec::new()),
            rerun: Cell::new(false),
            runs: Cell::new(0),
            self_weak: weak.clone(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn run_count(&self) -> u64 {
        self.runs.get()
    }
}

impl AnyReaction for ComputationInner {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }

    fn add_dep(&self, source: Rc<dyn AnySource>) {
        self.deps.borrow_mut().push(source);
    }

    fn remove_deps_from(&self, start: usize) {
        self.deps.borrow_mut().truncate(start);
    }

    fn for_each_dep(&self, f: &mut dyn FnMut(&Rc<dyn AnySource>) -> bool) {
        for dep in self.deps.borrow().iter() {
            if !f(dep) {
                break;
            }
        }
    }

    fn update(&self) -> bool {
        if let Some(this) = self.self_weak.upgrade() {
            run_computation(&this);
        }
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// RUN / DESTROY
// =============================================================================

/// Run the computation body as the ambient computation.
///
/// A run requested while the body is already on the stack is deferred until
/// the current run returns. Each run replaces the dependency set.
pub fn run_computation(computation: &Rc<ComputationInner>) {
    if (computation.flags() & DESTROYED) != 0 {
        return;
    }

    let Some(func) = computation.func.borrow_mut().take() else {
        // Already running further up the stack
        computation.rerun.set(true);
        set_signal_status(&**computation, CLEAN);
        return;
    };

    // Returns the body to its slot even if it panics
    struct Restore<'a> {
        computation: &'a ComputationInner,
        func: Option<ComputationFn>,
    }

    impl Drop for Restore<'_> {
        fn drop(&mut self) {
            if (self.computation.flags() & DESTROYED) == 0 {
                *self.computation.func.borrow_mut() = self.func.take();
            }
        }
    }

    let mut restore = Restore {
        computation,
        func: Some(func),
    };
    let max_reruns = with_config(|cfg| cfg.max_flush_iterations);
    let mut reruns = 0;

    loop {
        let Some(func) = restore.func.as_mut() else {
            break;
        };
        computation.rerun.set(false);
        computation.runs.set(computation.runs.get() + 1);
        tracing::trace!(
            message = "computation.run",
            id = computation.id,
            run = computation.runs.get(),
            deps = computation.deps.borrow().len()
        );

        let reaction: Rc<dyn AnyReaction> = computation.clone();
        run_tracked(reaction, || func());

        if !computation.rerun.get() || (computation.flags() & DESTROYED) != 0 {
            break;
        }
        reruns += 1;
        if reruns > max_reruns {
            computation.rerun.set(false);
            panic!("{CYCLE_MESSAGE}");
        }
    }
}

/// Unsubscribe the computation everywhere and drop its body.
pub fn destroy_computation(computation: &Rc<ComputationInner>) {
    if (computation.flags() & DESTROYED) != 0 {
        return;
    }
    tracing::trace!(message = "computation.dispose", id = computation.id);

    let reaction: Rc<dyn AnyReaction> = computation.clone();
    remove_reactions(&reaction, 0);
    set_signal_status(&**computation, DESTROYED);

    // Dropped outside the borrow: the body may own handles whose Drop re-enters
    let func = computation.func.borrow_mut().take();
    drop(func);
}

// =============================================================================
// COMPUTATION HANDLE
// =============================================================================

/// Handle to a computation created by [`create_computation`].
///
/// Dropping the last handle disposes the computation, so keep it alive for as
/// long as the computation should keep reacting.
pub struct Computation {
    inner: Rc<ComputationInner>,
}

impl Computation {
    /// Run the body now, re-collecting dependencies.
    pub fn run(&self) {
        run_computation(&self.inner);
    }

    /// Stop reacting. Idempotent.
    pub fn dispose(&self) {
        destroy_computation(&self.inner);
    }

    pub fn is_disposed(&self) -> bool {
        (self.inner.flags() & DESTROYED) != 0
    }

    /// Number of times the body has started
    pub fn run_count(&self) -> u64 {
        self.inner.run_count()
    }

    /// Number of sources read during the last run
    pub fn dependency_count(&self) -> usize {
        self.inner.dep_count()
    }

    pub fn inner(&self) -> &Rc<ComputationInner> {
        &self.inner
    }
}

impl Clone for Computation {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for Computation {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.dispose();
        }
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.inner.id)
            .field("runs", &self.inner.run_count())
            .field("deps", &self.inner.dep_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Create a computation and run it once to collect its first dependencies.
///
/// Afterwards it re-runs synchronously whenever something it read during its
/// last run changes.
///
/// ```
/// use spark_reconcile::{create_computation, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(1);
/// let doubled = Rc::new(Cell::new(0));
///
/// let c = create_computation({
///     let (count, doubled) = (count.clone(), doubled.clone());
///     move || doubled.set(count.get() * 2)
/// });
/// assert_eq!(doubled.get(), 2);
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
///
/// c.dispose();
/// count.set(7);
/// assert_eq!(doubled.get(), 10);
/// ```
pub fn create_computation<F>(f: F) -> Computation
where
    F: FnMut() + 'static,
{
    let inner = ComputationInner::new(Box::new(f));
    run_computation(&inner);
    Computation { inner }
}
