// ============================================================================
// spark-reconcile - Derived Values
// Cached computed values that notify only when their result changes
// ============================================================================
//
// A derived value is BOTH a source (it can be read and has subscribers) AND
// a reaction (it has dependencies and re-runs). It recomputes eagerly when a
// dependency fires, inside the flush loop and ahead of plain computations,
// and forwards the notification only if the new result differs.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{default_equals, AnyReaction, AnySource, EqualsFn, Subscribers};
use crate::reactivity::tracking::{mark_reactions, run_tracked, track_read};

// =============================================================================
// DERIVED INNER
// =============================================================================

/// Graph node of a derived value.
pub struct DerivedInner<T> {
    flags: Cell<u32>,

    fn_: Box<dyn Fn() -> T>,

    /// Cached result; only empty until the first computation returns
    value: RefCell<Option<T>>,

    equals: EqualsFn<T>,

    write_version: Cell<u32>,
    read_version: Cell<u32>,

    /// Source side: computations and deriveds reading this value
    reactions: Subscribers,

    /// Reaction side: what the last computation read
    deps: RefCell<Vec<Rc<dyn AnySource>>>,

    recomputes: Cell<u64>,

    self_ref: Weak<DerivedInner<T>>,
}

impl<T: 'static> DerivedInner<T> {
    fn new_with_equals<F>(fn_: F, equals: EqualsFn<T>) -> Rc<Self>
    where
        F: Fn() -> T + 'static,
    {
        Rc::new_cyclic(|weak| Self {
            flags: Cell::new(DERIVED | SOURCE | DIRTY),
            fn_: Box::new(fn_),
            value: RefCell::new(None),
            equals,
            write_version: Cell::new(0),
            read_version: Cell::new(0),
            reactions: Subscribers::default(),
            deps: RefCell::new(Vec::new()),
            recomputes: Cell::new(0),
            self_ref: weak.clone(),
        })
    }

    /// Run the function as the ambient computation and store the result.
    /// Returns true if the cached value changed.
    fn compute(self: &Rc<Self>) -> bool {
        self.recomputes.set(self.recomputes.get() + 1);

        let reaction: Rc<dyn AnyReaction> = self.clone();
        let new_value = run_tracked(reaction, || (self.fn_)());

        let changed = match self.value.borrow().as_ref() {
            Some(current) => !(self.equals)(current, &new_value),
            None => true,
        };
        tracing::trace!(
            message = "derived.recompute",
            run = self.recomputes.get(),
            changed
        );

        if changed {
            *self.value.borrow_mut() = Some(new_value);
            with_context(|ctx| self.write_version.set(ctx.increment_write_version()));
        }
        changed
    }

    fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.value.borrow();
        match value.as_ref() {
            Some(value) => f(value),
            // Only reachable by reading itself during its first computation
            None => {
                tracing::error!(message = "derived.cycle");
                panic!("{CYCLE_MESSAGE}");
            }
        }
    }

    /// Number of times the function has run
    pub fn recompute_count(&self) -> u64 {
        self.recomputes.get()
    }
}

impl<T: 'static> AnySource for DerivedInner<T> {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn write_version(&self) -> u32 {
        self.write_version.get()
    }

    fn set_write_version(&self, version: u32) {
        self.write_version.set(version);
    }

    fn read_version(&self) -> u32 {
        self.read_version.get()
    }

    fn set_read_version(&self, version: u32) {
        self.read_version.set(version);
    }

    fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    fn add_reaction(&self, reaction: Weak<dyn AnyReaction>) {
        self.reactions.add(reaction);
    }

    fn cleanup_dead_reactions(&self) {
        self.reactions.cleanup();
    }

    fn for_each_reaction(&self, f: &mut dyn FnMut(Rc<dyn AnyReaction>) -> bool) {
        self.reactions.for_each(f);
    }

    fn remove_reaction(&self, reaction: &Rc<dyn AnyReaction>) {
        self.reactions.remove(reaction);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: 'static> AnyReaction for DerivedInner<T> {
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
        let Some(this) = self.self_ref.upgrade() else {
            return false;
        };
        let changed = this.compute();
        if changed {
            mark_reactions(this as Rc<dyn AnySource>);
        }
        changed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// DERIVED HANDLE
// =============================================================================

/// Read-only handle to a derived value.
///
/// ```
/// use spark_reconcile::{create_derived, signal};
///
/// let count = signal(1);
/// let doubled = create_derived({
///     let count = count.clone();
///     move || count.get() * 2
/// });
/// assert_eq!(doubled.get(), 2);
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Derived<T> {
    /// Bring the cached value up to date if a dependency changed inside a
    /// batch that has not flushed yet.
    fn settle(&self) {
        if AnyReaction::is_dirty(&*self.inner) {
            AnyReaction::update(&*self.inner);
        }
    }

    /// Current value, tracked like a cell read.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Borrow the current value, tracked like a cell read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.settle();
        track_read(self.as_any_source());
        self.inner.with_value(f)
    }

    /// Current value without subscribing the ambient computation.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.settle();
        self.inner.with_value(T::clone)
    }

    /// Number of times the function has run
    pub fn recompute_count(&self) -> u64 {
        self.inner.recompute_count()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.cleanup_dead_reactions();
        self.inner.reaction_count()
    }

    pub fn inner(&self) -> &Rc<DerivedInner<T>> {
        &self.inner
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner
            .with_value(|value| f.debug_struct("Derived").field("value", value).finish())
    }
}

/// Create a derived value, computing it once immediately.
///
/// The result is cached. When something the function read changes, the
/// function re-runs; subscribers are notified only if the result differs
/// from the cached one.
pub fn create_derived<T, F>(fn_: F) -> Derived<T>
where
    T: PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    create_derived_with_equals(fn_, default_equals)
}

/// [`create_derived`] with a custom notion of "changed".
pub fn create_derived_with_equals<T, F>(fn_: F, equals: EqualsFn<T>) -> Derived<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    let inner = DerivedInner::new_with_equals(fn_, equals);
    inner.compute();
    Derived { inner }
}
