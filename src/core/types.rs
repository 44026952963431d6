// ============================================================================
// spark-reconcile - Type Definitions
// Type-erased traits and base types for the dependency graph
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::constants::*;

// =============================================================================
// TYPE-ERASED TRAITS
// =============================================================================
//
// Graph operations (mark dirty, track deps, notify) never need the value
// type T. Only reading and writing values does. So subscriber sets hold
// Weak<dyn AnyReaction> and dependency lists hold Rc<dyn AnySource>, while
// Signal<T>, Derived<T> and the store's trigger cells keep the typed data.
// =============================================================================

/// Type-erased source interface: anything a computation can depend on.
///
/// Implemented by `SourceInner<T>` (cells, graph triggers) and
/// `DerivedInner<T>` (derived values).
pub trait AnySource: Any {
    /// Get the flags bitmask
    fn flags(&self) -> u32;

    /// Set the flags bitmask
    fn set_flags(&self, flags: u32);

    /// Write version (bumped whenever the value changes)
    fn write_version(&self) -> u32;

    fn set_write_version(&self, version: u32);

    /// Read version, used to deduplicate reads within one run
    fn read_version(&self) -> u32;

    fn set_read_version(&self, version: u32);

    /// Number of entries in the subscriber set (including dead ones not yet pruned)
    fn reaction_count(&self) -> usize;

    /// Add a computation to the subscriber set. Adding an entry that is
    /// already present is a no-op.
    fn add_reaction(&self, reaction: Weak<dyn AnyReaction>);

    /// Drop subscriber entries whose computation no longer exists
    fn cleanup_dead_reactions(&self);

    /// Visit live subscribers. Return false from `f` to stop early.
    fn for_each_reaction(&self, f: &mut dyn FnMut(Rc<dyn AnyReaction>) -> bool);

    /// Remove one computation from the subscriber set (pointer identity)
    fn remove_reaction(&self, reaction: &Rc<dyn AnyReaction>);

    fn is_derived(&self) -> bool {
        self.flags() & DERIVED != 0
    }

    fn is_dirty(&self) -> bool {
        self.flags() & DIRTY != 0
    }

    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }

    fn mark_dirty(&self) {
        self.set_flags((self.flags() & STATUS_MASK) | DIRTY);
    }

    fn mark_clean(&self) {
        self.set_flags((self.flags() & STATUS_MASK) | CLEAN);
    }

    /// Upcast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Type-erased reaction interface: something that re-runs when a dependency fires.
///
/// Implemented by `ComputationInner` and `DerivedInner<T>`.
pub trait AnyReaction: Any {
    fn flags(&self) -> u32;

    fn set_flags(&self, flags: u32);

    /// Number of sources read during the last run
    fn dep_count(&self) -> usize;

    /// Record a source read during the current run
    fn add_dep(&self, source: Rc<dyn AnySource>);

    /// Truncate the dependency list from `start`
    fn remove_deps_from(&self, start: usize);

    /// Visit dependencies. Return false from `f` to stop early.
    fn for_each_dep(&self, f: &mut dyn FnMut(&Rc<dyn AnySource>) -> bool);

    /// Re-run the reaction. Returns true if a derived's value changed;
    /// computations always return false.
    fn update(&self) -> bool;

    fn is_derived(&self) -> bool {
        self.flags() & DERIVED != 0
    }

    fn is_computation(&self) -> bool {
        self.flags() & COMPUTATION != 0
    }

    fn is_dirty(&self) -> bool {
        self.flags() & DIRTY != 0
    }

    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }

    fn is_destroyed(&self) -> bool {
        self.flags() & DESTROYED != 0
    }

    fn mark_dirty(&self) {
        self.set_flags((self.flags() & STATUS_MASK) | DIRTY);
    }

    fn mark_clean(&self) {
        self.set_flags((self.flags() & STATUS_MASK) | CLEAN);
    }

    fn as_any(&self) -> &dyn Any;
}

/// Subscriber set shared by every source implementation.
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: RefCell<Vec<Weak<dyn AnyReaction>>>,
}

impl Subscribers {
    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub(crate) fn add(&self, reaction: Weak<dyn AnyReaction>) {
        let ptr = reaction.as_ptr() as *const ();
        let mut entries = self.entries.borrow_mut();
        if entries.iter().any(|w| w.as_ptr() as *const () == ptr) {
            return;
        }
        entries.push(reaction);
    }

    pub(crate) fn cleanup(&self) {
        self.entries.borrow_mut().retain(|w| w.strong_count() > 0);
    }

    pub(crate) fn for_each(&self, f: &mut dyn FnMut(Rc<dyn AnyReaction>) -> bool) {
        // Collect first so `f` may add or remove subscribers.
        let live: Vec<Rc<dyn AnyReaction>> =
            self.entries.borrow().iter().filter_map(Weak::upgrade).collect();
        for rc in live {
            if !f(rc) {
                break;
            }
        }
    }

    pub(crate) fn remove(&self, reaction: &Rc<dyn AnyReaction>) {
        let target = Rc::as_ptr(reaction) as *const ();
        self.entries
            .borrow_mut()
            .retain(|w| w.strong_count() > 0 && w.as_ptr() as *const () != target);
    }
}

// =============================================================================
// SOURCE INNER (the data behind Signal<T> and graph triggers)
// =============================================================================

/// Equality function type for comparing cell values
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// The internal data for an observable cell.
///
/// Kept separate from `Signal<T>` so that `Rc<SourceInner<T>>` coerces to
/// `Rc<dyn AnySource>` for the graph.
pub struct SourceInner<T> {
    flags: Cell<u32>,
    value: RefCell<T>,
    write_version: Cell<u32>,
    read_version: Cell<u32>,
    reactions: Subscribers,
    equals: EqualsFn<T>,
}

impl<T> SourceInner<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals)
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            flags: Cell::new(SOURCE | CLEAN),
            value: RefCell::new(value),
            write_version: Cell::new(0),
            read_version: Cell::new(0),
            reactions: Subscribers::default(),
            equals,
        }
    }

    /// Get the current value (cloning). Does not track.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    /// Borrow the current value. Does not track.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value, returning true if it differed. Does not notify.
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let current = self.value.borrow();
            !(self.equals)(&current, &value)
        };

        if changed {
            *self.value.borrow_mut() = value;
            self.write_version.set(self.write_version.get().wrapping_add(1));
        }

        changed
    }

    /// Mutate in place. Returns true if anyone is subscribed (the caller
    /// should then notify, since in-place changes cannot be compared).
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        f(&mut self.value.borrow_mut());

        let has_reactions = self.reactions.len() > 0;
        if has_reactions {
            self.write_version.set(self.write_version.get().wrapping_add(1));
        }
        has_reactions
    }

    pub fn equals_fn(&self) -> EqualsFn<T> {
        self.equals
    }
}

impl<T: 'static> AnySource for SourceInner<T> {
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
