// ============================================================================
// spark-reconcile - Reactive Context
// Thread-local ambient state: the computation stack, versions and batching
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::{AnyReaction, AnySource};

// =============================================================================
// COMPUTATION STACK FRAME
// =============================================================================

/// One entry of the ambient computation stack.
///
/// The frame keeps the dependencies the enclosing computation had collected
/// so far, so a nested run does not clobber them.
struct Frame {
    reaction: Weak<dyn AnyReaction>,
    outer_deps: Vec<Rc<dyn AnySource>>,
    outer_read_version: u32,
}

// =============================================================================
// REACTIVE CONTEXT
// =============================================================================

/// Thread-local reactive context holding all ambient state for reactivity.
///
/// There is exactly one logical thread of control, so plain `Cell`/`RefCell`
/// is enough; nothing here survives past the call stack that set it up.
pub struct ReactiveContext {
    /// Running computations, innermost last. The top is the ambient computation.
    stack: RefCell<Vec<Frame>>,

    /// Reading without creating dependencies
    untracking: Cell<bool>,

    /// Global write version, bumped on every cell write
    write_version: Cell<u32>,

    /// Read version of the ambient run, used to deduplicate reads
    read_version: Cell<u32>,

    /// Last read version handed out; never reused
    read_counter: Cell<u32>,

    /// Dependencies collected by the ambient computation during this run
    new_deps: RefCell<Vec<Rc<dyn AnySource>>>,

    /// Nesting depth of `batch` scopes
    batch_depth: Cell<u32>,

    /// Dirty reactions waiting for the flush loop
    pending_reactions: RefCell<Vec<Weak<dyn AnyReaction>>>,

    /// The flush loop is on the stack
    flushing: Cell<bool>,
}

impl ReactiveContext {
    pub fn new() -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
            untracking: Cell::new(false),
            write_version: Cell::new(1),
            read_version: Cell::new(0),
            read_counter: Cell::new(0),
            new_deps: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            pending_reactions: RefCell::new(Vec::new()),
            flushing: Cell::new(false),
        }
    }

    // =========================================================================
    // COMPUTATION STACK
    // =========================================================================

    /// Make `reaction` the ambient computation with a fresh read version.
    /// Returns the new stack depth.
    pub fn push_reaction(&self, reaction: Weak<dyn AnyReaction>) -> usize {
        let outer_deps = self.new_deps.replace(Vec::new());
        let outer_read_version = self.read_version.get();
        self.increment_read_version();

        let mut stack = self.stack.borrow_mut();
        stack.push(Frame {
            reaction,
            outer_deps,
            outer_read_version,
        });
        stack.len()
    }

    /// Pop the ambient computation, returning the dependencies it collected.
    /// The enclosing run gets its own dependencies and read version back.
    pub fn pop_reaction(&self) -> Vec<Rc<dyn AnySource>> {
        let frame = self.stack.borrow_mut().pop();
        match frame {
            Some(frame) => {
                self.read_version.set(frame.outer_read_version);
                self.new_deps.replace(frame.outer_deps)
            }
            None => self.new_deps.replace(Vec::new()),
        }
    }

    /// The ambient computation, if any
    pub fn active_reaction(&self) -> Option<Weak<dyn AnyReaction>> {
        self.stack.borrow().last().map(|frame| frame.reaction.clone())
    }

    pub fn has_active_reaction(&self) -> bool {
        !self.stack.borrow().is_empty()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Set untracking mode, returning the previous value
    pub fn set_untracking(&self, value: bool) -> bool {
        self.untracking.replace(value)
    }

    pub fn is_untracking(&self) -> bool {
        self.untracking.get()
    }

    // =========================================================================
    // VERSION COUNTERS
    // =========================================================================

    pub fn increment_write_version(&self) -> u32 {
        let v = self.write_version.get().wrapping_add(1);
        self.write_version.set(v);
        v
    }

    pub fn get_write_version(&self) -> u32 {
        self.write_version.get()
    }

    /// Hand out a read version no earlier run has used and make it current
    pub fn increment_read_version(&self) -> u32 {
        let v = self.read_counter.get().wrapping_add(1);
        self.read_counter.set(v);
        self.read_version.set(v);
        v
    }

    pub fn get_read_version(&self) -> u32 {
        self.read_version.get()
    }

    // =========================================================================
    // DEPENDENCY COLLECTION
    // =========================================================================

    pub fn add_new_dep(&self, source: Rc<dyn AnySource>) {
        self.new_deps.borrow_mut().push(source);
    }

    pub fn new_dep_count(&self) -> usize {
        self.new_deps.borrow().len()
    }

    // =========================================================================
    // BATCHING / FLUSHING
    // =========================================================================

    /// Increment batch depth, returns new depth
    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    /// Decrement batch depth, returns new depth
    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    pub fn get_batch_depth(&self) -> u32 {
        self.batch_depth.get()
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    pub fn add_pending_reaction(&self, reaction: Weak<dyn AnyReaction>) {
        self.pending_reactions.borrow_mut().push(reaction);
    }

    pub fn take_pending_reactions(&self) -> Vec<Weak<dyn AnyReaction>> {
        self.pending_reactions.replace(Vec::new())
    }

    pub fn has_pending_reactions(&self) -> bool {
        !self.pending_reactions.borrow().is_empty()
    }

    /// Set flushing mode, returning the previous value
    pub fn set_flushing(&self, value: bool) -> bool {
        self.flushing.replace(value)
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
///
/// Keep the closure short: never run user code inside it.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Inside a computation and not untracking
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.has_active_reaction() && !ctx.is_untracking())
}

pub fn is_untracking() -> bool {
    with_context(|ctx| ctx.is_untracking())
}

pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

/// Depth of the ambient computation stack
pub fn computation_depth() -> usize {
    with_context(|ctx| ctx.stack_depth())
}

pub fn write_version() -> u32 {
    with_context(|ctx| ctx.get_write_version())
}

pub fn read_version() -> u32 {
    with_context(|ctx| ctx.get_read_version())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceInner;

    #[test]
    fn context_creation() {
        with_context(|ctx| {
            assert_eq!(ctx.get_write_version(), 1);
            assert_eq!(ctx.get_read_version(), 0);
            assert!(!ctx.has_active_reaction());
            assert!(!ctx.is_untracking());
            assert_eq!(ctx.get_batch_depth(), 0);
        });
    }

    #[test]
    fn batch_depth_nests() {
        with_context(|ctx| {
            assert_eq!(ctx.enter_batch(), 1);
            assert_eq!(ctx.enter_batch(), 2);
            assert!(ctx.is_batching());
            assert_eq!(ctx.exit_batch(), 1);
            assert_eq!(ctx.exit_batch(), 0);
            assert!(!ctx.is_batching());
            assert_eq!(ctx.exit_batch(), 0);
        });
    }

    #[test]
    fn nested_frames_keep_outer_deps() {
        let ctx = ReactiveContext::new();
        let outer: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        let inner: Rc<dyn AnySource> = Rc::new(SourceInner::new(2));

        ctx.push_reaction(Weak::<crate::primitives::computation::ComputationInner>::new());
        ctx.add_new_dep(outer.clone());

        ctx.push_reaction(Weak::<crate::primitives::computation::ComputationInner>::new());
        assert_eq!(ctx.stack_depth(), 2);
        assert_eq!(ctx.new_dep_count(), 0);
        ctx.add_new_dep(inner);

        let inner_version = ctx.get_read_version();
        let inner_deps = ctx.pop_reaction();
        assert_eq!(inner_deps.len(), 1);
        assert_eq!(ctx.new_dep_count(), 1);
        assert!(ctx.get_read_version() < inner_version);

        let outer_deps = ctx.pop_reaction();
        assert!(Rc::ptr_eq(&outer_deps[0], &outer));
        assert!(!ctx.has_active_reaction());
    }

    #[test]
    fn convenience_functions() {
        assert!(!is_tracking());
        assert!(!is_untracking());
        assert!(!is_batching());
        assert_eq!(computation_depth(), 0);
        assert!(write_version() >= 1);
    }
}
