// ============================================================================
// spark-reconcile - Dependency Graph
// Per-(owner, key) triggers backing the reactive store
// ============================================================================
//
// The store does not keep cells inside the data. Instead every read of a
// field, index or length goes through `track`, which lazily creates a trigger
// cell for that (owner, key) pair, and every write goes through `trigger`.
// Computations subscribe to the trigger cells like to any other source.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::core::context::{is_tracking, with_context};
use crate::core::types::{AnySource, SourceInner};
use crate::reactivity::tracking::{notify_write, track_read};

// =============================================================================
// OWNER / KEY
// =============================================================================

/// Identity of a compound value (one map or list allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    /// A fresh identity, never handed out before on this thread.
    pub fn next() -> Self {
        thread_local! {
            static NEXT: Cell<u64> = const { Cell::new(1) };
        }
        NEXT.with(|n| {
            let id = n.get();
            n.set(id + 1);
            OwnerId(id)
        })
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Which part of a compound value a read touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named field of a map
    Field(String),
    /// A position in a list
    Index(usize),
    /// The length of a list, or the key set of a map
    Len,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => write!(f, "{name}"),
            Key::Index(i) => write!(f, "[{i}]"),
            Key::Len => f.write_str("length"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

type Trigger = Rc<SourceInner<u64>>;

thread_local! {
    static GRAPH: RefCell<HashMap<(OwnerId, Key), Trigger>> = RefCell::new(HashMap::new());
}

/// Record that the ambient computation read `key` of `owner`.
///
/// Outside a computation this is a no-op and allocates nothing.
pub fn track(owner: OwnerId, key: Key) {
    if !is_tracking() {
        return;
    }

    let trigger = GRAPH.with(|graph| {
        graph
            .borrow_mut()
            .entry((owner, key))
            .or_insert_with(|| Rc::new(SourceInner::new(0)))
            .clone()
    });
    track_read(trigger as Rc<dyn AnySource>);
}

/// Notify every computation that read `key` of `owner`.
///
/// Runs them synchronously unless a batch is open.
pub fn trigger(owner: OwnerId, key: Key) {
    let Some(trigger) = GRAPH.with(|graph| graph.borrow().get(&(owner, key.clone())).cloned())
    else {
        return;
    };

    tracing::trace!(message = "graph.trigger", owner = owner.raw(), key = %key);

    trigger.set(trigger.get().wrapping_add(1));
    with_context(|ctx| {
        let wv = ctx.increment_write_version();
        trigger.set_write_version(wv);
    });
    notify_write(trigger as Rc<dyn AnySource>);
}

/// Forget every trigger of `owner`. Called when the compound value is freed.
pub fn drop_owner(owner: OwnerId) {
    // try_with: may run from a destructor during thread teardown
    let _ = GRAPH.try_with(|graph| {
        if let Ok(mut graph) = graph.try_borrow_mut() {
            graph.retain(|(o, _), _| *o != owner);
        }
    });
}

/// Number of computations subscribed to `key` of `owner`.
pub fn subscriber_count(owner: OwnerId, key: &Key) -> usize {
    GRAPH.with(|graph| {
        graph
            .borrow()
            .get(&(owner, key.clone()))
            .map_or(0, |t| t.reaction_count())
    })
}

/// Number of (owner, key) triggers currently registered on this thread.
pub fn trigger_count() -> usize {
    GRAPH.with(|graph| graph.borrow().len())
}
