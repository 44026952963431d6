// ============================================================================
// spark-reconcile - Reactive Wrapper
// Observable access to nested maps and lists
// ============================================================================
//
// A `Reactive` is a view onto a `Compound`. Every read goes through the
// dependency graph keyed by (owner, key); every write compares old and new
// values and triggers the graph only on a real change. Wrapping the same
// compound twice yields the same wrapper, so wrapper identity can stand in
// for data identity.
// ============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};
use crate::reactivity::batching::batch;
use crate::reactivity::graph::{track, trigger, Key, OwnerId};
use crate::store::value::{Compound, Shape, Value};

struct ReactiveInner {
    target: Compound,
}

impl Drop for ReactiveInner {
    fn drop(&mut self) {
        let owner = self.target.owner();
        let _ = WRAPPERS.try_with(|wrappers| {
            if let Ok(mut wrappers) = wrappers.try_borrow_mut() {
                // Only forget the entry if it is ours (it may already be a newer wrapper)
                if wrappers.get(&owner).is_some_and(|w| w.strong_count() == 0) {
                    wrappers.remove(&owner);
                }
            }
        });
    }
}

thread_local! {
    static WRAPPERS: RefCell<HashMap<OwnerId, Weak<ReactiveInner>>> = RefCell::new(HashMap::new());
}

// =============================================================================
// TRACKED
// =============================================================================

/// Result of a tracked read: primitives come back as plain values, compound
/// values come back wrapped.
#[derive(Clone, PartialEq)]
pub enum Tracked {
    Primitive(Value),
    Compound(Reactive),
}

impl Tracked {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Compound(c) => Tracked::Compound(Reactive::wrap(&c)),
            other => Tracked::Primitive(other),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Tracked::Primitive(v) => v.as_number(),
            Tracked::Compound(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tracked::Primitive(v) => v.as_str(),
            Tracked::Compound(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Tracked::Primitive(v) => v.as_bool(),
            Tracked::Compound(_) => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Tracked::Compound(r) => Some(r),
            Tracked::Primitive(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tracked::Primitive(Value::Null))
    }

    /// Back to a raw value (compound values are unwrapped, not copied)
    pub fn into_value(self) -> Value {
        match self {
            Tracked::Primitive(v) => v,
            Tracked::Compound(r) => Value::Compound(r.raw().clone()),
        }
    }

    /// Text form used when a read is interpolated into a tree
    pub fn to_text(&self) -> String {
        match self {
            Tracked::Primitive(v) => v.to_text(),
            Tracked::Compound(r) => Value::Compound(r.raw().clone()).to_text(),
        }
    }
}

impl fmt::Debug for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tracked::Primitive(v) => v.fmt(f),
            Tracked::Compound(r) => r.fmt(f),
        }
    }
}

// =============================================================================
// REACTIVE
// =============================================================================

/// Observable handle onto a compound value.
///
/// ```
/// use spark_reconcile::{create_computation, wrap, Value};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let state = wrap(&Value::map([("count", 0)])).unwrap();
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let _c = create_computation({
///     let (state, seen) = (state.clone(), seen.clone());
///     move || {
///         let count = state.get("count").unwrap().as_number();
///         seen.borrow_mut().push(count);
///     }
/// });
///
/// state.set("count", 1).unwrap();
/// state.set("count", 1).unwrap(); // unchanged, nobody re-runs
/// assert_eq!(*seen.borrow(), vec![Some(0.0), Some(1.0)]);
/// ```
#[derive(Clone)]
pub struct Reactive {
    inner: Rc<ReactiveInner>,
}

impl Reactive {
    /// The wrapper for `target`, reusing an existing one if still alive.
    pub fn wrap(target: &Compound) -> Self {
        let owner = target.owner();
        WRAPPERS.with(|wrappers| {
            let mut wrappers = wrappers.borrow_mut();
            if let Some(inner) = wrappers.get(&owner).and_then(Weak::upgrade) {
                return Reactive { inner };
            }
            let inner = Rc::new(ReactiveInner {
                target: target.clone(),
            });
            wrappers.insert(owner, Rc::downgrade(&inner));
            Reactive { inner }
        })
    }

    /// Same wrapper (and therefore same underlying data)
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn owner(&self) -> OwnerId {
        self.inner.target.owner()
    }

    /// The underlying data. Reads through it are not tracked.
    pub fn raw(&self) -> &Compound {
        &self.inner.target
    }

    /// Tracked read of a field or index.
    ///
    /// Missing entries read as `Null`. Compound values come back wrapped.
    pub fn get(&self, key: impl Into<Key>) -> Result<Tracked> {
        let key = key.into();
        let value = self.inner.target.get_raw(&key)?;
        track(self.owner(), key);
        Ok(Tracked::from_value(value))
    }

    /// Tracked entry count (list length or number of map fields).
    pub fn len(&self) -> usize {
        track(self.owner(), Key::Len);
        self.inner.target.len_raw()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tracked field names of a map, in order.
    pub fn keys(&self) -> Result<Vec<String>> {
        match &*self.inner.target.shape() {
            Shape::Map(m) => {
                track(self.owner(), Key::Len);
                Ok(m.keys().cloned().collect())
            }
            Shape::List(_) => Err(Error::KeyKind {
                key: "keys".into(),
                kind: "list",
            }),
        }
    }

    /// Write a field or index.
    ///
    /// Returns `Ok(false)` without notifying anyone if the new value equals
    /// the old one. Writing at a list's length appends; any index beyond
    /// that is an [`Error::IndexOutOfRange`].
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<bool> {
        let key = key.into();
        let value = value.into();
        self.inner.target.check_key(&key)?;

        let (changed, grew) = {
            let mut shape = self.inner.target.shape_mut();
            match (&mut *shape, &key) {
                (Shape::Map(m), Key::Field(name)) => match m.get_mut(name) {
                    Some(slot) if *slot == value => (false, false),
                    Some(slot) => {
                        *slot = value;
                        (true, false)
                    }
                    None => {
                        m.insert(name.clone(), value);
                        (true, true)
                    }
                },
                (Shape::List(items), Key::Index(i)) => {
                    let i = *i;
                    let len = items.len();
                    if i > len {
                        return Err(Error::IndexOutOfRange { index: i, len });
                    }
                    if i == len {
                        items.push(value);
                        (true, true)
                    } else if items[i] == value {
                        (false, false)
                    } else {
                        items[i] = value;
                        (true, false)
                    }
                }
                (shape, key) => {
                    return Err(Error::KeyKind {
                        key: key.to_string(),
                        kind: shape.kind(),
                    });
                }
            }
        };

        if changed {
            let owner = self.owner();
            batch(|| {
                trigger(owner, key);
                if grew {
                    trigger(owner, Key::Len);
                }
            });
        }
        Ok(changed)
    }

    /// Append to a list.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let index = {
            let mut shape = self.inner.target.shape_mut();
            match &mut *shape {
                Shape::List(items) => {
                    items.push(value.into());
                    items.len() - 1
                }
                Shape::Map(_) => {
                    return Err(Error::KeyKind {
                        key: "push".into(),
                        kind: "map",
                    });
                }
            }
        };

        let owner = self.owner();
        batch(|| {
            trigger(owner, Key::Index(index));
            trigger(owner, Key::Len);
        });
        Ok(())
    }

    /// Remove a map field or a list entry, returning the old value.
    ///
    /// Removing from a list shifts later entries, so every index from the
    /// removed one to the old end is triggered.
    pub fn remove(&self, key: impl Into<Key>) -> Result<Option<Value>> {
        let key = key.into();
        self.inner.target.check_key(&key)?;

        let (removed, shifted) = {
            let mut shape = self.inner.target.shape_mut();
            match (&mut *shape, &key) {
                (Shape::Map(m), Key::Field(name)) => (m.remove(name), None),
                (Shape::List(items), Key::Index(i)) if *i < items.len() => {
                    let old_len = items.len();
                    (Some(items.remove(*i)), Some(*i..old_len))
                }
                _ => (None, None),
            }
        };

        if removed.is_some() {
            let owner = self.owner();
            batch(|| {
                match shifted {
                    Some(range) => range.for_each(|i| trigger(owner, Key::Index(i))),
                    None => trigger(owner, key),
                }
                trigger(owner, Key::Len);
            });
        }
        Ok(removed)
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reactive").field(&self.inner.target).finish()
    }
}

impl From<Reactive> for Value {
    fn from(r: Reactive) -> Self {
        Value::Compound(r.raw().clone())
    }
}

impl From<&Reactive> for Value {
    fn from(r: &Reactive) -> Self {
        Value::Compound(r.raw().clone())
    }
}

/// Wrap a compound value for observable access.
///
/// # Errors
/// [`Error::NotCompound`] for primitives: they are never wrapped.
pub fn wrap(value: &Value) -> Result<Reactive> {
    match value {
        Value::Compound(c) => Ok(Reactive::wrap(c)),
        _ => Err(Error::NotCompound),
    }
}
