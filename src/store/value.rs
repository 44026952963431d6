// ============================================================================
// spark-reconcile - Raw Values
// The plain nested data the reactive wrapper observes
// ============================================================================

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::reactivity::equality::{safe_equals_f64, same_rc};
use crate::reactivity::graph::{drop_owner, Key, OwnerId};

// =============================================================================
// VALUE
// =============================================================================

/// A value held by a reactive store.
///
/// Primitives compare by value (NaN equals NaN). Compound values compare by
/// identity: two lists with the same items are different values unless they
/// are the same allocation.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Compound(Compound),
}

impl Value {
    /// A fresh map from `(field, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Compound(Compound::map(entries))
    }

    /// A fresh list.
    pub fn list<V, I>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Compound(Compound::list(items))
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Value::Compound(_))
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Value::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text form used when a value is interpolated into a tree.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Compound(c) => format!("{c:?}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => safe_equals_f64(a, b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Compound(a), Value::Compound(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Compound(c) => c.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Compound> for Value {
    fn from(c: Compound) -> Self {
        Value::Compound(c)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// COMPOUND
// =============================================================================

/// Contents of a compound value.
#[derive(Debug, Clone)]
pub enum Shape {
    Map(BTreeMap<String, Value>),
    List(Vec<Value>),
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Map(_) => "map",
            Shape::List(_) => "list",
        }
    }
}

struct CompoundData {
    owner: OwnerId,
    shape: RefCell<Shape>,
}

impl Drop for CompoundData {
    fn drop(&mut self) {
        drop_owner(self.owner);
    }
}

/// A shared, mutable map or list with a stable identity.
///
/// Cloning shares the data. Reads and writes through `Compound` itself are
/// raw: they neither track nor notify. Go through
/// [`Reactive`](crate::store::Reactive) for that.
#[derive(Clone)]
pub struct Compound {
    data: Rc<CompoundData>,
}

impl Compound {
    fn from_shape(shape: Shape) -> Self {
        Self {
            data: Rc::new(CompoundData {
                owner: OwnerId::next(),
                shape: RefCell::new(shape),
            }),
        }
    }

    pub fn map<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::from_shape(Shape::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn list<V, I>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::from_shape(Shape::List(items.into_iter().map(Into::into).collect()))
    }

    pub fn owner(&self) -> OwnerId {
        self.data.owner
    }

    pub fn ptr_eq(&self, other: &Compound) -> bool {
        same_rc(&self.data, &other.data)
    }

    pub fn kind(&self) -> &'static str {
        self.data.shape.borrow().kind()
    }

    pub fn is_list(&self) -> bool {
        matches!(*self.data.shape.borrow(), Shape::List(_))
    }

    pub fn shape(&self) -> Ref<'_, Shape> {
        self.data.shape.borrow()
    }

    pub(crate) fn shape_mut(&self) -> RefMut<'_, Shape> {
        self.data.shape.borrow_mut()
    }

    /// Check that `key` addresses this kind of compound.
    pub fn check_key(&self, key: &Key) -> Result<()> {
        match (&*self.shape(), key) {
            (_, Key::Len) | (Shape::Map(_), Key::Field(_)) | (Shape::List(_), Key::Index(_)) => {
                Ok(())
            }
            (shape, key) => Err(Error::KeyKind {
                key: key.to_string(),
                kind: shape.kind(),
            }),
        }
    }

    /// Raw read. Missing fields and out-of-range indices read as `Null`;
    /// `Key::Len` reads the entry count.
    pub fn get_raw(&self, key: &Key) -> Result<Value> {
        self.check_key(key)?;
        Ok(match (&*self.shape(), key) {
            (Shape::Map(m), Key::Field(name)) => m.get(name).cloned().unwrap_or(Value::Null),
            (Shape::List(items), Key::Index(i)) => items.get(*i).cloned().unwrap_or(Value::Null),
            (shape, _) => Value::Number(shape_len(shape) as f64),
        })
    }

    pub fn len_raw(&self) -> usize {
        shape_len(&self.shape())
    }
}

fn shape_len(shape: &Shape) -> usize {
    match shape {
        Shape::Map(m) => m.len(),
        Shape::List(items) => items.len(),
    }
}

impl fmt::Debug for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // try_borrow: a Debug call from inside a write must not panic
        match self.data.shape.try_borrow() {
            Ok(shape) => match &*shape {
                Shape::Map(m) => f.debug_map().entries(m.iter()).finish(),
                Shape::List(items) => f.debug_list().entries(items.iter()).finish(),
            },
            Err(_) => write!(f, "<compound #{}>", self.data.owner.raw()),
        }
    }
}
