// ============================================================================
// spark-reconcile - Binding Registry
// Callbacks, the markers that stand in for them, and the template seam
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::binding::marker::MarkerToken;
use crate::store::Value;
use crate::tree::target::TargetNode;

// =============================================================================
// EVENTS / CALLBACKS
// =============================================================================

/// An event delivered to a listener through [`LiveNode::dispatch`].
///
/// [`LiveNode::dispatch`]: crate::LiveNode::dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub detail: Value,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: Value::Null,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// A shared event handler with a stable identity.
///
/// Identity is what rebind compares: clone a `Callback` once and hand the
/// same value to every render to keep its listener attached across renders.
#[derive(Clone)]
pub struct Callback {
    f: Rc<dyn Fn(&Event)>,
}

impl Callback {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    pub fn call(&self, event: &Event) {
        (self.f)(event)
    }

    /// Same underlying handler
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.f).cast::<()>())
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// One marker → callback association.
#[derive(Debug, Clone)]
pub struct Binding {
    pub token: MarkerToken,
    pub callback: Callback,
}

/// The bindings produced by one render.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: HashMap<MarkerToken, Callback>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under a fresh marker and return the marker, ready
    /// to be used as an attribute value.
    ///
    /// ```
    /// use spark_reconcile::{BindingRegistry, Callback, TargetNode};
    ///
    /// let mut bindings = BindingRegistry::new();
    /// let on_click = Callback::new(|_| {});
    /// let tree = TargetNode::element("button").attr("onclick", bindings.register(&on_click));
    ///
    /// let token = tree.attribute("onclick").unwrap();
    /// assert!(bindings.resolve(token).unwrap().ptr_eq(&on_click));
    /// ```
    pub fn register(&mut self, callback: &Callback) -> MarkerToken {
        let token = MarkerToken::next();
        self.bindings.insert(token.clone(), callback.clone());
        token
    }

    /// Register under a caller-supplied token.
    pub fn insert(&mut self, binding: Binding) {
        self.bindings.insert(binding.token, binding.callback);
    }

    pub fn resolve(&self, token: &str) -> Option<&Callback> {
        self.bindings.get(token)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MarkerToken, &Callback)> {
        self.bindings.iter()
    }
}

impl FromIterator<Binding> for BindingRegistry {
    fn from_iter<I: IntoIterator<Item = Binding>>(iter: I) -> Self {
        let mut registry = Self::new();
        for binding in iter {
            registry.insert(binding);
        }
        registry
    }
}

// =============================================================================
// TEMPLATE SEAM
// =============================================================================

/// Output of a template render: the target tree, with marker tokens embedded
/// as attribute values, and the bindings those markers resolve to.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub tree: TargetNode,
    pub bindings: BindingRegistry,
}

impl Rendered {
    pub fn new(tree: TargetNode, bindings: BindingRegistry) -> Self {
        Self { tree, bindings }
    }
}

impl From<TargetNode> for Rendered {
    fn from(tree: TargetNode) -> Self {
        Self::new(tree, BindingRegistry::new())
    }
}

/// Something that can produce a fresh [`Rendered`] on demand.
///
/// Reads made inside `render` are tracked when it runs under [`mount`].
///
/// [`mount`]: crate::mount
pub trait Template {
    fn render(&self) -> Rendered;
}

impl<F> Template for F
where
    F: Fn() -> Rendered,
{
    fn render(&self) -> Rendered {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn callback_identity_survives_clone() {
        let a = Callback::new(|_| {});
        let b = a.clone();
        let c = Callback::new(|_| {});
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn callbacks_receive_the_event() {
        let seen = Rc::new(Cell::new(0.0));
        let cb = Callback::new({
            let seen = seen.clone();
            move |e| seen.set(e.detail.as_number().unwrap_or(-1.0))
        });
        cb.call(&Event::new("input").with_detail(3));
        assert_eq!(seen.get(), 3.0);
    }

    #[test]
    fn registry_resolves_tokens() {
        let cb = Callback::new(|_| {});
        let mut registry = BindingRegistry::new();
        let t1 = registry.register(&cb);
        let t2 = registry.register(&cb);
        assert_ne!(t1, t2);
        assert_eq!(registry.len(), 2);
        assert!(registry.resolve(t2.as_str()).unwrap().ptr_eq(&cb));
        assert!(registry.resolve("nope").is_none());
    }

    #[test]
    fn closures_are_templates() {
        let template = || Rendered::from(TargetNode::element("p"));
        assert_eq!(template.render().tree.tag(), Some("p"));
    }
}
