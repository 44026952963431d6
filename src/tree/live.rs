// ============================================================================
// spark-reconcile - Live Trees
// The materialized, mutable counterpart of a target tree
// ============================================================================
//
// A `LiveNode` is a cheap handle (Rc) onto node data. Node identity is handle
// identity: the reconciler preserves it wherever shapes line up. Every node of
// one tree shares a `TreeState`, which counts mutations and fans them out to
// observers. Observers and listeners are always invoked with no node borrowed.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::binding::registry::{Callback, Event};
use crate::config::with_config;
use crate::error::{Error, Result};
use crate::tree::target::TargetNode;

// =============================================================================
// IDS / MUTATIONS
// =============================================================================

/// Stable identity of a live node, for logs and mutation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        thread_local! {
            static NEXT: Cell<u64> = const { Cell::new(1) };
        }
        NEXT.with(|n| {
            let id = n.get();
            n.set(id + 1);
            NodeId(id)
        })
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One in-place change to a live tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
    RemoveAttribute {
        node: NodeId,
        name: String,
    },
    SetText {
        node: NodeId,
        text: String,
    },
    SetValue {
        node: NodeId,
        value: String,
    },
    AppendChild {
        parent: NodeId,
        child: NodeId,
    },
    RemoveChild {
        parent: NodeId,
        child: NodeId,
    },
    ReplaceChild {
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    },
    /// A parentless node's content was swapped for a fresh materialization
    ReplaceContent {
        node: NodeId,
    },
    AttachListener {
        node: NodeId,
        event: String,
    },
    DetachListener {
        node: NodeId,
        event: String,
    },
}

/// Handle returned by [`LiveNode::observe`], used to stop observing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type ObserverFn = Rc<dyn Fn(&Mutation)>;

#[derive(Default)]
struct TreeState {
    mutations: Cell<u64>,
    next_observer: Cell<u64>,
    observers: RefCell<Vec<(ObserverId, ObserverFn)>>,
}

// =============================================================================
// NODE DATA
// =============================================================================

struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    /// Live value of editable elements, which can drift from the attribute
    value: Option<String>,
    children: Vec<LiveNode>,
    /// Attached listener per event name
    listeners: Vec<(String, Callback)>,
}

enum Content {
    Text(String),
    Element(ElementData),
}

struct NodeData {
    id: NodeId,
    content: Content,
    parent: Weak<RefCell<NodeData>>,
    tree: Rc<TreeState>,
}

// =============================================================================
// LIVE NODE
// =============================================================================

/// Handle to a node of a live tree. Clones are the same node.
#[derive(Clone)]
pub struct LiveNode {
    data: Rc<RefCell<NodeData>>,
}

impl LiveNode {
    /// Build a fresh live tree from a target description.
    pub fn materialize(target: &TargetNode) -> LiveNode {
        Self::materialize_in(target, &Rc::new(TreeState::default()))
    }

    fn materialize_in(target: &TargetNode, tree: &Rc<TreeState>) -> LiveNode {
        let node = LiveNode {
            data: Rc::new(RefCell::new(NodeData {
                id: NodeId::next(),
                content: Content::Text(String::new()),
                parent: Weak::new(),
                tree: tree.clone(),
            })),
        };
        let content = Self::content_for(target, &node, tree);
        node.data.borrow_mut().content = content;
        node
    }

    /// Fresh content for `target`, with children parented to `owner`.
    fn content_for(target: &TargetNode, owner: &LiveNode, tree: &Rc<TreeState>) -> Content {
        match target {
            TargetNode::Text(text) => Content::Text(text.clone()),
            TargetNode::Element(_) => {
                let tag = target.tag().unwrap_or_default().to_owned();
                let attributes = target.attributes().to_vec();
                let value = with_config(|cfg| {
                    if cfg.is_editable(&tag) {
                        target.attribute(&cfg.value_attribute).map(str::to_owned)
                    } else {
                        None
                    }
                });
                let children = target
                    .children()
                    .iter()
                    .map(|child| {
                        let node = Self::materialize_in(child, tree);
                        node.data.borrow_mut().parent = Rc::downgrade(&owner.data);
                        node
                    })
                    .collect();
                Content::Element(ElementData {
                    tag,
                    attributes,
                    value,
                    children,
                    listeners: Vec::new(),
                })
            }
        }
    }

    // =========================================================================
    // IDENTITY / INSPECTION
    // =========================================================================

    pub fn id(&self) -> NodeId {
        self.data.borrow().id
    }

    /// Same node
    pub fn ptr_eq(&self, other: &LiveNode) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data.borrow().content, Content::Text(_))
    }

    pub fn tag(&self) -> Option<String> {
        match &self.data.borrow().content {
            Content::Element(el) => Some(el.tag.clone()),
            Content::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<String> {
        match &self.data.borrow().content {
            Content::Text(t) => Some(t.clone()),
            Content::Element(_) => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.data.borrow().content {
            Content::Element(el) => el
                .attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            Content::Text(_) => None,
        }
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        match &self.data.borrow().content {
            Content::Element(el) => el.attributes.clone(),
            Content::Text(_) => Vec::new(),
        }
    }

    /// Live value of an editable element
    pub fn value(&self) -> Option<String> {
        match &self.data.borrow().content {
            Content::Element(el) => el.value.clone(),
            Content::Text(_) => None,
        }
    }

    pub fn children(&self) -> Vec<LiveNode> {
        match &self.data.borrow().content {
            Content::Element(el) => el.children.clone(),
            Content::Text(_) => Vec::new(),
        }
    }

    pub fn child_count(&self) -> usize {
        match &self.data.borrow().content {
            Content::Element(el) => el.children.len(),
            Content::Text(_) => 0,
        }
    }

    pub fn child(&self, index: usize) -> Result<LiveNode> {
        match &self.data.borrow().content {
            Content::Element(el) => el.children.get(index).cloned().ok_or(Error::ChildIndex {
                index,
                len: el.children.len(),
            }),
            Content::Text(_) => Err(Error::NotAnElement { op: "child" }),
        }
    }

    pub fn parent(&self) -> Option<LiveNode> {
        self.data
            .borrow()
            .parent
            .upgrade()
            .map(|data| LiveNode { data })
    }

    /// Structural equality with a target: same kinds, tags, attributes, text,
    /// and children, recursively. Attribute order is ignored. Live values and
    /// listeners are not part of the structure.
    pub fn matches(&self, target: &TargetNode) -> bool {
        let data = self.data.borrow();
        match (&data.content, target) {
            (Content::Text(t), TargetNode::Text(expected)) => t == expected,
            (Content::Element(el), TargetNode::Element(_)) => {
                target.tag() == Some(el.tag.as_str())
                    && el.attributes.len() == target.attributes().len()
                    && target
                        .attributes()
                        .iter()
                        .all(|(name, value)| el.attributes.iter().any(|(n, v)| n == name && v == value))
                    && el.children.len() == target.children().len()
                    && el
                        .children
                        .iter()
                        .zip(target.children())
                        .all(|(live, t)| live.matches(t))
            }
            _ => false,
        }
    }

    /// Snapshot of the current structure as a target tree.
    pub fn to_target(&self) -> TargetNode {
        let data = self.data.borrow();
        match &data.content {
            Content::Text(t) => TargetNode::text(t.clone()),
            Content::Element(el) => {
                let mut node = TargetNode::element(el.tag.clone());
                for (name, value) in &el.attributes {
                    node = node.attr(name.clone(), value.clone());
                }
                node.children_from(el.children.iter().map(LiveNode::to_target))
            }
        }
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    /// Call `f` for every mutation anywhere in this node's tree.
    pub fn observe(&self, f: impl Fn(&Mutation) + 'static) -> ObserverId {
        let tree = self.tree();
        let id = ObserverId(tree.next_observer.get());
        tree.next_observer.set(id.0 + 1);
        tree.observers.borrow_mut().push((id, Rc::new(f)));
        id
    }

    /// Stop an observer. Returns false if it was not installed on this tree.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let tree = self.tree();
        let mut observers = tree.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    /// Mutations applied to this node's tree since it was materialized.
    pub fn mutation_count(&self) -> u64 {
        self.tree().mutations.get()
    }

    fn tree(&self) -> Rc<TreeState> {
        self.data.borrow().tree.clone()
    }

    fn record(&self, mutation: Mutation) {
        let tree = self.tree();
        tree.mutations.set(tree.mutations.get() + 1);
        let observers: Vec<ObserverFn> =
            tree.observers.borrow().iter().map(|(_, f)| f.clone()).collect();
        for observer in observers {
            observer(&mutation);
        }
    }

    /// Move `node` (and its subtree) into this node's tree.
    fn adopt(&self, node: &LiveNode) {
        let tree = self.tree();
        let mut stack = vec![node.clone()];
        while let Some(n) = stack.pop() {
            n.data.borrow_mut().tree = tree.clone();
            stack.extend(n.children());
        }
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Set an attribute. An existing attribute is updated in place; a new one
    /// is appended.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        let id = {
            let mut data = self.data.borrow_mut();
            let id = data.id;
            let Content::Element(el) = &mut data.content else {
                return Err(Error::NotAnElement { op: "set_attribute" });
            };
            match el.attributes.iter_mut().find(|(n, _)| n == name) {
                Some((_, slot)) => *slot = value.to_owned(),
                None => el.attributes.push((name.to_owned(), value.to_owned())),
            }
            id
        };
        tracing::trace!(message = "attr.set", node = %id, name, value);
        self.record(Mutation::SetAttribute {
            node: id,
            name: name.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&self, name: &str) -> Result<bool> {
        let id = {
            let mut data = self.data.borrow_mut();
            let id = data.id;
            let Content::Element(el) = &mut data.content else {
                return Err(Error::NotAnElement {
                    op: "remove_attribute",
                });
            };
            let before = el.attributes.len();
            el.attributes.retain(|(n, _)| n != name);
            if el.attributes.len() == before {
                return Ok(false);
            }
            id
        };
        tracing::trace!(message = "attr.remove", node = %id, name);
        self.record(Mutation::RemoveAttribute {
            node: id,
            name: name.to_owned(),
        });
        Ok(true)
    }

    pub fn set_text(&self, text: &str) -> Result<()> {
        let id = {
            let mut data = self.data.borrow_mut();
            let id = data.id;
            let Content::Text(t) = &mut data.content else {
                return Err(Error::NotText { op: "set_text" });
            };
            text.clone_into(t);
            id
        };
        tracing::trace!(message = "text.set", node = %id);
        self.record(Mutation::SetText {
            node: id,
            text: text.to_owned(),
        });
        Ok(())
    }

    /// Assign the live value, as a user typing into the element would.
    pub fn set_value(&self, value: &str) -> Result<()> {
        let id = {
            let mut data = self.data.borrow_mut();
            let id = data.id;
            let Content::Element(el) = &mut data.content else {
                return Err(Error::NotAnElement { op: "set_value" });
            };
            el.value = Some(value.to_owned());
            id
        };
        self.record(Mutation::SetValue {
            node: id,
            value: value.to_owned(),
        });
        Ok(())
    }

    /// Append `child`, detaching it from any previous parent first.
    pub fn append_child(&self, child: LiveNode) -> Result<()> {
        if self.is_text() {
            return Err(Error::NotAnElement { op: "append_child" });
        }
        child.detach()?;
        self.adopt(&child);
        child.data.borrow_mut().parent = Rc::downgrade(&self.data);

        let child_id = child.id();
        if let Content::Element(el) = &mut self.data.borrow_mut().content {
            el.children.push(child);
        }
        self.record(Mutation::AppendChild {
            parent: self.id(),
            child: child_id,
        });
        Ok(())
    }

    /// Remove and return the child at `index`.
    pub fn remove_child(&self, index: usize) -> Result<LiveNode> {
        let removed = {
            let mut data = self.data.borrow_mut();
            let Content::Element(el) = &mut data.content else {
                return Err(Error::NotAnElement { op: "remove_child" });
            };
            if index >= el.children.len() {
                return Err(Error::ChildIndex {
                    index,
                    len: el.children.len(),
                });
            }
            el.children.remove(index)
        };
        removed.data.borrow_mut().parent = Weak::new();
        self.record(Mutation::RemoveChild {
            parent: self.id(),
            child: removed.id(),
        });
        Ok(removed)
    }

    /// Put `new` at `index`, returning the node it displaced.
    pub fn replace_child(&self, index: usize, new: LiveNode) -> Result<LiveNode> {
        if self.is_text() {
            return Err(Error::NotAnElement { op: "replace_child" });
        }
        new.detach()?;
        let old = {
            let mut data = self.data.borrow_mut();
            let Content::Element(el) = &mut data.content else {
                return Err(Error::NotAnElement { op: "replace_child" });
            };
            if index >= el.children.len() {
                return Err(Error::ChildIndex {
                    index,
                    len: el.children.len(),
                });
            }
            std::mem::replace(&mut el.children[index], new.clone())
        };
        self.adopt(&new);
        new.data.borrow_mut().parent = Rc::downgrade(&self.data);
        old.data.borrow_mut().parent = Weak::new();
        self.record(Mutation::ReplaceChild {
            parent: self.id(),
            old: old.id(),
            new: new.id(),
        });
        Ok(old)
    }

    /// Take this node out of its parent, if it has one.
    fn detach(&self) -> Result<()> {
        let Some(parent) = self.parent() else {
            return Ok(());
        };
        let index = parent
            .children()
            .iter()
            .position(|c| c.ptr_eq(self))
            .ok_or(Error::ChildIndex {
                index: usize::MAX,
                len: parent.child_count(),
            })?;
        parent.remove_child(index).map(|_| ())
    }

    /// Swap a node's content for a fresh materialization of `target`, keeping
    /// the handle. Listeners and the live value are dropped.
    pub(crate) fn replace_content(&self, target: &TargetNode) {
        let tree = self.tree();
        let content = Self::content_for(target, self, &tree);
        let (id, old) = {
            let mut data = self.data.borrow_mut();
            (data.id, std::mem::replace(&mut data.content, content))
        };
        if let Content::Element(el) = old {
            for child in el.children {
                child.data.borrow_mut().parent = Weak::new();
            }
        }
        self.record(Mutation::ReplaceContent { node: id });
    }

    // =========================================================================
    // LISTENERS
    // =========================================================================

    /// Callback currently attached for `event`
    pub fn listener(&self, event: &str) -> Option<Callback> {
        match &self.data.borrow().content {
            Content::Element(el) => el
                .listeners
                .iter()
                .find(|(e, _)| e == event)
                .map(|(_, cb)| cb.clone()),
            Content::Text(_) => None,
        }
    }

    /// Event names with an attached listener, in attach order
    pub fn listener_events(&self) -> Vec<String> {
        match &self.data.borrow().content {
            Content::Element(el) => el.listeners.iter().map(|(e, _)| e.clone()).collect(),
            Content::Text(_) => Vec::new(),
        }
    }

    /// Attach `callback` for `event`, replacing any previous listener.
    pub fn attach_listener(&self, event: &str, callback: Callback) -> Result<()> {
        let id = {
            let mut data = self.data.borrow_mut();
            let id = data.id;
            let Content::Element(el) = &mut data.content else {
                return Err(Error::NotAnElement {
                    op: "attach_listener",
                });
            };
            match el.listeners.iter_mut().find(|(e, _)| e == event) {
                Some((_, slot)) => *slot = callback,
                None => el.listeners.push((event.to_owned(), callback)),
            }
            id
        };
        self.record(Mutation::AttachListener {
            node: id,
            event: event.to_owned(),
        });
        Ok(())
    }

    /// Detach the listener for `event`, returning it.
    pub fn detach_listener(&self, event: &str) -> Result<Option<Callback>> {
        let (id, removed) = {
            let mut data = self.data.borrow_mut();
            let id = data.id;
            let Content::Element(el) = &mut data.content else {
                return Err(Error::NotAnElement {
                    op: "detach_listener",
                });
            };
            let removed = el
                .listeners
                .iter()
                .position(|(e, _)| e == event)
                .map(|i| el.listeners.remove(i).1);
            (id, removed)
        };
        if removed.is_some() {
            self.record(Mutation::DetachListener {
                node: id,
                event: event.to_owned(),
            });
        }
        Ok(removed)
    }

    /// Invoke the listener attached for `event.name`. Returns false if none is.
    pub fn dispatch(&self, event: &Event) -> bool {
        // Cloned out so the callback may mutate this very node
        let Some(callback) = self.listener(&event.name) else {
            return false;
        };
        callback.call(event);
        true
    }

    /// Every node of this subtree, parents before children.
    pub fn descendants(&self) -> Vec<LiveNode> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            let mut children = node.children();
            children.reverse();
            stack.extend(children);
            out.push(node);
        }
        out
    }
}

impl PartialEq for LiveNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Markup rendering of the current structure.
impl fmt::Display for LiveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_target(), f)
    }
}

impl fmt::Debug for LiveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiveNode({} {})", self.id(), self)
    }
}
