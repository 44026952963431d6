// ============================================================================
// spark-reconcile - Target Trees
// Immutable descriptions of the desired output, produced by templates
// ============================================================================

use std::fmt;

/// One node of a target tree.
///
/// Target trees are plain values: they are built fresh on every render and
/// compared structurally against the live tree.
#[derive(Clone, PartialEq, Eq)]
pub enum TargetNode {
    Text(String),
    Element(TargetElement),
}

/// An element of a target tree: tag, ordered attributes, ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<TargetNode>,
}

impl TargetNode {
    pub fn text(content: impl Into<String>) -> Self {
        TargetNode::Text(content.into())
    }

    /// Start an element; chain [`attr`](Self::attr) and
    /// [`child`](Self::child) to fill it in.
    ///
    /// ```
    /// use spark_reconcile::TargetNode;
    ///
    /// let tree = TargetNode::element("ul")
    ///     .attr("class", "items")
    ///     .child(TargetNode::element("li").child(TargetNode::text("one")))
    ///     .child(TargetNode::element("li").child(TargetNode::text("two")));
    ///
    /// assert_eq!(tree.children().len(), 2);
    /// assert_eq!(tree.attribute("class"), Some("items"));
    /// ```
    pub fn element(tag: impl Into<String>) -> Self {
        TargetNode::Element(TargetElement {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        })
    }

    /// Set an attribute. Setting one that is already present replaces its
    /// value and keeps its position. No-op on text nodes.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let TargetNode::Element(el) = &mut self {
            let (name, value) = (name.into(), value.into());
            match el.attributes.iter_mut().find(|(n, _)| *n == name) {
                Some((_, slot)) => *slot = value,
                None => el.attributes.push((name, value)),
            }
        }
        self
    }

    /// Append a child. No-op on text nodes.
    pub fn child(mut self, child: TargetNode) -> Self {
        if let TargetNode::Element(el) = &mut self {
            el.children.push(child);
        }
        self
    }

    /// Append several children. No-op on text nodes.
    pub fn children_from<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = TargetNode>,
    {
        if let TargetNode::Element(el) = &mut self {
            el.children.extend(children);
        }
        self
    }

    pub fn is_text(&self) -> bool {
        matches!(self, TargetNode::Text(_))
    }

    /// Tag of an element; `None` for text
    pub fn tag(&self) -> Option<&str> {
        match self {
            TargetNode::Element(el) => Some(&el.tag),
            TargetNode::Text(_) => None,
        }
    }

    /// Content of a text node; `None` for elements
    pub fn text_content(&self) -> Option<&str> {
        match self {
            TargetNode::Text(t) => Some(t),
            TargetNode::Element(_) => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        match self {
            TargetNode::Element(el) => &el.attributes,
            TargetNode::Text(_) => &[],
        }
    }

    pub fn children(&self) -> &[TargetNode] {
        match self {
            TargetNode::Element(el) => &el.children,
            TargetNode::Text(_) => &[],
        }
    }

    /// Total number of nodes in this subtree, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(TargetNode::node_count).sum::<usize>()
    }
}

impl From<&str> for TargetNode {
    fn from(text: &str) -> Self {
        TargetNode::text(text)
    }
}

impl From<String> for TargetNode {
    fn from(text: String) -> Self {
        TargetNode::Text(text)
    }
}

/// Markup-like rendering, handy in assertions and logs.
impl fmt::Display for TargetNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetNode::Text(t) => f.write_str(t),
            TargetNode::Element(el) => {
                write!(f, "<{}", el.tag)?;
                for (name, value) in &el.attributes {
                    write!(f, " {name}=\"{value}\"")?;
                }
                f.write_str(">")?;
                for child in &el.children {
                    child.fmt(f)?;
                }
                write!(f, "</{}>", el.tag)
            }
        }
    }
}

impl fmt::Debug for TargetNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
