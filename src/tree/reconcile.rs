// ============================================================================
// spark-reconcile - Reconciliation
// Patch a live tree in place until it matches a target tree
// ============================================================================
//
// The pass is positional: children are paired by index, never by key.
// Inserting into the middle of a list therefore patches every later sibling
// instead of moving nodes. Shapes that cannot be patched (text vs element,
// different tags) are replaced wholesale.
// ============================================================================

use crate::config::with_config;
use crate::error::{Error, Result};
use crate::tree::live::LiveNode;
use crate::tree::target::TargetNode;

/// Bring `live` in line with `target`, mutating as little as possible.
///
/// A `None` target is rejected with [`Error::MissingTarget`] before anything
/// is touched.
///
/// ```
/// use spark_reconcile::{reconcile, LiveNode, TargetNode};
///
/// let live = LiveNode::materialize(
///     &TargetNode::element("div").child(TargetNode::element("span").child("0".into())),
/// );
/// let span = live.child(0).unwrap();
///
/// let next = TargetNode::element("div").child(TargetNode::element("span").child("1".into()));
/// reconcile(&live, Some(&next)).unwrap();
///
/// assert!(live.matches(&next));
/// assert!(live.child(0).unwrap().ptr_eq(&span));
/// assert_eq!(live.mutation_count(), 1);
/// ```
pub fn reconcile(live: &LiveNode, target: Option<&TargetNode>) -> Result<()> {
    let target = target.ok_or(Error::MissingTarget)?;
    let _span = tracing::debug_span!("reconcile", node = %live.id()).entered();
    patch(live, target)
}

impl LiveNode {
    /// Method form of [`reconcile`].
    pub fn reconcile(&self, target: &TargetNode) -> Result<()> {
        reconcile(self, Some(target))
    }
}

fn patch(live: &LiveNode, target: &TargetNode) -> Result<()> {
    if live.matches(target) {
        return Ok(());
    }

    let same_shape = match target {
        TargetNode::Text(_) => live.is_text(),
        TargetNode::Element(_) => live.tag().as_deref() == target.tag(),
    };
    if !same_shape {
        return replace(live, target);
    }

    if let TargetNode::Text(text) = target {
        // matches() already failed, so the text differs
        live.set_text(text)?;
        tracing::trace!(message = "reconcile.text", node = %live.id());
        return Ok(());
    }

    sync_attributes(live, target)?;
    sync_value(live, target)?;
    sync_children(live, target)
}

fn replace(live: &LiveNode, target: &TargetNode) -> Result<()> {
    tracing::debug!(
        message = "reconcile.replace",
        node = %live.id(),
        old = live.tag().as_deref().unwrap_or("#text"),
        new = target.tag().unwrap_or("#text"),
    );
    let Some(parent) = live.parent() else {
        live.replace_content(target);
        return Ok(());
    };
    let index = parent
        .children()
        .iter()
        .position(|c| c.ptr_eq(live))
        .ok_or(Error::ChildIndex {
            index: usize::MAX,
            len: parent.child_count(),
        })?;
    parent.replace_child(index, LiveNode::materialize(target))?;
    Ok(())
}

/// Remove what the target lacks, then set only what differs.
fn sync_attributes(live: &LiveNode, target: &TargetNode) -> Result<()> {
    let current = live.attributes();
    for (name, _) in &current {
        if target.attribute(name).is_none() {
            live.remove_attribute(name)?;
        }
    }
    for (name, value) in target.attributes() {
        let existing = current.iter().find(|(n, _)| n == name).map(|(_, v)| v);
        if existing != Some(value) {
            live.set_attribute(name, value)?;
        }
    }
    Ok(())
}

/// Editable elements keep a live value that drifts from the declared
/// attribute; push the declared one through when they disagree.
fn sync_value(live: &LiveNode, target: &TargetNode) -> Result<()> {
    let declared = with_config(|cfg| {
        let tag = target.tag().unwrap_or_default();
        if cfg.is_editable(tag) {
            target.attribute(&cfg.value_attribute).map(str::to_owned)
        } else {
            None
        }
    });
    if let Some(value) = declared {
        if live.value().as_deref() != Some(value.as_str()) {
            live.set_value(&value)?;
        }
    }
    Ok(())
}

fn sync_children(live: &LiveNode, target: &TargetNode) -> Result<()> {
    let wanted = target.children();
    let existing = live.children();
    let shared = existing.len().min(wanted.len());

    for (child, t) in existing.iter().zip(wanted) {
        patch(child, t)?;
    }

    for t in &wanted[shared..] {
        live.append_child(LiveNode::materialize(t))?;
        tracing::trace!(message = "reconcile.append", parent = %live.id());
    }

    for index in (wanted.len()..existing.len()).rev() {
        live.remove_child(index)?;
        tracing::trace!(message = "reconcile.truncate", parent = %live.id(), index);
    }
    Ok(())
}
