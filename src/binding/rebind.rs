// ============================================================================
// spark-reconcile - Rebind
// Resolve marker attributes in a live tree into attached listeners
// ============================================================================

use crate::binding::marker::MarkerToken;
use crate::binding::registry::BindingRegistry;
use crate::config::config;
use crate::error::Result;
use crate::tree::live::LiveNode;

/// Attach the callbacks behind every marker attribute under `root` and strip
/// the markers.
///
/// A node whose listener for the event is already the same callback is left
/// alone. A different callback replaces the old one. Marker-looking values
/// missing from `bindings` stay in place.
///
/// ```
/// use spark_reconcile::{rebind, BindingRegistry, Callback, Event, LiveNode, TargetNode};
///
/// let mut bindings = BindingRegistry::new();
/// let on_click = Callback::new(|_| {});
/// let live = LiveNode::materialize(
///     &TargetNode::element("button").attr("onclick", bindings.register(&on_click)),
/// );
///
/// rebind(&live, &bindings).unwrap();
/// assert_eq!(live.attribute("onclick"), None);
/// assert!(live.listener("click").unwrap().ptr_eq(&on_click));
/// ```
pub fn rebind(root: &LiveNode, bindings: &BindingRegistry) -> Result<()> {
    let cfg = config();
    for node in root.descendants() {
        if node.is_text() {
            continue;
        }
        for (attribute, value) in node.attributes() {
            let Some(callback) = bindings.resolve(&value) else {
                if MarkerToken::is_marker(&value) {
                    tracing::warn!(message = "rebind.unknown", node = %node.id(), attribute = %attribute, marker = %value);
                }
                continue;
            };
            let event = cfg.event_name(&attribute);

            match node.listener(event) {
                Some(current) if current.ptr_eq(callback) => {
                    tracing::trace!(message = "rebind.keep", node = %node.id(), event);
                }
                current => {
                    if current.is_some() {
                        node.detach_listener(event)?;
                        tracing::debug!(message = "rebind.detach", node = %node.id(), event);
                    }
                    node.attach_listener(event, callback.clone())?;
                    tracing::debug!(message = "rebind.attach", node = %node.id(), event);
                }
            }
            node.remove_attribute(&attribute)?;
        }
    }
    Ok(())
}

impl LiveNode {
    /// Method form of [`rebind`].
    pub fn rebind(&self, bindings: &BindingRegistry) -> Result<()> {
        rebind(self, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::registry::{Callback, Event};
    use crate::tree::target::TargetNode;
    use std::cell::Cell;
    use std::rc::Rc;
    use tracing_test::traced_test;

    fn button(bindings: &mut BindingRegistry, cb: &Callback) -> TargetNode {
        TargetNode::element("button")
            .attr("class", "btn")
            .attr("onclick", bindings.register(cb))
    }

    #[test]
    fn attaches_and_strips() {
        let hits = Rc::new(Cell::new(0));
        let cb = Callback::new({
            let hits = hits.clone();
            move |_| hits.set(hits.get() + 1)
        });
        let mut bindings = BindingRegistry::new();
        let live = LiveNode::materialize(
            &TargetNode::element("div").child(button(&mut bindings, &cb)),
        );

        live.rebind(&bindings).unwrap();
        let btn = live.child(0).unwrap();
        assert_eq!(btn.attributes(), vec![("class".into(), "btn".into())]);
        assert!(btn.dispatch(&Event::new("click")));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    #[traced_test]
    fn same_callback_is_kept() {
        let cb = Callback::new(|_| {});
        let mut first = BindingRegistry::new();
        let live = LiveNode::materialize(&button(&mut first, &cb));
        rebind(&live, &first).unwrap();

        // Next render: fresh marker, same callback
        let mut second = BindingRegistry::new();
        live.reconcile(&button(&mut second, &cb)).unwrap();
        let before = live.mutation_count();
        rebind(&live, &second).unwrap();

        // Only the marker strip; no detach/attach
        assert_eq!(live.mutation_count(), before + 1);
        assert!(live.listener("click").unwrap().ptr_eq(&cb));
        assert!(logs_contain("rebind.keep"));
    }

    #[test]
    fn different_callback_is_swapped() {
        let old = Callback::new(|_| {});
        let new = Callback::new(|_| {});
        let mut first = BindingRegistry::new();
        let live = LiveNode::materialize(&button(&mut first, &old));
        rebind(&live, &first).unwrap();

        let mut second = BindingRegistry::new();
        live.reconcile(&button(&mut second, &new)).unwrap();
        rebind(&live, &second).unwrap();

        assert!(live.listener("click").unwrap().ptr_eq(&new));
        assert_eq!(live.listener_events(), vec!["click".to_string()]);
    }

    #[test]
    #[traced_test]
    fn unknown_marker_is_left_in_place() {
        let stray = MarkerToken::next();
        let live = LiveNode::materialize(
            &TargetNode::element("button").attr("onclick", stray.clone()),
        );
        rebind(&live, &BindingRegistry::new()).unwrap();

        assert_eq!(live.attribute("onclick"), Some(stray.to_string()));
        assert!(live.listener("click").is_none());
        assert!(logs_contain("rebind.unknown"));
    }

    #[test]
    fn registered_tokens_resolve_after_a_prefix_change() {
        let cb = Callback::new(|_| {});
        let mut bindings = BindingRegistry::new();
        let live = LiveNode::materialize(&button(&mut bindings, &cb));

        let previous = crate::config::configure(
            crate::config::EngineConfig::default().with_marker_prefix("@other-"),
        );
        let result = rebind(&live, &bindings);
        crate::config::configure(previous);

        result.unwrap();
        assert!(live.listener("click").unwrap().ptr_eq(&cb));
        assert_eq!(live.attribute("onclick"), None);
    }

    #[test]
    fn plain_attributes_are_ignored() {
        let live = LiveNode::materialize(&TargetNode::element("a").attr("onclick", "go()"));
        rebind(&live, &BindingRegistry::new()).unwrap();
        assert_eq!(live.mutation_count(), 0);
    }
}
