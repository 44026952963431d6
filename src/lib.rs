// ============================================================================
// spark-reconcile - Fine-grained reactivity driving in-place tree reconciliation
// ============================================================================
//
// Cells and reactive stores record which computations read them. Writes re-run
// exactly those computations. A mounted view is one such computation: it
// renders a target tree, patches the live tree positionally, and rebinds
// marker attributes to event callbacks.
// ============================================================================

//! Reactive state plus a positional tree reconciler.
//!
//! ```
//! use spark_reconcile::{mount, wrap, Rendered, TargetNode, Value};
//!
//! let state = wrap(&Value::map([("count", Value::from(0))])).unwrap();
//! let view = mount({
//!     let state = state.clone();
//!     move || {
//!         let count = state.get("count").unwrap().to_text();
//!         Rendered::from(TargetNode::element("div").child(TargetNode::element("span").child(count.into())))
//!     }
//! })
//! .unwrap();
//!
//! let span = view.root().child(0).unwrap();
//! state.set("count", 1).unwrap();
//!
//! assert_eq!(view.root().to_string(), "<div><span>1</span></div>");
//! assert!(view.root().child(0).unwrap().ptr_eq(&span));
//! ```

#[macro_use]
mod macros;

pub mod binding;
pub mod config;
pub mod core;
pub mod error;
pub mod primitives;
pub mod reactivity;
pub mod store;
pub mod tree;
pub mod view;

// Engine internals, for collaborators building their own primitives
pub use core::constants;
pub use core::context::{
    computation_depth, is_batching, is_tracking, is_untracking, read_version, with_context,
    write_version, ReactiveContext,
};
pub use core::types::{default_equals, AnyReaction, AnySource, EqualsFn, SourceInner};

// Reactive primitives
pub use primitives::computation::{create_computation, Computation};
pub use primitives::derived::{create_derived, create_derived_with_equals, Derived};
pub use primitives::signal::{signal, signal_with_equals, Signal};
pub use reactivity::batching::{batch, flush_sync, peek, untrack};
pub use reactivity::equality::{
    always_equals, equals, never_equals, safe_equals_f64, safe_not_equal_f64,
};
pub use reactivity::graph::{Key, OwnerId};

// Stores
pub use store::{wrap, Compound, Reactive, Shape, Tracked, Value};

// Trees
pub use tree::{reconcile, LiveNode, Mutation, NodeId, ObserverId, TargetNode};

// Bindings and views
pub use binding::{
    rebind, Binding, BindingRegistry, Callback, Event, MarkerToken, Rendered, Template,
};
pub use view::{mount, mount_onto, View};

pub use config::{config, configure, with_config, EngineConfig};
pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn flag_bits_are_distinct() {
        assert_eq!(constants::CLEAN & constants::DIRTY, 0);
        assert_eq!(constants::SOURCE & constants::DERIVED, 0);
        assert_eq!(constants::DERIVED & constants::COMPUTATION, 0);
    }

    #[test]
    fn heterogeneous_sources() {
        let sources: Vec<Rc<dyn AnySource>> = vec![
            signal(1).as_any_source(),
            signal(String::from("x")).as_any_source(),
            create_derived(|| 2.5).as_any_source(),
        ];
        assert!(sources[0].flags() & constants::SOURCE != 0);
        assert!(sources[2].is_derived());
    }

    #[test]
    fn store_drives_reconcile() {
        let items = wrap(&Value::list(["a", "b", "c"])).unwrap();
        let renders = Rc::new(Cell::new(0));
        let view = mount({
            let items = items.clone();
            let renders = renders.clone();
            move || {
                renders.set(renders.get() + 1);
                let lis = (0..items.len()).map(|i| {
                    let text = items.get(i).map(|t| t.to_text()).unwrap_or_default();
                    TargetNode::element("li").child(text.into())
                });
                Rendered::from(TargetNode::element("ul").children_from(lis))
            }
        })
        .unwrap();

        let before = view.root().children();
        items.set(1, "x").unwrap();
        let after = view.root().children();

        assert_eq!(renders.get(), 2);
        assert!(before.iter().zip(&after).all(|(a, b)| a.ptr_eq(b)));
        assert_eq!(view.root().to_string(), "<ul><li>a</li><li>x</li><li>c</li></ul>");
    }
}
