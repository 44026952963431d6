// ============================================================================
// spark-reconcile - Views
// A template kept in sync with a live tree by a computation
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::binding::rebind::rebind;
use crate::binding::registry::{Rendered, Template};
use crate::error::{Error, Result};
use crate::primitives::computation::{create_computation, Computation};
use crate::reactivity::batching::untrack;
use crate::tree::live::LiveNode;
use crate::tree::reconcile::reconcile;

/// A mounted template.
///
/// Every cell the template reads while rendering is a dependency: writing one
/// re-renders, reconciles the live root against the fresh tree and rebinds
/// its markers. Dropping the `View` (or calling [`dispose`](Self::dispose))
/// stops the updates; the live tree stays as it was last left.
pub struct View {
    root: LiveNode,
    renders: Rc<Cell<u64>>,
    computation: Computation,
}

/// Render `template` into a fresh live tree and keep it up to date.
///
/// ```
/// use spark_reconcile::{mount, signal, Rendered, TargetNode};
///
/// let count = signal(0);
/// let view = mount({
///     let count = count.clone();
///     move || Rendered::from(TargetNode::element("p").child(count.get().to_string().into()))
/// })
/// .unwrap();
///
/// count.set(5);
/// assert_eq!(view.root().to_string(), "<p>5</p>");
/// ```
pub fn mount<T: Template + 'static>(template: T) -> Result<View> {
    mount_with(None, template)
}

/// Like [`mount`], but adopt an existing live tree: the first render is
/// reconciled into `root` instead of materialized from scratch.
pub fn mount_onto<T: Template + 'static>(root: &LiveNode, template: T) -> Result<View> {
    mount_with(Some(root.clone()), template)
}

fn mount_with<T: Template + 'static>(existing: Option<LiveNode>, template: T) -> Result<View> {
    let slot: Rc<RefCell<Option<LiveNode>>> = Rc::new(RefCell::new(existing));
    // Errors raised while `mount` is still on the stack are returned from it;
    // afterwards there is no caller left to hand them to.
    let failure: Rc<RefCell<Option<Error>>> = Rc::new(RefCell::new(None));
    let mounting = Rc::new(Cell::new(true));
    let renders = Rc::new(Cell::new(0u64));

    let computation = create_computation({
        let slot = slot.clone();
        let failure = failure.clone();
        let mounting = mounting.clone();
        let renders = renders.clone();
        move || {
            let Rendered { tree, bindings } = template.render();
            renders.set(renders.get() + 1);

            let outcome = untrack(|| {
                let current = slot.borrow().clone();
                let root = match current {
                    Some(root) => {
                        reconcile(&root, Some(&tree))?;
                        root
                    }
                    None => {
                        let root = LiveNode::materialize(&tree);
                        *slot.borrow_mut() = Some(root.clone());
                        root
                    }
                };
                rebind(&root, &bindings)
            });

            if let Err(err) = outcome {
                tracing::error!(message = "view.update", render = renders.get(), error = %err);
                if mounting.get() {
                    failure.borrow_mut().get_or_insert(err);
                }
            }
        }
    });
    mounting.set(false);

    if let Some(err) = failure.borrow_mut().take() {
        computation.dispose();
        return Err(err);
    }
    let root = slot.borrow().clone().ok_or(Error::MissingTarget)?;
    Ok(View {
        root,
        renders,
        computation,
    })
}

impl View {
    /// Root of the live tree
    pub fn root(&self) -> &LiveNode {
        &self.root
    }

    /// Completed renders, the first one included.
    pub fn render_count(&self) -> u64 {
        self.renders.get()
    }

    /// Stop reacting to writes.
    pub fn dispose(&self) {
        self.computation.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.computation.is_disposed()
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("root", &self.root)
            .field("renders", &self.renders.get())
            .finish()
    }
}
