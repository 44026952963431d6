// ============================================================================
// spark-reconcile - Tree Module
// Target descriptions, live trees, and the reconciler between them
// ============================================================================

pub mod live;
pub mod reconcile;
pub mod target;

pub use live::{LiveNode, Mutation, NodeId, ObserverId};
pub use reconcile::reconcile;
pub use target::{TargetElement, TargetNode};
