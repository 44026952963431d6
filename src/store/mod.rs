// ============================================================================
// spark-reconcile - Store Module
// Nested data made observable through the dependency graph
// ============================================================================

pub mod reactive;
pub mod value;

pub use reactive::{wrap, Reactive, Tracked};
pub use value::{Compound, Shape, Value};
