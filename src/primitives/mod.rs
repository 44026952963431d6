// ============================================================================
// spark-reconcile - Primitives Module
// Observable cells, computations and derived values
// ============================================================================

pub mod computation;
pub mod derived;
pub mod signal;

pub use computation::{create_computation, Computation, ComputationInner};
pub use derived::{create_derived, create_derived_with_equals, Derived, DerivedInner};
pub use signal::{signal, signal_with_equals, Signal};
