// ============================================================================
// spark-reconcile - Binding Module
// Marker tokens, the registry that resolves them, and rebind
// ============================================================================

pub mod marker;
pub mod rebind;
pub mod registry;

pub use marker::MarkerToken;
pub use rebind::rebind;
pub use registry::{Binding, BindingRegistry, Callback, Event, Rendered, Template};
