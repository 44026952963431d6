// ============================================================================
// spark-reconcile - Core Module
// Fundamental types, traits, and context for the reactive engine
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

pub use constants::*;
pub use context::{
    computation_depth, is_batching, is_tracking, is_untracking, read_version, with_context,
    write_version, ReactiveContext,
};
pub use types::{default_equals, AnyReaction, AnySource, EqualsFn, SourceInner};
