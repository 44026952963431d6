// ============================================================================
// spark-reconcile - Reactivity Module
// Dependency tracking, write propagation, batching and the store graph
// ============================================================================

pub mod batching;
pub mod equality;
pub mod graph;
pub mod tracking;

pub use tracking::{
    flush_pending_reactions, is_dirty, mark_reactions, notify_write, remove_reactions,
    run_tracked, set_signal_status, track_read,
};

pub use batching::{batch, flush_sync, peek, untrack};

pub use graph::{Key, OwnerId};
