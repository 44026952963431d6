// ============================================================================
// spark-reconcile - Constants
// Flag bits for sources, computations and their status
// ============================================================================

// =============================================================================
// NODE TYPE FLAGS
// =============================================================================

/// Observable cell (signal or graph trigger)
pub const SOURCE: u32 = 1 << 0;

/// Derived value: both a source and a reaction
pub const DERIVED: u32 = 1 << 1;

/// Computation runner (side-effecting reaction)
pub const COMPUTATION: u32 = 1 << 2;

// =============================================================================
// STATUS FLAGS
// =============================================================================

/// Up to date
pub const CLEAN: u32 = 1 << 10;

/// A dependency fired since the last run
pub const DIRTY: u32 = 1 << 11;

/// Reaction body is executing right now
pub const REACTION_IS_UPDATING: u32 = 1 << 13;

/// Disposed; never runs again
pub const DESTROYED: u32 = 1 << 14;

/// Has completed at least one run
pub const RAN: u32 = 1 << 16;

// =============================================================================
// STATUS MASK
// =============================================================================

/// Mask to clear the status bits (CLEAN, DIRTY)
pub const STATUS_MASK: u32 = !(DIRTY | CLEAN);

/// Panic message for a dependency cycle the engine gives up on
pub const CYCLE_MESSAGE: &str =
    "Maximum update depth exceeded. This can happen when a computation continuously triggers itself.";
