use super::status::OrderStatus;

// ============================================================================
// Transition Table - Legal Status Edges
// ============================================================================
//
// The single source of truth for which status changes are legal. Every
// caller (HTTP layer, batch jobs, future channels) consults this table;
// it is never duplicated or re-derived elsewhere.
//
// ============================================================================

/// Statuses reachable directly from `from`. Terminal statuses return an
/// empty slice. There are no self-edges: re-applying the current status is
/// an invalid transition, not a no-op.
pub fn allowed_targets(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;

    match from {
        Pending => &[Paid, Cancelled, Expired],
        Paid => &[Preparing, Cancelled],
        Preparing => &[Ready, Cancelled],
        Ready => &[Completed],
        Completed | Cancelled | Expired => &[],
    }
}

/// Pure edge lookup: is `from -> to` in the table?
pub fn is_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// A terminal status has no outgoing edges.
#[allow(dead_code)]
pub fn is_terminal(status: OrderStatus) -> bool {
    allowed_targets(status).is_empty()
}

// ============================================================================
// Unit Tests
// ============================================================================
