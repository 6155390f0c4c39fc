use super::status::OrderStatus;
use crate::store::StoreError;

// ============================================================================
// Transition Errors - Closed Result Taxonomy
// ============================================================================
//
// Every way a transition attempt can fail, as one closed enum. The HTTP
// adapter maps variants to status codes; the executor and its tests never
// see transport concerns.
//
// ============================================================================

/// Upper bound on the operator-supplied free-text reason. The content is
/// opaque payload; only the length is checked.
pub const MAX_REASON_LEN: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("order id is not a valid UUID")]
    InvalidOrderId,

    #[error("unknown order status: {0:?}")]
    InvalidStatus(String),

    #[error("reason is longer than 500 characters")]
    ReasonTooLong,

    /// No such order, or the caller has no editor-or-above role on the
    /// owning restaurant. Deliberately one variant: callers cannot tell a
    /// foreign tenant's order apart from a nonexistent one.
    #[error("order not found or not accessible")]
    Forbidden,

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        allowed: &'static [OrderStatus],
    },

    /// The conditional write matched zero rows: another request committed a
    /// transition after our read. Normal under concurrency; the caller must
    /// re-decide against `current`.
    #[error("order status changed concurrently, current status is {current}")]
    Conflict { current: OrderStatus },

    #[error("storage rejected the status update")]
    WriteDenied,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TransitionError {
    /// Label used for metrics and structured log records.
    pub fn outcome(&self) -> &'static str {
        match self {
            TransitionError::InvalidOrderId => "invalid_order_id",
            TransitionError::InvalidStatus(_) => "invalid_status",
            TransitionError::ReasonTooLong => "reason_too_long",
            TransitionError::Forbidden => "forbidden",
            TransitionError::InvalidTransition { .. } => "invalid_transition",
            TransitionError::Conflict { .. } => "conflict",
            TransitionError::WriteDenied => "write_denied",
            TransitionError::Internal(_) => "internal",
        }
    }

    /// Storage failures on the authorize/read path fail closed: a denied
    /// read is indistinguishable from a missing order.
    pub(crate) fn from_read(err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied => TransitionError::Forbidden,
            other => TransitionError::Internal(anyhow::Error::new(other)),
        }
    }

    /// Storage failures on the conditional-write path. A rejected write is
    /// reported distinctly from infrastructure failure.
    pub(crate) fn from_write(err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied => TransitionError::WriteDenied,
            other => TransitionError::Internal(anyhow::Error::new(other)),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
