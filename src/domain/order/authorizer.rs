use std::sync::Arc;
use uuid::Uuid;

use crate::models::OrderRecord;
use crate::store::OrderStore;

use super::errors::TransitionError;

// ============================================================================
// Transition Authorizer
// ============================================================================
//
// Answers "may this staff member mutate this order, and what is its status
// right now?" in one tenant-scoped read. The read and the role check fail
// closed together: a foreign tenant's order, a nonexistent order, and a
// viewer-only membership all come back as the same Forbidden.
//
// ============================================================================

pub struct TransitionAuthorizer {
    store: Arc<dyn OrderStore>,
}

impl TransitionAuthorizer {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Resolve the order and confirm the caller holds editor-or-above on the
    /// owning restaurant. Whether the requested transition is legal is the
    /// transition table's question, not this one's.
    pub async fn authorize_mutation(
        &self,
        order_id: Uuid,
        staff_id: Uuid,
    ) -> Result<OrderRecord, TransitionError> {
        let view = self
            .store
            .find_for_staff(order_id, staff_id)
            .await
            .map_err(TransitionError::from_read)?;

        match view {
            Some(view) if view.role.can_edit_orders() => Ok(view.order),
            _ => Err(TransitionError::Forbidden),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
