use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::OrderStatus;
use crate::models::{OrderRecord, StaffRole, TransitionEvent};

pub mod audit;
pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use audit::PgAuditLog;
pub use postgres::{ensure_schema, PgOrderStore};

// ============================================================================
// Storage Ports
// ============================================================================
//
// The executor talks to storage only through these traits, so the state
// machine is unit-testable without a database. The Postgres implementations
// live in this module; tests use the in-memory ones.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage layer refused the statement for this principal/row.
    #[error("storage rejected the statement")]
    PermissionDenied,

    /// A stored status string is outside the known set. Data written by a
    /// newer or broken deployment; surfaced as an internal failure.
    #[error("stored order status {0:?} is not recognized")]
    CorruptStatus(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// An order together with the caller's role on its restaurant, resolved in
/// one read. `None` from the lookup means "no such order" and "no access"
/// alike.
#[derive(Debug, Clone)]
pub struct StaffOrderView {
    pub order: OrderRecord,
    pub role: StaffRole,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order with initial status `pending`. Called by the
    /// checkout collaborator, not by the transition engine.
    async fn create_order(
        &self,
        restaurant_id: Uuid,
        items: serde_json::Value,
    ) -> Result<OrderRecord, StoreError>;

    /// Tenant-scoped read: the order joined with the caller's staff
    /// membership on the owning restaurant. Returns `Ok(None)` when the
    /// order does not exist or the caller is not staff there.
    async fn find_for_staff(
        &self,
        order_id: Uuid,
        staff_id: Uuid,
    ) -> Result<Option<StaffOrderView>, StoreError>;

    /// The conditional write at the heart of the engine: set `status` to
    /// `target` only if the row still holds `expected`. One indivisible
    /// statement; `Ok(None)` means zero rows matched (lost race).
    async fn compare_and_set_status(
        &self,
        order_id: Uuid,
        restaurant_id: Uuid,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<Option<OrderRecord>, StoreError>;

    /// Re-read after a lost race, to report what the status actually is now.
    async fn current_status(&self, order_id: Uuid) -> Result<Option<OrderStatus>, StoreError>;
}

#[async_trait]
pub trait TransitionAudit: Send + Sync {
    /// Append one immutable event. Never updates or deletes.
    async fn append(&self, event: &TransitionEvent) -> Result<(), StoreError>;

    /// Events for one order, oldest first. Callers authorize access to the
    /// order before asking.
    async fn for_order(&self, order_id: Uuid) -> Result<Vec<TransitionEvent>, StoreError>;
}
