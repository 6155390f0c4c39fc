use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::order::OrderStatus;
use crate::models::{OrderRecord, StaffRole, TransitionEvent};

use super::{OrderStore, StaffOrderView, StoreError, TransitionAudit};

// ============================================================================
// In-Memory Store - Test Double
// ============================================================================
//
// Implements the storage ports over a mutex-guarded map so the executor's
// concurrency semantics can be exercised without a database. The mutex makes
// compare_and_set_status exactly as atomic as the Postgres UPDATE it stands
// in for.
//
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    orders: Mutex<HashMap<Uuid, OrderRecord>>,
    staff: Mutex<HashMap<(Uuid, Uuid), StaffRole>>,
    // Knobs for pinning executor branches deterministically.
    stale_read_status: Mutex<Option<OrderStatus>>,
    deny_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_staff(&self, restaurant_id: Uuid, user_id: Uuid, role: StaffRole) {
        self.staff
            .lock()
            .unwrap()
            .insert((restaurant_id, user_id), role);
    }

    pub fn insert_order(&self, restaurant_id: Uuid, status: OrderStatus) -> OrderRecord {
        let now = Utc::now();
        let order = OrderRecord {
            id: Uuid::new_v4(),
            restaurant_id,
            status,
            items: serde_json::json!([]),
            placed_at: now,
            updated_at: now,
        };
        self.orders.lock().unwrap().insert(order.id, order.clone());
        order
    }

    /// Make every subsequent authorize-read report this status regardless of
    /// the stored row, simulating a reader whose snapshot went stale before
    /// its conditional write.
    pub fn force_read_status(&self, status: OrderStatus) {
        *self.stale_read_status.lock().unwrap() = Some(status);
    }

    pub fn deny_writes(&self) {
        self.deny_writes.store(true, Ordering::SeqCst);
    }

    pub fn status_of(&self, order_id: Uuid) -> Option<OrderStatus> {
        self.orders.lock().unwrap().get(&order_id).map(|o| o.status)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(
        &self,
        restaurant_id: Uuid,
        items: serde_json::Value,
    ) -> Result<OrderRecord, StoreError> {
        let now = Utc::now();
        let order = OrderRecord {
            id: Uuid::new_v4(),
            restaurant_id,
            status: OrderStatus::Pending,
            items,
            placed_at: now,
            updated_at: now,
        };
        self.orders.lock().unwrap().insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_for_staff(
        &self,
        order_id: Uuid,
        staff_id: Uuid,
    ) -> Result<Option<StaffOrderView>, StoreError> {
        let orders = self.orders.lock().unwrap();
        let Some(order) = orders.get(&order_id) else {
            return Ok(None);
        };

        let staff = self.staff.lock().unwrap();
        let Some(role) = staff.get(&(order.restaurant_id, staff_id)).copied() else {
            return Ok(None);
        };

        let mut order = order.clone();
        if let Some(stale) = *self.stale_read_status.lock().unwrap() {
            order.status = stale;
        }

        Ok(Some(StaffOrderView { order, role }))
    }

    async fn compare_and_set_status(
        &self,
        order_id: Uuid,
        restaurant_id: Uuid,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<Option<OrderRecord>, StoreError> {
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied);
        }

        let mut orders = self.orders.lock().unwrap();
        match orders.get_mut(&order_id) {
            Some(order) if order.restaurant_id == restaurant_id && order.status == expected => {
                order.status = target;
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn current_status(&self, order_id: Uuid) -> Result<Option<OrderStatus>, StoreError> {
        Ok(self.status_of(order_id))
    }
}

// ============================================================================
// In-Memory Audit Log
// ============================================================================

#[derive(Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<TransitionEvent>>,
    fail_appends: AtomicBool,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends(&self) {
        self.fail_appends.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransitionAudit for MemoryAudit {
    async fn append(&self, event: &TransitionEvent) -> Result<(), StoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn for_order(&self, order_id: Uuid) -> Result<Vec<TransitionEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect())
    }
}
