use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::OrderStatus;

// ============================================================================
// Domain Models
// ============================================================================

/// One row of the orders table. `status` is the single canonical mutable
/// field; the `items` payload is opaque to the transition engine.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderRecord {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub status: OrderStatus,
    pub items: serde_json::Value,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One committed status change, append-only. `restaurant_id` is denormalized
/// from the order so the trail can be queried per tenant without a join.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TransitionEvent {
    pub id: Uuid,
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub reason: Option<String>,
    pub actor: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn record(
        order: &OrderRecord,
        from: OrderStatus,
        to: OrderStatus,
        reason: Option<String>,
        actor: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            restaurant_id: order.restaurant_id,
            from_status: from,
            to_status: to,
            reason,
            actor,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Staff Roles
// ============================================================================

/// Role a staff member holds on one restaurant. Order mutation requires
/// editor or above; viewer is read-only dashboard access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Viewer,
    Editor,
    Admin,
    Owner,
}

impl StaffRole {
    pub fn parse(raw: &str) -> Option<StaffRole> {
        match raw {
            "viewer" => Some(StaffRole::Viewer),
            "editor" => Some(StaffRole::Editor),
            "admin" => Some(StaffRole::Admin),
            "owner" => Some(StaffRole::Owner),
            _ => None,
        }
    }

    pub fn can_edit_orders(&self) -> bool {
        matches!(self, StaffRole::Editor | StaffRole::Admin | StaffRole::Owner)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
