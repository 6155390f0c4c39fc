use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use async_trait::async_trait;

use crate::domain::order::OrderStatus;
use crate::models::TransitionEvent;

use super::{StoreError, TransitionAudit};

// ============================================================================
// Transition Audit Log - Append-Only Event Trail
// ============================================================================
//
// One row per committed status change. Rows are inserted exactly once and
// never updated or deleted by this service; retention tooling owns deletion.
//
// ============================================================================

const APPEND_SQL: &str = "INSERT INTO transition_events \
     (id, order_id, restaurant_id, from_status, to_status, reason, actor, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

const FOR_ORDER_SQL: &str = "SELECT id, order_id, restaurant_id, from_status, to_status, reason, actor, created_at \
     FROM transition_events \
     WHERE order_id = $1 \
     ORDER BY created_at ASC";

pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransitionAudit for PgAuditLog {
    async fn append(&self, event: &TransitionEvent) -> Result<(), StoreError> {
        sqlx::query(APPEND_SQL)
            .bind(event.id)
            .bind(event.order_id)
            .bind(event.restaurant_id)
            .bind(event.from_status.as_str())
            .bind(event.to_status.as_str())
            .bind(event.reason.as_deref())
            .bind(event.actor)
            .bind(event.created_at)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            event_id = %event.id,
            order_id = %event.order_id,
            from = %event.from_status,
            to = %event.to_status,
            "Appended transition event"
        );

        Ok(())
    }

    async fn for_order(&self, order_id: Uuid) -> Result<Vec<TransitionEvent>, StoreError> {
        let rows = sqlx::query(FOR_ORDER_SQL)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            events.push(row_to_event(&row)?);
        }

        Ok(events)
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<TransitionEvent, StoreError> {
    let from_raw: String = row.try_get("from_status").map_err(StoreError::Database)?;
    let to_raw: String = row.try_get("to_status").map_err(StoreError::Database)?;

    let from_status = OrderStatus::parse(&from_raw).ok_or(StoreError::CorruptStatus(from_raw))?;
    let to_status = OrderStatus::parse(&to_raw).ok_or(StoreError::CorruptStatus(to_raw))?;

    Ok(TransitionEvent {
        id: row.try_get("id").map_err(StoreError::Database)?,
        order_id: row.try_get("order_id").map_err(StoreError::Database)?,
        restaurant_id: row.try_get("restaurant_id").map_err(StoreError::Database)?,
        from_status,
        to_status,
        reason: row.try_get("reason").map_err(StoreError::Database)?,
        actor: row.try_get("actor").map_err(StoreError::Database)?,
        created_at: row.try_get("created_at").map_err(StoreError::Database)?,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
