use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use async_trait::async_trait;

use crate::domain::order::OrderStatus;
use crate::models::{OrderRecord, StaffRole};

use super::{OrderStore, StaffOrderView, StoreError};

// ============================================================================
// Postgres Order Store
// ============================================================================
//
// Race safety is enforced here, not with in-process locks: the status update
// is a single UPDATE whose predicate pins the previously observed status.
// Requests for the same order from any number of processes interleave safely
// because the database applies the predicate and the write atomically.
//
// ============================================================================

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS orders (
    id UUID PRIMARY KEY,
    restaurant_id UUID NOT NULL,
    status TEXT NOT NULL,
    items TEXT NOT NULL,
    placed_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS orders_restaurant_idx ON orders (restaurant_id);

CREATE TABLE IF NOT EXISTS transition_events (
    id UUID PRIMARY KEY,
    order_id UUID NOT NULL,
    restaurant_id UUID NOT NULL,
    from_status TEXT NOT NULL,
    to_status TEXT NOT NULL,
    reason TEXT,
    actor UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS transition_events_order_idx
    ON transition_events (order_id, created_at);

CREATE TABLE IF NOT EXISTS staff_members (
    restaurant_id UUID NOT NULL,
    user_id UUID NOT NULL,
    role TEXT NOT NULL,
    PRIMARY KEY (restaurant_id, user_id)
);

CREATE TABLE IF NOT EXISTS staff_sessions (
    token TEXT PRIMARY KEY,
    user_id UUID NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL
);
";

const CREATE_ORDER_SQL: &str = "INSERT INTO orders \
     (id, restaurant_id, status, items, placed_at, updated_at) \
     VALUES ($1, $2, $3, $4, now(), now()) \
     RETURNING id, restaurant_id, status, items, placed_at, updated_at";

const FIND_FOR_STAFF_SQL: &str = "SELECT o.id, o.restaurant_id, o.status, o.items, o.placed_at, o.updated_at, m.role \
     FROM orders o \
     JOIN staff_members m ON m.restaurant_id = o.restaurant_id \
     WHERE o.id = $1 AND m.user_id = $2";

const CAS_UPDATE_SQL: &str = "UPDATE orders SET status = $1, updated_at = now() \
     WHERE id = $2 AND restaurant_id = $3 AND status = $4 \
     RETURNING id, restaurant_id, status, items, placed_at, updated_at";

const CURRENT_STATUS_SQL: &str = "SELECT status FROM orders WHERE id = $1";

/// Create the tables this service owns if they are missing. Mirrors what a
/// fresh deployment needs; existing tables are left untouched.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .map_err(map_db_err)?;

    tracing::info!("Database schema ensured");
    Ok(())
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_order(
        &self,
        restaurant_id: Uuid,
        items: serde_json::Value,
    ) -> Result<OrderRecord, StoreError> {
        let row = sqlx::query(CREATE_ORDER_SQL)
            .bind(Uuid::new_v4())
            .bind(restaurant_id)
            .bind(OrderStatus::Pending.as_str())
            .bind(items.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

        row_to_order(&row)
    }

    async fn find_for_staff(
        &self,
        order_id: Uuid,
        staff_id: Uuid,
    ) -> Result<Option<StaffOrderView>, StoreError> {
        let row = sqlx::query(FIND_FOR_STAFF_SQL)
            .bind(order_id)
            .bind(staff_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role_raw: String = row.try_get("role").map_err(StoreError::Database)?;
        let Some(role) = StaffRole::parse(&role_raw) else {
            // Unknown role rows deny access rather than guessing a level.
            tracing::warn!(order_id = %order_id, role = %role_raw, "unrecognized staff role, denying access");
            return Ok(None);
        };

        Ok(Some(StaffOrderView {
            order: row_to_order(&row)?,
            role,
        }))
    }

    async fn compare_and_set_status(
        &self,
        order_id: Uuid,
        restaurant_id: Uuid,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let row = sqlx::query(CAS_UPDATE_SQL)
            .bind(target.as_str())
            .bind(order_id)
            .bind(restaurant_id)
            .bind(expected.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(|row| row_to_order(&row)).transpose()
    }

    async fn current_status(&self, order_id: Uuid) -> Result<Option<OrderStatus>, StoreError> {
        let row = sqlx::query(CURRENT_STATUS_SQL)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("status").map_err(StoreError::Database)?;
        let status = OrderStatus::parse(&raw).ok_or(StoreError::CorruptStatus(raw))?;
        Ok(Some(status))
    }
}

// ============================================================================
// Row Mapping
// ============================================================================

fn row_to_order(row: &sqlx::postgres::PgRow) -> Result<OrderRecord, StoreError> {
    let status_raw: String = row.try_get("status").map_err(StoreError::Database)?;
    let status = OrderStatus::parse(&status_raw).ok_or(StoreError::CorruptStatus(status_raw))?;

    let items_raw: String = row.try_get("items").map_err(StoreError::Database)?;
    let items = serde_json::from_str(&items_raw).unwrap_or(serde_json::Value::Null);

    Ok(OrderRecord {
        id: row.try_get("id").map_err(StoreError::Database)?,
        restaurant_id: row.try_get("restaurant_id").map_err(StoreError::Database)?,
        status,
        items,
        placed_at: row.try_get("placed_at").map_err(StoreError::Database)?,
        updated_at: row.try_get("updated_at").map_err(StoreError::Database)?,
    })
}

/// Postgres code 42501 is insufficient_privilege: the data layer refused the
/// statement for this role/row. Everything else stays a database error.
fn map_db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("42501") {
            return StoreError::PermissionDenied;
        }
    }
    StoreError::Database(err)
}

// ============================================================================
// Unit Tests
// ============================================================================
