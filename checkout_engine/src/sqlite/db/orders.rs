use chrono::{DateTime, Utc};
use log::trace;
use serde_json::{Map, Value};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{Order, OrderCode, OrderPatch, OrderStatus},
    traits::OrderStoreError,
};

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    order_code: i64,
    amount: i64,
    description: String,
    status: String,
    status_reason: Option<String>,
    checkout_url: Option<String>,
    payment_link_id: Option<String>,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    webhook_received_at: Option<DateTime<Utc>>,
    extra: String,
}

impl TryFrom<OrderRow> for Order {
    type Error = OrderStoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| OrderStoreError::CorruptRecord(row.order_code.to_string(), e);
        let order_code = OrderCode::new(row.order_code).map_err(|e| corrupt(e.to_string()))?;
        let extra = serde_json::from_str::<Map<String, Value>>(&row.extra).map_err(|e| corrupt(e.to_string()))?;
        Ok(Order {
            order_code,
            amount: row.amount,
            description: row.description,
            status: OrderStatus::from_parts(&row.status, row.status_reason),
            checkout_url: row.checkout_url,
            payment_link_id: row.payment_link_id,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            webhook_received_at: row.webhook_received_at,
            extra,
        })
    }
}

/// Merges the patch into the order record in a single statement, creating the record if necessary.
///
/// `json_patch` drops keys whose patch value is `null`, which gives passthrough fields the same key-by-key merge
/// semantics as the in-memory store.
pub async fn upsert_merge(
    patch: OrderPatch,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderStoreError> {
    let code = patch.order_code;
    let status = patch.status.as_ref().map(|s| s.as_str());
    let status_reason = patch.status.as_ref().and_then(|s| s.reason().map(String::from));
    let extra = Value::Object(patch.extra).to_string();
    let row: OrderRow = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_code,
                amount,
                description,
                status,
                status_reason,
                checkout_url,
                payment_link_id,
                transaction_id,
                created_at,
                updated_at,
                webhook_received_at,
                extra
            ) VALUES (
                $1, COALESCE($2, 0), COALESCE($3, ''), COALESCE($4, 'PENDING'), $5, $6, $7, $8,
                COALESCE($9, $10), $10, $11, json_patch('{}', json($12))
            )
            ON CONFLICT(order_code) DO UPDATE SET
                amount = COALESCE($2, orders.amount),
                description = COALESCE($3, orders.description),
                status = COALESCE($4, orders.status),
                status_reason = CASE WHEN $4 IS NULL THEN orders.status_reason ELSE $5 END,
                checkout_url = COALESCE(orders.checkout_url, $6),
                payment_link_id = COALESCE(orders.payment_link_id, $7),
                transaction_id = COALESCE($8, orders.transaction_id),
                updated_at = $10,
                webhook_received_at = COALESCE($11, orders.webhook_received_at),
                extra = json_patch(orders.extra, json($12))
            RETURNING *;
        "#,
    )
    .bind(code.value())
    .bind(patch.amount)
    .bind(patch.description)
    .bind(status)
    .bind(status_reason)
    .bind(patch.checkout_url)
    .bind(patch.payment_link_id)
    .bind(patch.transaction_id)
    .bind(patch.created_at)
    .bind(now)
    .bind(patch.webhook_received_at)
    .bind(extra)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Order {code} upserted. Status is now {}", row.status);
    Order::try_from(row)
}

/// Returns the order with the given code, if it exists.
pub async fn fetch_order(code: OrderCode, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderStoreError> {
    let row: Option<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE order_code = $1").bind(code.value()).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

/// Returns every order, newest first.
pub async fn fetch_all_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, OrderStoreError> {
    let rows: Vec<OrderRow> =
        sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, order_code DESC").fetch_all(conn).await?;
    rows.into_iter().map(Order::try_from).collect()
}

pub async fn order_exists(code: OrderCode, conn: &mut SqliteConnection) -> Result<bool, OrderStoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_code = $1")
        .bind(code.value())
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}
