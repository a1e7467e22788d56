use thiserror::Error;

use crate::db_types::{Order, OrderCode, OrderPatch};

/// Persistence for order records.
///
/// Implementations must apply each [`OrderPatch`] atomically: a concurrent reader sees either the record before the
/// patch or after it, never a mix. They do *not* enforce the order lifecycle. That is the job of
/// [`crate::OrderFlowApi`], which also serialises writers per order code.
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    /// The URL of the store
    fn url(&self) -> &str;

    /// Every stored order, most recently created first.
    async fn fetch_all_orders(&self) -> Result<Vec<Order>, OrderStoreError>;

    async fn fetch_order(&self, order_code: OrderCode) -> Result<Option<Order>, OrderStoreError>;

    /// Merges `patch` into the stored record for `patch.order_code`, creating the record if it does not exist yet.
    ///
    /// * Fields that are not set in the patch keep their stored values.
    /// * `created_at`, `checkout_url` and `payment_link_id` are only written if they have no value yet.
    /// * `updated_at` is always set to the current time.
    /// * Passthrough fields are merged key by key.
    ///
    /// Returns the record as it is after the merge.
    async fn upsert_merge(&self, patch: OrderPatch) -> Result<Order, OrderStoreError>;

    async fn order_exists(&self, order_code: OrderCode) -> Result<bool, OrderStoreError> {
        Ok(self.fetch_order(order_code).await?.is_some())
    }

    /// Releases any resources held by the store.
    async fn close(&mut self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The stored record for order {0} could not be read. {1}")]
    CorruptRecord(String, String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}
