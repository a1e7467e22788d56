//! An in-process [`OrderStore`].
//!
//! Nothing survives a restart, so this is only suitable for tests and local development.
use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use log::*;
use tokio::sync::RwLock;

use crate::{
    db_types::{Order, OrderCode, OrderPatch},
    traits::{OrderStore, OrderStoreError},
};

#[derive(Debug, Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderCode, Order>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

impl OrderStore for MemoryOrderStore {
    fn url(&self) -> &str {
        "memory://orders"
    }

    async fn fetch_all_orders(&self) -> Result<Vec<Order>, OrderStoreError> {
        let store = self.orders.read().await;
        let mut orders = store.values().cloned().collect::<Vec<_>>();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.order_code.cmp(&a.order_code)));
        Ok(orders)
    }

    async fn fetch_order(&self, order_code: OrderCode) -> Result<Option<Order>, OrderStoreError> {
        let store = self.orders.read().await;
        Ok(store.get(&order_code).cloned())
    }

    async fn upsert_merge(&self, patch: OrderPatch) -> Result<Order, OrderStoreError> {
        let now = Utc::now();
        let mut store = self.orders.write().await;
        let code = patch.order_code;
        let order = match store.get_mut(&code) {
            Some(order) => {
                order.merge(patch, now);
                order.clone()
            },
            None => {
                let order = Order::from_patch(patch, now);
                store.insert(code, order.clone());
                order
            },
        };
        trace!("🗃️ Order {code} upserted in memory. Status is now {}", order.status);
        Ok(order)
    }

    async fn order_exists(&self, order_code: OrderCode) -> Result<bool, OrderStoreError> {
        let store = self.orders.read().await;
        Ok(store.contains_key(&order_code))
    }
}
