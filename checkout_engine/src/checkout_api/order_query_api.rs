//! Read-only access to orders, for the client's status polling and the operator console.
use std::fmt::Debug;

use log::trace;

use crate::{
    checkout_api::{errors::OrderFlowError, order_objects::OrderStatusView},
    db_types::{Order, OrderCode},
    traits::OrderStore,
};

pub struct OrderQueryApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi ({:?})", self.db)
    }
}

impl<B> OrderQueryApi<B>
where B: OrderStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// All orders, newest first.
    pub async fn orders(&self) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_all_orders().await?;
        trace!("🗃️ Fetched {} orders", orders.len());
        Ok(orders)
    }

    pub async fn order(&self, order_code: OrderCode) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_code).await?.ok_or(OrderFlowError::NotFound(order_code))
    }

    pub async fn status(&self, order_code: OrderCode) -> Result<OrderStatusView, OrderFlowError> {
        self.order(order_code).await.map(|order| OrderStatusView::from(&order))
    }
}
