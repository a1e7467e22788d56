//! # Checkout engine public API
//!
//! The `checkout_api` module exposes the programmatic API of the checkout engine. It is split in two so that callers
//! only take on the backends they need.
//!
//! * [`order_flow_api`] owns every state change: creating orders, applying provider webhooks, reconciling with and
//!   cancelling at the provider. It needs an [`OrderStore`](crate::traits::OrderStore) and a
//!   [`CheckoutLinkGateway`](crate::traits::CheckoutLinkGateway).
//! * [`order_query_api`] is read-only and only needs an order store.
//!
//! # API usage
//!
//! ```rust,ignore
//! use checkout_engine::{OrderQueryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = OrderQueryApi::new(db);
//! let status = api.status(order_code).await?;
//! ```
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;
