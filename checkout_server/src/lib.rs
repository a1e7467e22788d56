//! # Checkout server
//! This crate hosts the HTTP server for PayOS hosted checkout. It is responsible for:
//! * Opening checkout sessions for client orders and handing back the PayOS checkout URL.
//! * Receiving payment webhooks from PayOS and passing them on to the order engine.
//! * Answering status queries from clients that return from the checkout page.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payment/create-order` (and the older `/create-payment-link`): Opens a checkout session.
//! * `/payment/payos-webhook`: The webhook route for PayOS payment notifications.
//! * `/payment/order-status`: The status of an order, by `orderCode` query parameter or path.
//! * `/payment/orders`: Order records, plus the reconcile and cancel actions for a single order.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;
