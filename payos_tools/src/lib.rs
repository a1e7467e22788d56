//! # PayOS tools
//!
//! A small client for the [PayOS](https://payos.vn) merchant API. Only the calls that the checkout gateway needs are
//! implemented:
//!
//! * creating a payment request (which returns the hosted checkout URL),
//! * fetching the current state of a payment request,
//! * cancelling a payment request.
//!
//! Requests are signed, and payment request responses are verified, with the checksum key from [`PayOsConfig`].
mod api;
mod config;
mod error;

pub mod data_objects;

pub use api::PayOsApi;
pub use config::PayOsConfig;
pub use data_objects::{CreatePaymentResult, PaymentLinkInformation, PaymentRequest, PayOsTransaction};
pub use error::PayOsApiError;
