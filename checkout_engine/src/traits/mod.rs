//! # Backend contracts
//!
//! The engine is agnostic about where orders are kept and which payment provider mints the checkout links. Anything
//! that wants to act as one of those backends implements the traits in this module.
//!
//! * [`OrderStore`] persists order records and merges partial updates into them.
//! * [`CheckoutLinkGateway`] talks to the payment provider: creating, inspecting and cancelling hosted checkout links.
mod checkout_gateway;
mod order_store;

pub use checkout_gateway::{
    CheckoutLink,
    CheckoutLinkGateway,
    CheckoutLinkRequest,
    GatewayError,
    PaymentLinkStatus,
    ProviderLinkStatus,
};
pub use order_store::{OrderStore, OrderStoreError};
