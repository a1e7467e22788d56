//! Checkout Engine
//!
//! The checkout engine tracks orders paid through PayOS hosted checkout pages. It opens a checkout session with the
//! payment provider when a client places an order, and settles the order when the provider's signed webhook reports
//! the result.
//!
//! The library is divided into these main sections:
//! 1. Storage ([`traits::OrderStore`]). Orders are kept in SQLite ([`SqliteDatabase`]) or, for tests, in memory
//!    ([`MemoryOrderStore`]). The data types are defined in the [`db_types`] module and are public.
//! 2. The provider boundary ([`traits::CheckoutLinkGateway`]). The engine does not know how to talk to PayOS itself;
//!    the server plugs in an adapter.
//! 3. The public API ([`OrderFlowApi`] and [`OrderQueryApi`]). The flow API owns every state change, including the
//!    order lifecycle rules and webhook authentication. The query API is read-only.
mod checkout_api;
mod memory_store;

#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod helpers;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use checkout_api::{
    errors::OrderFlowError,
    order_flow_api::{status_from_event, OrderFlowApi, SUCCESS_CODE},
    order_objects,
    order_query_api::OrderQueryApi,
};
pub use memory_store::MemoryOrderStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{CheckoutLinkGateway, OrderStore, OrderStoreError};
