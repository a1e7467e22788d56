use thiserror::Error;

use crate::{
    db_types::{OrderCode, OrderStatus},
    helpers::WebhookVerificationError,
    traits::{GatewayError, OrderStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    GatewayError(#[from] GatewayError),
    #[error("{0}")]
    WebhookVerificationError(#[from] WebhookVerificationError),
    #[error("Order {0} does not exist")]
    NotFound(OrderCode),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderCode),
    #[error("Order {code} cannot change from {from} to {to}")]
    TransitionForbidden { code: OrderCode, from: OrderStatus, to: OrderStatus },
    #[error("{0}")]
    PersistenceError(#[from] OrderStoreError),
    #[error("Could not find an unused order code after {0} attempts")]
    OrderCodesExhausted(usize),
}
