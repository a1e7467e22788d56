use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::OrderCode;

/// What the engine asks the payment provider for when it opens a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLinkRequest {
    pub order_code: OrderCode,
    pub amount: i64,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
}

/// A hosted checkout page, as minted by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLink {
    pub checkout_url: String,
    pub payment_link_id: String,
}

/// The provider's own view of a payment link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderLinkStatus {
    Pending,
    Processing,
    Paid,
    Underpaid,
    Cancelled,
    Expired,
    Other(String),
}

impl From<&str> for ProviderLinkStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => ProviderLinkStatus::Pending,
            "PROCESSING" => ProviderLinkStatus::Processing,
            "PAID" => ProviderLinkStatus::Paid,
            "UNDERPAID" => ProviderLinkStatus::Underpaid,
            "CANCELLED" | "CANCELED" => ProviderLinkStatus::Cancelled,
            "EXPIRED" => ProviderLinkStatus::Expired,
            other => ProviderLinkStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkStatus {
    pub order_code: OrderCode,
    pub payment_link_id: Option<String>,
    pub status: ProviderLinkStatus,
    pub amount: i64,
    pub amount_paid: i64,
    /// The bank reference of the most recent transaction against the link, if any.
    pub reference: Option<String>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("The payment provider rejected the request. Code {code}: {desc}")]
    Rejected { code: String, desc: String },
    #[error("Could not communicate with the payment provider. {0}")]
    Transport(String),
    #[error("The payment provider sent a response we could not use. {0}")]
    InvalidResponse(String),
}

/// A payment provider that can mint and manage hosted checkout links.
#[allow(async_fn_in_trait)]
pub trait CheckoutLinkGateway {
    async fn create_checkout_link(&self, request: CheckoutLinkRequest) -> Result<CheckoutLink, GatewayError>;

    async fn fetch_payment_link(&self, order_code: OrderCode) -> Result<PaymentLinkStatus, GatewayError>;

    async fn cancel_payment_link(
        &self,
        order_code: OrderCode,
        reason: Option<String>,
    ) -> Result<PaymentLinkStatus, GatewayError>;
}
