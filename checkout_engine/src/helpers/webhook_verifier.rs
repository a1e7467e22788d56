//! # Webhook authentication
//!
//! PayOS notifies us of payment results by POSTing a JSON document to our webhook endpoint:
//!
//! ```json
//! {
//!   "code": "00",
//!   "desc": "success",
//!   "success": true,
//!   "data": { "orderCode": 123, "amount": 3000, "reference": "TF230204212323", "code": "00", "desc": "success", ... },
//!   "signature": "412e915d2871504ed31be63c8f62a149a4410d34c4c42affc9006ef9917eaa03"
//! }
//! ```
//!
//! Anyone can POST to that endpoint, so nothing in the body is trusted until the signature checks out. The signature
//! is the HMAC-SHA256 of the canonical rendering of `data` (see [`checkout_common::canonical_data`]) keyed with the
//! merchant's checksum key. Only `data` is covered. The top-level `code` and `desc` are not, so they are kept for
//! logging and never decide an order's status.
use checkout_common::{canonical_data, verify_signature, Secret, SignatureError};
use log::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::db_types::{OrderCode, OrderCodeError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookVerificationError {
    #[error("The webhook body is not a valid notification. {0}")]
    MalformedPayload(String),
    #[error("The webhook body has no data object")]
    MissingData,
    #[error("The webhook body is not signed")]
    MissingSignature,
    #[error("The webhook signature is invalid. {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("The webhook refers to an invalid order. {0}")]
    InvalidOrderCode(#[from] OrderCodeError),
    #[error("No checksum key is configured, so webhooks cannot be verified")]
    NoChecksumKey,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    signature: Option<String>,
}

/// The authenticated content of a webhook notification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEvent {
    pub order_code: OrderCode,
    /// The transaction result code from `data`.
    pub code: Option<String>,
    pub description: Option<String>,
    /// The bank transaction reference.
    pub reference: Option<String>,
    pub payment_link_id: Option<String>,
    pub amount: Option<i64>,
    /// Unsigned envelope fields. Informational only.
    pub top_code: Option<String>,
    pub top_desc: Option<String>,
    pub success: Option<bool>,
    /// Every field of the signed `data` object.
    pub fields: Map<String, Value>,
}

impl VerifiedEvent {
    /// The signed result code from `data`.
    pub fn result_code(&self) -> Option<&str> {
        self.code.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    pub fn result_description(&self) -> Option<&str> {
        self.description.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    /// True when the unsigned envelope reports a different result than the signed data.
    pub fn envelope_disagrees(&self) -> bool {
        let top = self.top_code.as_deref().map(str::trim).filter(|c| !c.is_empty());
        top.is_some() && top != self.result_code()
    }
}

#[derive(Clone)]
pub struct WebhookVerifier {
    checksum_key: Secret<String>,
}

impl WebhookVerifier {
    pub fn new(checksum_key: Secret<String>) -> Self {
        Self { checksum_key }
    }

    /// Parses and authenticates a raw webhook body.
    pub fn verify(&self, body: &[u8]) -> Result<VerifiedEvent, WebhookVerificationError> {
        if self.checksum_key.reveal().is_empty() {
            return Err(WebhookVerificationError::NoChecksumKey);
        }
        let payload = serde_json::from_slice::<WebhookPayload>(body)
            .map_err(|e| WebhookVerificationError::MalformedPayload(e.to_string()))?;
        let data = match payload.data {
            Some(Value::Object(data)) => data,
            _ => return Err(WebhookVerificationError::MissingData),
        };
        let signature = payload
            .signature
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookVerificationError::MissingSignature)?;
        verify_signature(self.checksum_key.reveal(), &canonical_data(&data), &signature)?;
        let order_code = OrderCode::from_json(data.get("orderCode").unwrap_or(&Value::Null))?;
        trace!("🔐️ Webhook signature for order {order_code} is valid");
        Ok(VerifiedEvent {
            order_code,
            code: data.get("code").and_then(as_text),
            description: data.get("desc").and_then(as_text),
            reference: data.get("reference").and_then(as_text),
            payment_link_id: data.get("paymentLinkId").and_then(as_text),
            amount: data.get("amount").and_then(Value::as_i64),
            top_code: payload.code.as_ref().and_then(as_text),
            top_desc: payload.desc,
            success: payload.success,
            fields: data,
        })
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
