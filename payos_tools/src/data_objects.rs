use checkout_common::canonical_data;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The envelope around every PayOS API response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayOsResponse {
    pub code: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl PayOsResponse {
    pub const SUCCESS_CODE: &'static str = "00";

    pub fn is_success(&self) -> bool {
        self.code == Self::SUCCESS_CODE
    }
}

/// A request for a new hosted checkout link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_code: i64,
    pub amount: i64,
    pub description: String,
    pub cancel_url: String,
    pub return_url: String,
}

impl PaymentRequest {
    /// The fields PayOS expects to be covered by the request signature, and only those.
    pub fn signature_data(&self) -> String {
        let fields = json!({
            "amount": self.amount,
            "cancelUrl": self.cancel_url,
            "description": self.description,
            "orderCode": self.order_code,
            "returnUrl": self.return_url,
        });
        match fields {
            Value::Object(map) => canonical_data(&map),
            _ => String::default(),
        }
    }

    /// The request body, including the signature.
    pub fn signed_body(&self, signature: String) -> Value {
        json!({
            "orderCode": self.order_code,
            "amount": self.amount,
            "description": self.description,
            "cancelUrl": self.cancel_url,
            "returnUrl": self.return_url,
            "signature": signature,
        })
    }
}

/// The `data` part of a successful "create payment request" response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePaymentResult {
    pub bin: String,
    pub account_number: String,
    pub account_name: String,
    pub amount: i64,
    pub description: String,
    pub order_code: i64,
    pub currency: String,
    pub payment_link_id: String,
    pub status: String,
    pub checkout_url: String,
    pub qr_code: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The state of a payment request, as reported by PayOS.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentLinkInformation {
    pub id: String,
    pub order_code: i64,
    pub amount: i64,
    pub amount_paid: i64,
    pub amount_remaining: i64,
    /// One of `PENDING`, `PROCESSING`, `PAID`, `UNDERPAID`, `CANCELLED` or `EXPIRED`.
    pub status: String,
    pub created_at: Option<String>,
    pub transactions: Vec<PayOsTransaction>,
    pub cancellation_reason: Option<String>,
    pub canceled_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayOsTransaction {
    pub reference: String,
    pub amount: i64,
    pub account_number: String,
    pub description: String,
    pub transaction_date_time: String,
    pub counter_account_bank_id: Option<String>,
    pub counter_account_bank_name: Option<String>,
    pub counter_account_name: Option<String>,
    pub counter_account_number: Option<String>,
}
