use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    checkout_api::errors::OrderFlowError,
    db_types::{Order, OrderCode, OrderStatus},
};

/// A checkout request, as it arrives from the client. Every field is optional here so that validation can report
/// exactly what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub order_code: Option<Value>,
}

/// A [`CreateOrderRequest`] that has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrderRequest {
    pub amount: i64,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
    pub requested_code: Option<OrderCode>,
}

impl CreateOrderRequest {
    pub fn new<S: Into<String>>(amount: i64, description: S, return_url: S, cancel_url: S) -> Self {
        Self {
            amount: Some(Value::from(amount)),
            description: Some(description.into()),
            return_url: Some(return_url.into()),
            cancel_url: Some(cancel_url.into()),
            order_code: None,
        }
    }

    pub fn with_order_code<V: Into<Value>>(mut self, code: V) -> Self {
        self.order_code = Some(code.into());
        self
    }

    pub fn validate(&self) -> Result<ValidatedOrderRequest, OrderFlowError> {
        let description = non_empty(&self.description);
        let return_url = non_empty(&self.return_url);
        let cancel_url = non_empty(&self.cancel_url);
        let amount = self.amount.as_ref().filter(|v| !is_blank(v));
        let missing = [
            ("amount", amount.is_none()),
            ("description", description.is_none()),
            ("returnUrl", return_url.is_none()),
            ("cancelUrl", cancel_url.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect::<Vec<_>>();
        let (Some(amount), Some(description), Some(return_url), Some(cancel_url)) =
            (amount, description, return_url, cancel_url)
        else {
            return Err(OrderFlowError::ValidationError(format!("Missing required fields: {}", missing.join(", "))));
        };
        let amount = parse_amount(amount)?;
        for (name, url) in [("returnUrl", &return_url), ("cancelUrl", &cancel_url)] {
            if !is_absolute_uri(url) {
                return Err(OrderFlowError::ValidationError(format!("{name} must be an absolute URI. Got '{url}'")));
            }
        }
        let requested_code = self.order_code.as_ref().filter(|v| !is_blank(v)).and_then(|v| OrderCode::from_json(v).ok());
        Ok(ValidatedOrderRequest { amount, description, return_url, cancel_url, requested_code })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn parse_amount(value: &Value) -> Result<i64, OrderFlowError> {
    let amount = match value {
        // `as` saturates, so floats outside the i64 range are rejected before casting
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f < i64::MAX as f64).map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match amount {
        Some(a) if a > 0 => Ok(a),
        _ => Err(OrderFlowError::ValidationError(format!("amount must be a positive whole number. Got {value}"))),
    }
}

fn is_absolute_uri(url: &str) -> bool {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    let re = SCHEME.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$").expect("valid URI scheme regex"));
    re.is_match(url)
}

/// Returned to the client once a checkout session is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub checkout_url: String,
    pub order_code: OrderCode,
    pub payment_link_id: String,
}

/// What the client polls for after returning from the checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusView {
    pub order_code: OrderCode,
    #[serde(flatten)]
    pub status: OrderStatus,
}

impl From<&Order> for OrderStatusView {
    fn from(order: &Order) -> Self {
        Self { order_code: order.order_code, status: order.status.clone() }
    }
}

/// The result of applying a verified webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// The order was updated. This includes idempotent replays of the current status.
    Applied(Order),
    /// The webhook asked for a transition out of a terminal state. Nothing was changed.
    Ignored { order: Order, attempted: OrderStatus },
}

impl WebhookOutcome {
    pub fn order(&self) -> &Order {
        match self {
            WebhookOutcome::Applied(order) => order,
            WebhookOutcome::Ignored { order, .. } => order,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, WebhookOutcome::Applied(_))
    }
}
