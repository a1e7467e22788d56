use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

//--------------------------------------     OrderCode       ---------------------------------------------------------

/// The largest order code PayOS will accept (2^53 - 1, the largest integer a JavaScript client can represent exactly).
pub const MAX_ORDER_CODE: i64 = 9_007_199_254_740_991;

/// The merchant-side identifier of an order. It doubles as the PayOS `orderCode`, so it is always a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OrderCode(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid order code: {0}")]
pub struct OrderCodeError(String);

impl OrderCode {
    pub fn new(value: i64) -> Result<Self, OrderCodeError> {
        if value <= 0 || value > MAX_ORDER_CODE {
            return Err(OrderCodeError(format!("{value} is outside the range 1..={MAX_ORDER_CODE}")));
        }
        Ok(Self(value))
    }

    /// Only for values already known to be in range.
    pub(crate) fn from_raw(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Order codes arrive from clients and webhooks either as JSON numbers or as numeric strings.
    pub fn from_json(value: &Value) -> Result<Self, OrderCodeError> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(v) => Self::new(v),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= 1.0 && f <= MAX_ORDER_CODE as f64 => Self::new(f as i64),
                    _ => Err(OrderCodeError(n.to_string())),
                },
            },
            Value::String(s) => s.parse(),
            v => Err(OrderCodeError(v.to_string())),
        }
    }
}

impl FromStr for OrderCode {
    type Err = OrderCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<i64>().map_err(|_| OrderCodeError(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<i64> for OrderCode {
    type Error = OrderCodeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for OrderCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        let value = Value::deserialize(deserializer)?;
        OrderCode::from_json(&value).map_err(serde::de::Error::custom)
    }
}

//--------------------------------------     OrderStatus     ---------------------------------------------------------

/// Where an order is in its payment lifecycle. `Paid` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "StatusRepr")]
pub enum OrderStatus {
    /// A checkout link has been issued and we are waiting for the customer to pay.
    Pending,
    Paid,
    /// The payment did not go through. The provider's explanation is kept alongside.
    Failed(String),
    /// A webhook arrived that did not carry a result code we could interpret.
    Unknown,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Failed(_) => "FAILED",
            OrderStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            OrderStatus::Failed(r) => Some(r.as_str()),
            _ => None,
        }
    }

    /// Rebuilds a status from its stored label and reason. Labels we do not recognise become `Unknown`.
    pub fn from_parts(label: &str, reason: Option<String>) -> Self {
        match label {
            "PENDING" => OrderStatus::Pending,
            "PAID" => OrderStatus::Paid,
            "FAILED" => OrderStatus::Failed(reason.unwrap_or_default()),
            _ => OrderStatus::Unknown,
        }
    }

    /// Non-terminal orders may move to any status. Terminal orders only accept a repeat of their current status.
    pub fn can_transition_to(&self, new_status: &OrderStatus) -> bool {
        !self.is_terminal() || self == new_status
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Failed(reason) if !reason.is_empty() => write!(f, "FAILED ({reason})"),
            s => write!(f, "{}", s.as_str()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusRepr {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_reason: Option<String>,
}

impl From<OrderStatus> for StatusRepr {
    fn from(status: OrderStatus) -> Self {
        let label = status.as_str();
        let status_reason = match status {
            OrderStatus::Failed(reason) => Some(reason),
            _ => None,
        };
        Self { status: label, status_reason }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------

/// An order record, as it is stored and as it is returned to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_code: OrderCode,
    pub amount: i64,
    pub description: String,
    #[serde(flatten)]
    pub status: OrderStatus,
    pub checkout_url: Option<String>,
    pub payment_link_id: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub webhook_received_at: Option<DateTime<Utc>>,
    /// Provider fields we do not model explicitly (e.g. counter-account details), kept for audit.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    /// Field names owned by the order record itself. Passthrough data may never overwrite these.
    pub const CORE_FIELDS: [&'static str; 12] = [
        "orderCode",
        "amount",
        "description",
        "status",
        "statusReason",
        "checkoutUrl",
        "paymentLinkId",
        "transactionId",
        "reference",
        "createdAt",
        "updatedAt",
        "webhookReceivedAt",
    ];

    /// Builds a brand-new record from a patch. Missing fields take their defaults.
    pub fn from_patch(patch: OrderPatch, now: DateTime<Utc>) -> Self {
        let mut extra = Map::new();
        merge_extra(&mut extra, patch.extra);
        Self {
            order_code: patch.order_code,
            amount: patch.amount.unwrap_or_default(),
            description: patch.description.unwrap_or_default(),
            status: patch.status.unwrap_or(OrderStatus::Pending),
            checkout_url: patch.checkout_url,
            payment_link_id: patch.payment_link_id,
            transaction_id: patch.transaction_id,
            created_at: patch.created_at.unwrap_or(now),
            updated_at: now,
            webhook_received_at: patch.webhook_received_at,
            extra,
        }
    }

    /// Applies `patch` to this record. Fields absent from the patch are left alone. `created_at`, `checkout_url` and
    /// `payment_link_id` keep their first value once set.
    pub fn merge(&mut self, patch: OrderPatch, now: DateTime<Utc>) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if self.checkout_url.is_none() {
            self.checkout_url = patch.checkout_url;
        }
        if self.payment_link_id.is_none() {
            self.payment_link_id = patch.payment_link_id;
        }
        if patch.transaction_id.is_some() {
            self.transaction_id = patch.transaction_id;
        }
        if patch.webhook_received_at.is_some() {
            self.webhook_received_at = patch.webhook_received_at;
        }
        merge_extra(&mut self.extra, patch.extra);
        self.updated_at = now;
    }
}

/// Merges passthrough fields key by key. A `null` removes the key.
fn merge_extra(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

//--------------------------------------      OrderPatch     ---------------------------------------------------------

/// A partial update to an order. Only the fields that are set are written.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPatch {
    pub order_code: OrderCode,
    pub amount: Option<i64>,
    pub description: Option<String>,
    pub status: Option<OrderStatus>,
    pub checkout_url: Option<String>,
    pub payment_link_id: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub webhook_received_at: Option<DateTime<Utc>>,
    pub extra: Map<String, Value>,
}

impl OrderPatch {
    pub fn new(order_code: OrderCode) -> Self {
        Self {
            order_code,
            amount: None,
            description: None,
            status: None,
            checkout_url: None,
            payment_link_id: None,
            transaction_id: None,
            created_at: None,
            webhook_received_at: None,
            extra: Map::new(),
        }
    }

    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_checkout_url<S: Into<String>>(mut self, url: S) -> Self {
        self.checkout_url = Some(url.into());
        self
    }

    pub fn with_payment_link_id<S: Into<String>>(mut self, id: S) -> Self {
        self.payment_link_id = Some(id.into());
        self
    }

    pub fn with_transaction_id<S: Into<String>>(mut self, id: S) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_webhook_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.webhook_received_at = Some(received_at);
        self
    }

    /// Adds passthrough fields. Keys that collide with the order's own fields are dropped.
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        for (key, value) in extra {
            if !Order::CORE_FIELDS.contains(&key.as_str()) {
                self.extra.insert(key, value);
            }
        }
        self
    }

    /// True if applying this patch would change nothing besides `updated_at`.
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() &&
            self.description.is_none() &&
            self.status.is_none() &&
            self.checkout_url.is_none() &&
            self.payment_link_id.is_none() &&
            self.transaction_id.is_none() &&
            self.created_at.is_none() &&
            self.webhook_received_at.is_none() &&
            self.extra.is_empty()
    }
}
