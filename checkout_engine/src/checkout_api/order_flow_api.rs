use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    checkout_api::{
        errors::OrderFlowError,
        order_objects::{CreateOrderRequest, CreateOrderResponse, OrderStatusView, WebhookOutcome},
    },
    db_types::{Order, OrderCode, OrderPatch, OrderStatus},
    helpers::{OrderCodeGenerator, OrderLockGuard, OrderLocks, VerifiedEvent, WebhookVerifier},
    traits::{CheckoutLinkGateway, CheckoutLinkRequest, OrderStore, PaymentLinkStatus, ProviderLinkStatus},
};

/// The result code PayOS uses for a successful transaction.
pub const SUCCESS_CODE: &str = "00";

const MAX_CODE_ATTEMPTS: usize = 5;

/// `OrderFlowApi` owns the order lifecycle. Every state change (checkout creation, webhook results, reconciliation and
/// cancellation) goes through here.
///
/// Orders move from `PENDING` (or `UNKNOWN`) to any status. Once an order is `PAID` or `FAILED` it only accepts a
/// repeat of that same status, so replayed or out-of-order webhooks cannot undo a final result.
///
/// All read-decide-write sequences for one order code run under that code's lock. A single `OrderFlowApi` instance
/// must therefore be shared by everything that writes orders.
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    verifier: WebhookVerifier,
    locks: OrderLocks,
    codes: OrderCodeGenerator,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, G> OrderFlowApi<B, G> {
    pub fn new(db: B, gateway: G, verifier: WebhookVerifier) -> Self {
        Self { db, gateway, verifier, locks: OrderLocks::new(), codes: OrderCodeGenerator::new() }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: OrderStore,
    G: CheckoutLinkGateway,
{
    /// Opens a checkout session for a new order.
    ///
    /// The provider is called before anything is written, so a rejected or failed request leaves no trace in the
    /// store. If the client asked for a specific order code and that code is taken, the request fails with
    /// [`OrderFlowError::OrderAlreadyExists`].
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<CreateOrderResponse, OrderFlowError> {
        let order = request.validate()?;
        let (order_code, _guard) = match order.requested_code {
            Some(code) => {
                let guard = self.locks.lock(code).await;
                if self.db.order_exists(code).await? {
                    warn!("🔄️📦️ Order {code} was requested, but it already exists");
                    return Err(OrderFlowError::OrderAlreadyExists(code));
                }
                (code, guard)
            },
            None => self.allocate_order_code().await?,
        };
        let link_request = CheckoutLinkRequest {
            order_code,
            amount: order.amount,
            description: order.description.clone(),
            return_url: order.return_url,
            cancel_url: order.cancel_url,
        };
        let link = self.gateway.create_checkout_link(link_request).await.map_err(|e| {
            warn!("🔄️📦️ Could not create a checkout link for order {order_code}. {e}");
            e
        })?;
        let patch = OrderPatch::new(order_code)
            .with_amount(order.amount)
            .with_description(order.description)
            .with_status(OrderStatus::Pending)
            .with_checkout_url(link.checkout_url.clone())
            .with_payment_link_id(link.payment_link_id.clone())
            .with_created_at(Utc::now());
        self.db.upsert_merge(patch).await.map_err(|e| {
            error!("🔄️📦️ Checkout link {} was issued for order {order_code}, but the order was not saved. {e}", link.payment_link_id);
            e
        })?;
        info!("🔄️📦️ Order {order_code} created. Awaiting payment of {} VND", order.amount);
        Ok(CreateOrderResponse { checkout_url: link.checkout_url, order_code, payment_link_id: link.payment_link_id })
    }

    /// Authenticates a raw webhook body and applies the payment result it carries.
    ///
    /// Nothing is written unless the signature checks out. A webhook for an order code we have never seen creates the
    /// record.
    pub async fn apply_webhook(&self, body: &[u8]) -> Result<WebhookOutcome, OrderFlowError> {
        let event = self.verifier.verify(body).map_err(|e| {
            warn!("🔐️ Rejected webhook. {e}");
            e
        })?;
        let status = status_from_event(&event);
        debug!("🔄️💰️ Webhook for order {} reports {status}", event.order_code);
        if event.envelope_disagrees() {
            warn!(
                "🔐️ Webhook envelope for order {} claims code {:?}, but the signed data says {:?}. Using the signed data.",
                event.order_code,
                event.top_code,
                event.result_code()
            );
        }
        let amount = event.amount.filter(|a| *a > 0);
        let description = event.fields.get("description").and_then(|d| d.as_str()).map(String::from);
        let payment_link_id = event.payment_link_id.clone();
        let mut patch = OrderPatch::new(event.order_code)
            .with_status(status)
            .with_webhook_received_at(Utc::now())
            .with_extra(event.fields);
        if let Some(reference) = event.reference {
            patch = patch.with_transaction_id(reference);
        }
        // Only a record we have never seen takes its amount and description from the webhook
        let seed = move |mut patch: OrderPatch| {
            if let Some(amount) = amount {
                patch = patch.with_amount(amount);
            }
            if let Some(description) = description {
                patch = patch.with_description(description);
            }
            if let Some(id) = payment_link_id {
                patch = patch.with_payment_link_id(id);
            }
            patch
        };
        self.apply_transition(patch, seed).await
    }

    pub async fn get_order(&self, order_code: OrderCode) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_code).await?.ok_or(OrderFlowError::NotFound(order_code))
    }

    pub async fn get_status(&self, order_code: OrderCode) -> Result<OrderStatusView, OrderFlowError> {
        self.get_order(order_code).await.map(|order| OrderStatusView::from(&order))
    }

    /// Brings the order in line with what the provider reports. This is how a missed webhook is recovered.
    ///
    /// Only final provider states (`PAID`, `CANCELLED`, `EXPIRED`) change the order status. The transaction reference
    /// is picked up whenever the provider has one.
    pub async fn reconcile_order(&self, order_code: OrderCode) -> Result<Order, OrderFlowError> {
        let order = self.get_order(order_code).await?;
        let link = self.gateway.fetch_payment_link(order_code).await?;
        debug!("🔄️ Provider reports {:?} for order {order_code}, which is {} locally", link.status, order.status);
        let mut patch = OrderPatch::new(order_code);
        if let Some(status) = status_from_link(&link) {
            patch = patch.with_status(status);
        }
        if let Some(reference) = link.reference {
            patch = patch.with_transaction_id(reference);
        }
        if patch.is_empty() {
            trace!("🔄️ Nothing to reconcile for order {order_code}");
            return Ok(order);
        }
        let outcome = self.apply_transition(patch, |p| p).await?;
        into_order(outcome)
    }

    /// Cancels the provider's payment link and marks the order as failed.
    pub async fn cancel_order(&self, order_code: OrderCode, reason: Option<String>) -> Result<Order, OrderFlowError> {
        let order = self.get_order(order_code).await?;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let attempted = cancelled_status(reason.as_deref());
        if order.status.is_terminal() {
            return Err(OrderFlowError::TransitionForbidden { code: order_code, from: order.status, to: attempted });
        }
        let link = self.gateway.cancel_payment_link(order_code, reason.clone()).await?;
        let status = cancelled_status(link.cancellation_reason.as_deref().or(reason.as_deref()));
        info!("🔄️ Payment link for order {order_code} cancelled");
        let outcome = self.apply_transition(OrderPatch::new(order_code).with_status(status), |p| p).await?;
        into_order(outcome)
    }

    /// Applies `patch` to the order under the order's lock, unless it asks for a forbidden status change.
    /// `on_create` completes the patch when no record exists yet.
    async fn apply_transition<F>(&self, mut patch: OrderPatch, on_create: F) -> Result<WebhookOutcome, OrderFlowError>
    where F: FnOnce(OrderPatch) -> OrderPatch {
        let code = patch.order_code;
        let _guard = self.locks.lock(code).await;
        let existing = self.db.fetch_order(code).await?;
        if let (Some(order), Some(new_status)) = (&existing, &patch.status) {
            if !order.status.can_transition_to(new_status) {
                warn!("🔄️ Ignoring change of order {code} from {} to {new_status}", order.status);
                let attempted = new_status.clone();
                return Ok(WebhookOutcome::Ignored { order: order.clone(), attempted });
            }
        }
        if existing.is_none() {
            info!("🔄️ Order {code} was not known before this update. Creating it.");
            patch = on_create(patch);
            if patch.amount.is_none() {
                warn!("🔄️ Order {code} is being created without an amount");
            }
        }
        let order = self.db.upsert_merge(patch).await?;
        debug!("🔄️ Order {code} is now {}", order.status);
        Ok(WebhookOutcome::Applied(order))
    }

    /// Picks a fresh order code and locks it. Generated codes are unique within this process, but another process
    /// sharing the store could have used the same one, so each candidate is checked.
    async fn allocate_order_code(&self) -> Result<(OrderCode, OrderLockGuard), OrderFlowError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = self.codes.next_code();
            let guard = self.locks.lock(code).await;
            if !self.db.order_exists(code).await? {
                return Ok((code, guard));
            }
            debug!("🔄️ Generated order code {code} is already taken. Trying another.");
        }
        Err(OrderFlowError::OrderCodesExhausted(MAX_CODE_ATTEMPTS))
    }
}

/// `"00"` means paid. Any other code is a failure, described by the provider. No code at all leaves us guessing.
pub fn status_from_event(event: &VerifiedEvent) -> OrderStatus {
    match event.result_code() {
        Some(SUCCESS_CODE) => OrderStatus::Paid,
        Some(code) => {
            let reason = event.result_description().map(String::from).unwrap_or_else(|| format!("Provider code {code}"));
            OrderStatus::Failed(reason)
        },
        None => OrderStatus::Unknown,
    }
}

fn status_from_link(link: &PaymentLinkStatus) -> Option<OrderStatus> {
    match &link.status {
        ProviderLinkStatus::Paid => Some(OrderStatus::Paid),
        ProviderLinkStatus::Cancelled => Some(cancelled_status(link.cancellation_reason.as_deref())),
        ProviderLinkStatus::Expired => Some(OrderStatus::Failed("EXPIRED".into())),
        _ => None,
    }
}

fn cancelled_status(reason: Option<&str>) -> OrderStatus {
    match reason {
        Some(r) => OrderStatus::Failed(format!("CANCELLED: {r}")),
        None => OrderStatus::Failed("CANCELLED".into()),
    }
}

fn into_order(outcome: WebhookOutcome) -> Result<Order, OrderFlowError> {
    match outcome {
        WebhookOutcome::Applied(order) => Ok(order),
        WebhookOutcome::Ignored { order, attempted } => {
            Err(OrderFlowError::TransitionForbidden { code: order.order_code, from: order.status, to: attempted })
        },
    }
}
