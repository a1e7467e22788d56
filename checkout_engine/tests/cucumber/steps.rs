use checkout_engine::{
    db_types::{OrderCode, OrderStatus},
    order_objects::{CreateOrderRequest, WebhookOutcome},
    test_utils::webhooks::{paid_webhook, signed_webhook, signed_webhook_with_key},
    traits::{GatewayError, OrderStore, ProviderLinkStatus},
    OrderFlowError,
};
use cucumber::{then, when};
use serde_json::json;

use crate::cucumber::CheckoutWorld;

fn code(value: i64) -> OrderCode {
    OrderCode::new(value).expect("Invalid order code")
}

fn checkout(amount: i64, description: &str) -> CreateOrderRequest {
    CreateOrderRequest::new(amount, description, "myshop://payment-success", "myshop://payment-cancel")
}

#[when(expr = "the client places order {int} for {int} VND described as {string}")]
async fn place_order(world: &mut CheckoutWorld, order_code: i64, amount: i64, description: String) {
    let request = checkout(amount, &description).with_order_code(order_code);
    match world.api().create_order(request).await {
        Ok(res) => {
            assert_eq!(res.order_code, code(order_code));
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e),
    }
}

#[when(expr = "PayOS is unavailable")]
async fn provider_down(world: &mut CheckoutWorld) {
    world.api().gateway().fail_next_with(GatewayError::Transport("connection refused".into()));
}

#[when(expr = "PayOS reports that order {int} was paid {int} VND with reference {word}")]
async fn webhook_paid(world: &mut CheckoutWorld, order_code: i64, amount: i64, reference: String) {
    let body = paid_webhook(order_code, amount, &reference);
    apply(world, &body).await;
}

#[when(expr = "PayOS reports that order {int} failed with code {word} and description {string}")]
async fn webhook_failed(world: &mut CheckoutWorld, order_code: i64, result_code: String, description: String) {
    let body = signed_webhook(json!({
        "orderCode": order_code,
        "amount": 0,
        "code": result_code,
        "desc": description,
    }));
    apply(world, &body).await;
}

#[when(expr = "someone forges a payment notification for order {int}")]
async fn webhook_forged(world: &mut CheckoutWorld, order_code: i64) {
    let body = signed_webhook_with_key(
        json!({"orderCode": order_code, "amount": 1, "code": "00", "desc": "success", "reference": "FAKE"}),
        "not the merchant's key",
    );
    apply(world, &body).await;
}

#[when(expr = "a notification for order {int} without a result code arrives with the envelope code changed to {word}")]
async fn webhook_envelope_rewritten(world: &mut CheckoutWorld, order_code: i64, envelope_code: String) {
    let body = signed_webhook(json!({"orderCode": order_code, "amount": 1000, "reference": format!("FT{order_code}")}));
    let mut doc: serde_json::Value = serde_json::from_slice(&body).expect("Webhook body is JSON");
    doc["code"] = json!(envelope_code);
    let body = serde_json::to_vec(&doc).expect("Webhook body serializes");
    apply(world, &body).await;
}

#[when(expr = "the operator reconciles order {int} after PayOS marks it {word}")]
async fn reconcile(world: &mut CheckoutWorld, order_code: i64, provider_status: String) {
    let status = ProviderLinkStatus::from(provider_status.as_str());
    world.api().gateway().set_link_status(code(order_code), status, Some(format!("REF{order_code}")));
    match world.api().reconcile_order(code(order_code)).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e),
    }
}

async fn apply(world: &mut CheckoutWorld, body: &[u8]) {
    match world.api().apply_webhook(body).await {
        Ok(outcome) => {
            world.last_outcome = Some(outcome);
            world.last_error = None;
        },
        Err(e) => {
            world.last_outcome = None;
            world.last_error = Some(e);
        },
    }
}

#[then(expr = "order {int} is {word}")]
async fn order_status(world: &mut CheckoutWorld, order_code: i64, status: String) {
    let order = world.api().get_order(code(order_code)).await.expect("Order should exist");
    assert_eq!(order.status.as_str(), status, "Unexpected status for order {order_code}");
}

#[then(expr = "order {int} failed because {string}")]
async fn order_failed_because(world: &mut CheckoutWorld, order_code: i64, reason: String) {
    let order = world.api().get_order(code(order_code)).await.expect("Order should exist");
    assert_eq!(order.status, OrderStatus::Failed(reason));
}

#[then(expr = "order {int} has transaction id {word}")]
async fn order_transaction(world: &mut CheckoutWorld, order_code: i64, reference: String) {
    let order = world.api().get_order(code(order_code)).await.expect("Order should exist");
    assert_eq!(order.transaction_id.as_deref(), Some(reference.as_str()));
}

#[then(expr = "order {int} is for {int} VND")]
async fn order_amount(world: &mut CheckoutWorld, order_code: i64, amount: i64) {
    let order = world.api().get_order(code(order_code)).await.expect("Order should exist");
    assert_eq!(order.amount, amount);
}

#[then(expr = "order {int} does not exist")]
async fn order_missing(world: &mut CheckoutWorld, order_code: i64) {
    let result = world.api().get_order(code(order_code)).await;
    assert!(matches!(result, Err(OrderFlowError::NotFound(_))), "Order {order_code} exists");
}

#[then(expr = "the webhook is rejected")]
async fn webhook_rejected(world: &mut CheckoutWorld) {
    assert!(matches!(world.last_error, Some(OrderFlowError::WebhookVerificationError(_))));
}

#[then(expr = "the webhook is acknowledged but ignored")]
async fn webhook_ignored(world: &mut CheckoutWorld) {
    assert!(matches!(world.last_outcome, Some(WebhookOutcome::Ignored { .. })));
}

#[then(expr = "the request fails because the order already exists")]
async fn duplicate_rejected(world: &mut CheckoutWorld) {
    assert!(matches!(world.last_error, Some(OrderFlowError::OrderAlreadyExists(_))));
}

#[then(expr = "the request fails with a provider error")]
async fn provider_error(world: &mut CheckoutWorld) {
    assert!(matches!(world.last_error, Some(OrderFlowError::GatewayError(_))));
}

#[then(expr = "the operator is told the change is forbidden")]
async fn forbidden(world: &mut CheckoutWorld) {
    assert!(matches!(world.last_error, Some(OrderFlowError::TransitionForbidden { .. })));
}

#[then(expr = "there are {int} orders")]
async fn order_count(world: &mut CheckoutWorld, count: usize) {
    let orders = world.api().db().fetch_all_orders().await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}
