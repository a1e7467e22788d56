use actix_web::{
    http::{header::ContentType, StatusCode},
    test::TestRequest,
    web,
};
use checkout_engine::{
    db_types::{OrderCode, OrderPatch, OrderStatus},
    test_utils::webhooks::{paid_webhook, signed_webhook, signed_webhook_with_key},
    MemoryOrderStore,
    OrderStore,
};
use serde_json::{json, Value};

use super::{
    helpers::{json, send, TestApis},
    mocks::MockGateway,
};
use crate::server::{configure_webhooks, WebhookAccess};

const WEBHOOK: &str = "/payment/payos-webhook";
const LEGACY_WEBHOOK: &str = "/payos-webhook";

fn code(v: i64) -> OrderCode {
    OrderCode::new(v).unwrap()
}

async fn pending_order(apis: &TestApis<MockGateway>, order_code: i64, amount: i64) {
    let patch = OrderPatch::new(code(order_code))
        .with_amount(amount)
        .with_description("Webhook test")
        .with_status(OrderStatus::Pending)
        .with_checkout_url(format!("https://pay.payos.vn/web/{order_code}"));
    apis.db().upsert_merge(patch).await.unwrap();
}

#[actix_web::test]
async fn paid_webhook_settles_the_order() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    pending_order(&apis, 500, 75000).await;
    let (status, body) = apis.post(WEBHOOK, paid_webhook(500, 75000, "FT500")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"success": true}));
    let (_, body) = apis.get("/payment/order-status?orderCode=500").await;
    assert_eq!(json(&body), json!({"orderCode": 500, "status": "PAID"}));
    let order = apis.db().fetch_order(code(500)).await.unwrap().unwrap();
    assert_eq!(order.transaction_id.as_deref(), Some("FT500"));
    assert!(order.webhook_received_at.is_some());
    assert_eq!(order.checkout_url.as_deref(), Some("https://pay.payos.vn/web/500"));
}

#[actix_web::test]
async fn failed_payments_keep_the_provider_reason() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    pending_order(&apis, 501, 1000).await;
    let body = signed_webhook(json!({"orderCode": 501, "amount": 1000, "code": "07", "desc": "Card declined"}));
    let (status, res) = apis.post(WEBHOOK, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["success"], true);
    let (_, res) = apis.get("/payment/order-status/501").await;
    assert_eq!(json(&res), json!({"orderCode": 501, "status": "FAILED", "statusReason": "Card declined"}));
}

#[actix_web::test]
async fn bad_signatures_are_rejected_without_detail() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    pending_order(&apis, 502, 1000).await;
    let before = apis.db().fetch_order(code(502)).await.unwrap().unwrap();
    let forged = signed_webhook_with_key(json!({"orderCode": 502, "amount": 1000, "code": "00"}), "not-the-key");
    let (status, body) = apis.post(WEBHOOK, forged).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"success": false, "error": "Invalid webhook payload"}));
    let mut doc: Value = serde_json::from_slice(&paid_webhook(502, 1000, "FT502")).unwrap();
    doc["data"]["reference"] = json!("FT999");
    let (status, body) = apis.post(WEBHOOK, serde_json::to_vec(&doc).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["success"], false);
    let after = apis.db().fetch_order(code(502)).await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[actix_web::test]
async fn envelope_codes_cannot_mark_an_order_paid() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    pending_order(&apis, 505, 1000).await;
    let body = signed_webhook(json!({"orderCode": 505, "amount": 1000, "code": "09", "desc": "Declined"}));
    let mut doc: Value = serde_json::from_slice(&body).unwrap();
    doc["code"] = json!("00");
    doc["desc"] = json!("success");
    doc["success"] = json!(true);
    let (status, _) = apis.post(WEBHOOK, serde_json::to_vec(&doc).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let (_, res) = apis.get("/payment/order-status/505").await;
    assert_eq!(json(&res), json!({"orderCode": 505, "status": "FAILED", "statusReason": "Declined"}));
}

#[actix_web::test]
async fn garbage_payloads_are_rejected() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    for body in ["", "not json", r#"{"code":"00","desc":"success"}"#] {
        let (status, res) = apis.post(WEBHOOK, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&res)["error"], "Invalid webhook payload");
    }
    assert!(apis.db().is_empty().await);
}

#[actix_web::test]
async fn settled_orders_ignore_conflicting_webhooks() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    pending_order(&apis, 503, 1000).await;
    apis.post(WEBHOOK, paid_webhook(503, 1000, "FT503")).await;
    let late_failure = signed_webhook(json!({"orderCode": 503, "code": "01", "desc": "Timed out"}));
    let (status, body) = apis.post(WEBHOOK, late_failure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["success"], true);
    let order = apis.db().fetch_order(code(503)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    // A replay of the same result is accepted
    let (status, _) = apis.post(WEBHOOK, paid_webhook(503, 1000, "FT503")).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn webhooks_for_unknown_orders_create_them() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    let (status, _) = apis.post(WEBHOOK, paid_webhook(9001, 42000, "FT9001")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = apis.get("/payment/orders/9001").await;
    assert_eq!(status, StatusCode::OK);
    let order = json(&body);
    assert_eq!(order["status"], "PAID");
    assert_eq!(order["transactionId"], "FT9001");
    assert_eq!(order["amount"], 42000);
    assert_eq!(order["description"], "CS9001");
}

#[actix_web::test]
async fn legacy_webhook_path_is_still_served() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    pending_order(&apis, 506, 1000).await;
    let (status, body) = apis.post(LEGACY_WEBHOOK, paid_webhook(506, 1000, "FT506")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"success": true}));
    assert_eq!(apis.db().fetch_order(code(506)).await.unwrap().unwrap().status, OrderStatus::Paid);
}

#[actix_web::test]
async fn whitelist_blocks_unknown_peers() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    pending_order(&apis, 504, 1000).await;
    let access = WebhookAccess { whitelist: Some(vec!["10.0.0.5".parse().unwrap()]), ..Default::default() };
    let configure = |cfg: &mut web::ServiceConfig| {
        cfg.app_data(apis.flow.clone());
        configure_webhooks::<MemoryOrderStore, MockGateway>(cfg, &access);
    };
    let request = |path: &str, peer: &str| {
        TestRequest::post()
            .uri(path)
            .peer_addr(peer.parse().unwrap())
            .insert_header(ContentType::json())
            .set_payload(paid_webhook(504, 1000, "FT504"))
    };
    for path in [WEBHOOK, LEGACY_WEBHOOK] {
        let (status, _) = send(request(path, "10.0.0.9:443"), configure).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
    assert_eq!(apis.db().fetch_order(code(504)).await.unwrap().unwrap().status, OrderStatus::Pending);
    let (status, _) = send(request(LEGACY_WEBHOOK, "10.0.0.5:443"), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(apis.db().fetch_order(code(504)).await.unwrap().unwrap().status, OrderStatus::Paid);
}
