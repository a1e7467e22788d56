use actix_web::http::StatusCode;
use checkout_engine::{
    db_types::{OrderCode, OrderPatch, OrderStatus},
    traits::{CheckoutLink, GatewayError, PaymentLinkStatus, ProviderLinkStatus},
    OrderStore,
};
use mockall::predicate::eq;
use serde_json::json;

use super::{
    helpers::{json, TestApis},
    mocks::MockGateway,
};

fn code(v: i64) -> OrderCode {
    OrderCode::new(v).unwrap()
}

fn minting_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_checkout_link().returning(|req| {
        Ok(CheckoutLink {
            checkout_url: format!("https://pay.payos.vn/web/{}", req.order_code),
            payment_link_id: format!("plink-{}", req.order_code),
        })
    });
    gateway
}

fn checkout_body(order_code: i64) -> String {
    json!({
        "amount": 50000,
        "description": "Ao thun",
        "returnUrl": "https://shop.example/success",
        "cancelUrl": "https://shop.example/cancel",
        "orderCode": order_code
    })
    .to_string()
}

fn link(order_code: i64, status: ProviderLinkStatus) -> PaymentLinkStatus {
    PaymentLinkStatus {
        order_code: code(order_code),
        payment_link_id: Some(format!("plink-{order_code}")),
        status,
        amount: 50000,
        amount_paid: 0,
        reference: None,
        cancellation_reason: None,
    }
}

#[actix_web::test]
async fn create_order_returns_the_checkout_url() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(minting_gateway());
    let (status, body) = apis.post("/payment/create-order", checkout_body(1001)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["checkoutUrl"], "https://pay.payos.vn/web/1001");
    assert_eq!(body["orderCode"], 1001);
    assert_eq!(body["paymentLinkId"], "plink-1001");

    let (status, body) = apis.get("/payment/order-status?orderCode=1001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"orderCode": 1001, "status": "PENDING"}));
    let (status, body) = apis.get("/payment/order-status/1001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "PENDING");
}

#[actix_web::test]
async fn legacy_path_creates_orders_too() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(minting_gateway());
    let body = json!({
        "amount": "20000",
        "description": "Legacy client",
        "returnUrl": "myshop://payment-success",
        "cancelUrl": "myshop://payment-cancel"
    });
    let (status, body) = apis.post("/create-payment-link", body.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let order_code = body["orderCode"].as_i64().unwrap();
    assert!(order_code > 0);
    let order = apis.db().fetch_order(code(order_code)).await.unwrap().unwrap();
    assert_eq!(order.amount, 20000);
    assert_eq!(order.status, OrderStatus::Pending);
}

#[actix_web::test]
async fn missing_fields_are_reported() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    let (status, body) = apis.post("/payment/create-order", json!({"amount": 1000}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Missing required fields: description, returnUrl, cancelUrl");
    assert!(apis.db().is_empty().await);
}

#[actix_web::test]
async fn invalid_amounts_and_urls_are_rejected() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    let mut body = json!({
        "amount": -5,
        "description": "Bad amount",
        "returnUrl": "https://shop.example/success",
        "cancelUrl": "https://shop.example/cancel"
    });
    let (status, _) = apis.post("/payment/create-order", body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    body["amount"] = json!(1000);
    body["returnUrl"] = json!("not a url");
    let (status, res) = apis.post("/payment/create-order", body.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&res)["error"].as_str().unwrap().starts_with("returnUrl must be an absolute URI"));
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    let (status, body) = apis.post("/payment/create-order", "{\"amount\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Could not read request body"));
}

#[actix_web::test]
async fn duplicate_order_codes_conflict() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway.expect_create_checkout_link().times(1).returning(|req| {
        Ok(CheckoutLink {
            checkout_url: format!("https://pay.payos.vn/web/{}", req.order_code),
            payment_link_id: "first".into(),
        })
    });
    let apis = TestApis::new(gateway);
    let (status, _) = apis.post("/payment/create-order", checkout_body(55)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = apis.post("/payment/create-order", checkout_body(55)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)["error"], "Order 55 already exists");
    let order = apis.db().fetch_order(code(55)).await.unwrap().unwrap();
    assert_eq!(order.payment_link_id.as_deref(), Some("first"));
}

#[actix_web::test]
async fn gateway_failures_leave_no_order_behind() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_checkout_link()
        .returning(|_| Err(GatewayError::Rejected { code: "20".into(), desc: "Invalid amount".into() }));
    let apis = TestApis::new(gateway);
    let (status, body) = apis.post("/payment/create-order", checkout_body(77)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json(&body)["error"].as_str().unwrap().contains("Invalid amount"));
    let (status, _) = apis.get("/payment/orders/77").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn unknown_and_invalid_order_codes() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    let (status, body) = apis.get("/payment/order-status?orderCode=999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body), json!({"error": "Order 999 does not exist"}));
    let (status, _) = apis.get("/payment/order-status?orderCode=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = apis.get("/payment/order-status").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "orderCode is required");
    let (status, _) = apis.get("/payment/orders/0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn orders_are_listed_and_fetched() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(minting_gateway());
    for i in [11, 12] {
        let (status, _) = apis.post("/payment/create-order", checkout_body(i)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = apis.get("/payment/orders").await;
    assert_eq!(status, StatusCode::OK);
    let orders = json(&body);
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["status"] == "PENDING" && o["amount"] == 50000));

    let (status, body) = apis.get("/payment/orders/12").await;
    assert_eq!(status, StatusCode::OK);
    let order = json(&body);
    assert_eq!(order["orderCode"], 12);
    assert_eq!(order["checkoutUrl"], "https://pay.payos.vn/web/12");
    assert_eq!(order["description"], "Ao thun");
}

#[actix_web::test]
async fn reconcile_applies_the_provider_state() {
    let _ = env_logger::try_init().ok();
    let mut gateway = minting_gateway();
    gateway.expect_fetch_payment_link().with(eq(code(21))).times(1).returning(|c| {
        let mut status = link(c.value(), ProviderLinkStatus::Paid);
        status.amount_paid = 50000;
        status.reference = Some("FT2112".into());
        Ok(status)
    });
    let apis = TestApis::new(gateway);
    apis.post("/payment/create-order", checkout_body(21)).await;
    let (status, body) = apis.post("/payment/orders/21/reconcile", "").await;
    assert_eq!(status, StatusCode::OK);
    let order = json(&body);
    assert_eq!(order["status"], "PAID");
    assert_eq!(order["transactionId"], "FT2112");
}

#[actix_web::test]
async fn reconcile_of_unknown_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    let (status, _) = apis.post("/payment/orders/404/reconcile", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cancel_marks_the_order_failed() {
    let _ = env_logger::try_init().ok();
    let mut gateway = minting_gateway();
    gateway
        .expect_cancel_payment_link()
        .with(eq(code(31)), eq(Some("Out of stock".to_string())))
        .times(1)
        .returning(|c, reason| {
            let mut status = link(c.value(), ProviderLinkStatus::Cancelled);
            status.cancellation_reason = reason;
            Ok(status)
        });
    let apis = TestApis::new(gateway);
    apis.post("/payment/create-order", checkout_body(31)).await;
    let (status, body) =
        apis.post("/payment/orders/31/cancel", json!({"cancellationReason": "Out of stock"}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    let order = json(&body);
    assert_eq!(order["status"], "FAILED");
    assert_eq!(order["statusReason"], "CANCELLED: Out of stock");
}

#[actix_web::test]
async fn settled_orders_cannot_be_cancelled() {
    let _ = env_logger::try_init().ok();
    let apis = TestApis::new(MockGateway::new());
    apis.db().upsert_merge(OrderPatch::new(code(41)).with_amount(1000).with_status(OrderStatus::Paid)).await.unwrap();
    let (status, body) = apis.post("/payment/orders/41/cancel", "").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Order 41 cannot change from PAID"));
}
