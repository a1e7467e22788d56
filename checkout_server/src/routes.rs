//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the engine, and the engine never blocks
//! on I/O, so workers stay free while the database or PayOS is busy.
use actix_web::{get, web, HttpResponse, Responder};
use checkout_engine::{
    order_objects::{CreateOrderRequest, WebhookOutcome},
    CheckoutLinkGateway,
    OrderFlowApi,
    OrderFlowError,
    OrderQueryApi,
    OrderStore,
};
use log::*;

use crate::{
    data_objects::{CancelOrderParams, JsonResponse, OrderStatusQuery},
    errors::ServerError,
    helpers::parse_order_code,
};

/// The only thing a caller learns when their webhook is rejected.
pub const INVALID_WEBHOOK_MESSAGE: &str = "Invalid webhook payload";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("PayOS checkout server is running.\n")
}

// ----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_order => Post "/create-order" impl OrderStore, CheckoutLinkGateway);
/// Opens a checkout session for a new order.
///
/// The body is a JSON [`CreateOrderRequest`]: `amount`, `description`, `returnUrl` and `cancelUrl` are required, and
/// `orderCode` may be given to choose the code. On success the client receives the hosted checkout URL, which it
/// should open for the customer.
pub async fn create_order<B, G>(body: web::Bytes, api: web::Data<OrderFlowApi<B, G>>) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: CheckoutLinkGateway,
{
    let request = serde_json::from_slice::<CreateOrderRequest>(&body).map_err(|e| {
        debug!("💻️ Could not read checkout request. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    trace!("💻️ Checkout request: {request:?}");
    let response = api.create_order(request).await.map_err(|e| {
        debug!("💻️ Could not create order. {e}");
        e
    })?;
    info!("💻️ Order {} created. Checkout at {}", response.order_code, response.checkout_url);
    Ok(HttpResponse::Ok().json(response))
}

route!(create_payment_link => Post "/create-payment-link" impl OrderStore, CheckoutLinkGateway);
/// The same as [`create_order`], under the path older clients still call.
pub async fn create_payment_link<B, G>(
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: CheckoutLinkGateway,
{
    create_order(body, api).await
}

// ----------------------------------------------   Webhook  ----------------------------------------------------
route!(payos_webhook => Post "" impl OrderStore, CheckoutLinkGateway);
/// Receives payment notifications from PayOS.
///
/// The raw body is handed to the engine, which checks the signature before anything is stored. PayOS retries on
/// anything other than a 2xx, so:
/// * payloads that fail verification get a 200 with a generic error. Retrying them would not help.
/// * notifications that would move a settled order are acknowledged and dropped.
/// * storage failures get a 500, so that PayOS tries again later.
pub async fn payos_webhook<B, G>(body: web::Bytes, api: web::Data<OrderFlowApi<B, G>>) -> HttpResponse
where
    B: OrderStore,
    G: CheckoutLinkGateway,
{
    trace!("💻️ Received PayOS webhook ({} bytes)", body.len());
    match api.apply_webhook(&body).await {
        Ok(WebhookOutcome::Applied(order)) => {
            info!("💻️ Webhook applied. Order {} is {}", order.order_code, order.status);
            HttpResponse::Ok().json(JsonResponse::success())
        },
        Ok(WebhookOutcome::Ignored { order, attempted }) => {
            info!("💻️ Webhook for order {} ignored. It is {} and cannot become {attempted}", order.order_code, order.status);
            HttpResponse::Ok().json(JsonResponse::success())
        },
        Err(OrderFlowError::WebhookVerificationError(e)) => {
            warn!("💻️ Rejected webhook call. {e}");
            HttpResponse::Ok().json(JsonResponse::failure(INVALID_WEBHOOK_MESSAGE))
        },
        Err(e) => {
            error!("💻️ Could not apply webhook. {e}");
            HttpResponse::InternalServerError().json(JsonResponse::failure(e.to_string()))
        },
    }
}

// ----------------------------------------------   Status  ----------------------------------------------------
route!(order_status => Get "/order-status" impl OrderStore);
/// `GET /order-status?orderCode=N`. This is what the client polls after the customer returns from the checkout
/// page.
pub async fn order_status<B: OrderStore>(
    query: web::Query<OrderStatusQuery>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let code = query
        .into_inner()
        .order_code
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| OrderFlowError::ValidationError("orderCode is required".into()))?;
    let code = parse_order_code(&code)?;
    debug!("💻️ GET order_status({code})");
    let status = api.status(code).await?;
    Ok(HttpResponse::Ok().json(status))
}

route!(order_status_by_code => Get "/order-status/{order_code}" impl OrderStore);
pub async fn order_status_by_code<B: OrderStore>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ GET order_status({code})");
    let status = api.status(code).await?;
    Ok(HttpResponse::Ok().json(status))
}

// ----------------------------------------------   Orders  ----------------------------------------------------
route!(orders => Get "/orders" impl OrderStore);
/// Every order, newest first.
pub async fn orders<B: OrderStore>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders");
    let orders = api.orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_code => Get "/orders/{order_code}" impl OrderStore);
pub async fn order_by_code<B: OrderStore>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ GET order_by_code({code})");
    let order = api.order(code).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(reconcile_order => Post "/orders/{order_code}/reconcile" impl OrderStore, CheckoutLinkGateway);
/// Asks PayOS for the state of the order's payment link and applies it. Use this when a webhook was missed.
pub async fn reconcile_order<B, G>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: CheckoutLinkGateway,
{
    let code = parse_order_code(&path.into_inner())?;
    debug!("💻️ POST reconcile_order({code})");
    let order = api.reconcile_order(code).await.map_err(|e| {
        debug!("💻️ Could not reconcile order {code}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{order_code}/cancel" impl OrderStore, CheckoutLinkGateway);
/// Cancels the order's payment link. The body is optional: `{"cancellationReason": "..."}`.
pub async fn cancel_order<B, G>(
    path: web::Path<String>,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: CheckoutLinkGateway,
{
    let code = parse_order_code(&path.into_inner())?;
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        CancelOrderParams::default()
    } else {
        serde_json::from_slice::<CancelOrderParams>(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?
    };
    debug!("💻️ POST cancel_order({code}). Reason: {:?}", params.cancellation_reason);
    let order = api.cancel_order(code, params.cancellation_reason).await.map_err(|e| {
        debug!("💻️ Could not cancel order {code}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(order))
}
