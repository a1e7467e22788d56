use actix_web::{
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use checkout_common::Secret;
use checkout_engine::{
    helpers::WebhookVerifier,
    test_utils::webhooks::TEST_CHECKSUM_KEY,
    CheckoutLinkGateway,
    MemoryOrderStore,
    OrderFlowApi,
    OrderQueryApi,
};
use log::debug;

use crate::{
    routes::{
        CancelOrderRoute,
        CreateOrderRoute,
        CreatePaymentLinkRoute,
        OrderByCodeRoute,
        OrderStatusByCodeRoute,
        OrderStatusRoute,
        OrdersRoute,
        ReconcileOrderRoute,
    },
    server::{configure_webhooks, WebhookAccess},
};

/// The engine APIs behind the endpoints, backed by an in-memory store. State survives across requests made with the
/// same `TestApis`.
pub struct TestApis<G> {
    pub flow: web::Data<OrderFlowApi<MemoryOrderStore, G>>,
    pub query: web::Data<OrderQueryApi<MemoryOrderStore>>,
}

impl<G: CheckoutLinkGateway + 'static> TestApis<G> {
    pub fn new(gateway: G) -> Self {
        let db = MemoryOrderStore::new();
        let verifier = WebhookVerifier::new(Secret::new(TEST_CHECKSUM_KEY.to_string()));
        let flow = web::Data::new(OrderFlowApi::new(db.clone(), gateway, verifier));
        let query = web::Data::new(OrderQueryApi::new(db));
        Self { flow, query }
    }

    pub fn db(&self) -> &MemoryOrderStore {
        self.flow.db()
    }

    /// Registers the routes the way the server does, with an open webhook whitelist.
    pub fn configure(&self, cfg: &mut ServiceConfig) {
        cfg.app_data(self.flow.clone())
            .app_data(self.query.clone())
            .service(CreatePaymentLinkRoute::<MemoryOrderStore, G>::new());
        configure_webhooks::<MemoryOrderStore, G>(cfg, &WebhookAccess::default());
        cfg.service(
            web::scope("/payment")
                .service(CreateOrderRoute::<MemoryOrderStore, G>::new())
                .service(OrderStatusRoute::<MemoryOrderStore>::new())
                .service(OrderStatusByCodeRoute::<MemoryOrderStore>::new())
                .service(OrdersRoute::<MemoryOrderStore>::new())
                .service(OrderByCodeRoute::<MemoryOrderStore>::new())
                .service(ReconcileOrderRoute::<MemoryOrderStore, G>::new())
                .service(CancelOrderRoute::<MemoryOrderStore, G>::new()),
        );
    }

    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        send(TestRequest::get().uri(path), |cfg| self.configure(cfg)).await
    }

    pub async fn post<B: Into<Vec<u8>>>(&self, path: &str, body: B) -> (StatusCode, String) {
        let req = TestRequest::post().uri(path).insert_header(ContentType::json()).set_payload(body.into());
        send(req, |cfg| self.configure(cfg)).await
    }
}

pub async fn send<F: FnOnce(&mut ServiceConfig)>(req: TestRequest, configure: F) -> (StatusCode, String) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response was not JSON ({e}): {body}"))
}
