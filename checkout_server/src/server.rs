use std::{net::IpAddr, path::Path, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use checkout_engine::{
    helpers::WebhookVerifier,
    CheckoutLinkGateway,
    OrderFlowApi,
    OrderQueryApi,
    OrderStore,
    SqliteDatabase,
};
use futures::future::{ok, Either};
use log::*;
use payos_tools::PayOsApi;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::payos::PayOsGateway,
    routes::{
        health,
        index,
        CancelOrderRoute,
        CreateOrderRoute,
        CreatePaymentLinkRoute,
        OrderByCodeRoute,
        OrderStatusByCodeRoute,
        OrderStatusRoute,
        OrdersRoute,
        PayosWebhookRoute,
        ReconcileOrderRoute,
    },
};

/// Where PayOS may deliver webhooks. The second path is the one older merchant dashboards are configured with.
pub const WEBHOOK_PATHS: [&str; 2] = ["/payment/payos-webhook", "/payos-webhook"];

/// Who may call the webhook endpoint.
#[derive(Debug, Clone, Default)]
pub struct WebhookAccess {
    pub whitelist: Option<Vec<IpAddr>>,
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl WebhookAccess {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            whitelist: config.webhook_whitelist.clone(),
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
        }
    }

    pub fn allows(&self, req: &HttpRequest) -> bool {
        let Some(whitelist) = &self.whitelist else {
            return true;
        };
        match get_remote_ip(req, self.use_x_forwarded_for, self.use_forwarded) {
            Some(ip) => {
                let allowed = whitelist.contains(&ip);
                if allowed {
                    info!("💻️ PayOS webhook from {ip}");
                } else {
                    warn!("💻️ Webhook call from {ip}, which is not whitelisted. Denying access.");
                }
                allowed
            },
            None => {
                warn!("💻️ No IP address found in webhook request, denying access.");
                false
            },
        }
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    ensure_database_dir(&config.database_url)?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let payos = PayOsApi::new(config.payos.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = PayOsGateway::new(payos);
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: PayOsGateway,
) -> Result<Server, ServerError> {
    let checksum_key = config.payos.checksum_key.clone();
    // Order locks and the code generator live inside the flow API, so every worker must share the same instance.
    let orders_api = web::Data::new(OrderFlowApi::new(db.clone(), gateway, WebhookVerifier::new(checksum_key)));
    let query_api = web::Data::new(OrderQueryApi::new(db));
    let access = WebhookAccess::from_config(&config);
    info!("💻️ Starting server on {}:{}", config.host, config.port);
    let srv = HttpServer::new(move || {
        let access = access.clone();
        let payment_scope = web::scope("/payment")
            .service(CreateOrderRoute::<SqliteDatabase, PayOsGateway>::new())
            .service(OrderStatusRoute::<SqliteDatabase>::new())
            .service(OrderStatusByCodeRoute::<SqliteDatabase>::new())
            .service(OrdersRoute::<SqliteDatabase>::new())
            .service(OrderByCodeRoute::<SqliteDatabase>::new())
            .service(ReconcileOrderRoute::<SqliteDatabase, PayOsGateway>::new())
            .service(CancelOrderRoute::<SqliteDatabase, PayOsGateway>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("checkout::access_log"))
            .app_data(orders_api.clone())
            .app_data(query_api.clone())
            .service(health)
            .service(index)
            .service(CreatePaymentLinkRoute::<SqliteDatabase, PayOsGateway>::new())
            .configure(|cfg| configure_webhooks::<SqliteDatabase, PayOsGateway>(cfg, &access))
            .service(payment_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers the webhook handler on every path in [`WEBHOOK_PATHS`], each behind the IP whitelist. Must be called
/// before the `/payment` scope is registered, or that scope would shadow the webhook.
pub fn configure_webhooks<B, G>(cfg: &mut web::ServiceConfig, access: &WebhookAccess)
where
    B: OrderStore + 'static,
    G: CheckoutLinkGateway + 'static,
{
    for path in WEBHOOK_PATHS {
        let access = access.clone();
        let scope = web::scope(path)
            .wrap_fn(move |req, srv| {
                if access.allows(req.request()) {
                    Either::Left(srv.call(req))
                } else {
                    Either::Right(ok(req.error_response(ServerError::ForbiddenPeer)))
                }
            })
            .service(PayosWebhookRoute::<B, G>::new());
        cfg.service(scope);
    }
}

/// SQLite creates missing database files, but not missing directories.
fn ensure_database_dir(url: &str) -> Result<(), ServerError> {
    let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            info!("💻️ Creating database directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
            Ok(())
        },
        _ => Ok(()),
    }
}
