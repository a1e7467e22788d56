//! Connects the engine's [`CheckoutLinkGateway`] to the PayOS merchant API.
use checkout_engine::{
    db_types::OrderCode,
    traits::{CheckoutLink, CheckoutLinkRequest, GatewayError, PaymentLinkStatus, ProviderLinkStatus},
    CheckoutLinkGateway,
};
use log::*;
use payos_tools::{PayOsApi, PayOsApiError, PaymentLinkInformation, PaymentRequest};

#[derive(Clone)]
pub struct PayOsGateway {
    api: PayOsApi,
}

impl PayOsGateway {
    pub fn new(api: PayOsApi) -> Self {
        Self { api }
    }
}

impl CheckoutLinkGateway for PayOsGateway {
    async fn create_checkout_link(&self, request: CheckoutLinkRequest) -> Result<CheckoutLink, GatewayError> {
        let req = PaymentRequest {
            order_code: request.order_code.value(),
            amount: request.amount,
            description: request.description,
            cancel_url: request.cancel_url,
            return_url: request.return_url,
        };
        let result = self.api.create_payment_request(&req).await.map_err(to_gateway_error)?;
        if result.checkout_url.is_empty() {
            warn!("💳️ PayOS created a payment request for order {} without a checkout URL", req.order_code);
            return Err(GatewayError::InvalidResponse("The payment request has no checkout URL".into()));
        }
        Ok(CheckoutLink { checkout_url: result.checkout_url, payment_link_id: result.payment_link_id })
    }

    async fn fetch_payment_link(&self, order_code: OrderCode) -> Result<PaymentLinkStatus, GatewayError> {
        let info = self.api.get_payment_request(order_code.value()).await.map_err(to_gateway_error)?;
        link_status(order_code, info)
    }

    async fn cancel_payment_link(
        &self,
        order_code: OrderCode,
        reason: Option<String>,
    ) -> Result<PaymentLinkStatus, GatewayError> {
        let info =
            self.api.cancel_payment_request(order_code.value(), reason.as_deref()).await.map_err(to_gateway_error)?;
        link_status(order_code, info)
    }
}

fn to_gateway_error(e: PayOsApiError) -> GatewayError {
    match e {
        PayOsApiError::Rejected { code, desc } => GatewayError::Rejected { code, desc },
        PayOsApiError::Initialization(_) | PayOsApiError::RestResponseError(_) | PayOsApiError::QueryError { .. } => {
            GatewayError::Transport(e.to_string())
        },
        PayOsApiError::JsonError(_) | PayOsApiError::EmptyResponse | PayOsApiError::InvalidSignature(_) => {
            GatewayError::InvalidResponse(e.to_string())
        },
    }
}

/// Fails if PayOS answered about some other order.
fn link_status(order_code: OrderCode, info: PaymentLinkInformation) -> Result<PaymentLinkStatus, GatewayError> {
    if info.order_code != order_code.value() {
        warn!("💳️ Asked PayOS about order {order_code}, but the answer is for order {}", info.order_code);
        return Err(GatewayError::InvalidResponse(format!(
            "Expected payment link for order {order_code}, got order {}",
            info.order_code
        )));
    }
    let reference = info.transactions.iter().rev().map(|t| t.reference.trim()).find(|r| !r.is_empty()).map(String::from);
    Ok(PaymentLinkStatus {
        order_code,
        payment_link_id: Some(info.id).filter(|id| !id.is_empty()),
        status: ProviderLinkStatus::from(info.status.as_str()),
        amount: info.amount,
        amount_paid: info.amount_paid,
        reference,
        cancellation_reason: info.cancellation_reason.filter(|r| !r.is_empty()),
    })
}
