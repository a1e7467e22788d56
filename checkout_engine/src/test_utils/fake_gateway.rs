//! A [`CheckoutLinkGateway`] that never leaves the process.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    db_types::OrderCode,
    traits::{
        CheckoutLink,
        CheckoutLinkGateway,
        CheckoutLinkRequest,
        GatewayError,
        PaymentLinkStatus,
        ProviderLinkStatus,
    },
};

#[derive(Debug, Default)]
struct FakeGatewayState {
    created: Vec<CheckoutLinkRequest>,
    links: HashMap<OrderCode, PaymentLinkStatus>,
    next_error: Option<GatewayError>,
}

/// Mints links of the form `https://pay.example.com/web/link-{orderCode}` and remembers them, so tests can inspect
/// what was requested and script what the "provider" reports next.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeGatewayState>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_links(&self) -> Vec<CheckoutLinkRequest> {
        self.state.lock().map(|s| s.created.clone()).unwrap_or_default()
    }

    /// The next call, whatever it is, fails with `error`.
    pub fn fail_next_with(&self, error: GatewayError) {
        if let Ok(mut state) = self.state.lock() {
            state.next_error = Some(error);
        }
    }

    pub fn set_link_status(&self, order_code: OrderCode, status: ProviderLinkStatus, reference: Option<String>) {
        if let Ok(mut state) = self.state.lock() {
            let link = state.links.entry(order_code).or_insert_with(|| pending_link(order_code, 0));
            link.status = status;
            link.reference = reference;
        }
    }

    fn take_error(&self) -> Result<(), GatewayError> {
        let mut state = self.state.lock().map_err(|e| GatewayError::Transport(e.to_string()))?;
        match state.next_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn pending_link(order_code: OrderCode, amount: i64) -> PaymentLinkStatus {
    PaymentLinkStatus {
        order_code,
        payment_link_id: Some(format!("link-{order_code}")),
        status: ProviderLinkStatus::Pending,
        amount,
        amount_paid: 0,
        reference: None,
        cancellation_reason: None,
    }
}

impl CheckoutLinkGateway for FakeGateway {
    async fn create_checkout_link(&self, request: CheckoutLinkRequest) -> Result<CheckoutLink, GatewayError> {
        self.take_error()?;
        let code = request.order_code;
        let mut state = self.state.lock().map_err(|e| GatewayError::Transport(e.to_string()))?;
        state.links.insert(code, pending_link(code, request.amount));
        state.created.push(request);
        Ok(CheckoutLink {
            checkout_url: format!("https://pay.example.com/web/link-{code}"),
            payment_link_id: format!("link-{code}"),
        })
    }

    async fn fetch_payment_link(&self, order_code: OrderCode) -> Result<PaymentLinkStatus, GatewayError> {
        self.take_error()?;
        let state = self.state.lock().map_err(|e| GatewayError::Transport(e.to_string()))?;
        state.links.get(&order_code).cloned().ok_or_else(|| GatewayError::Rejected {
            code: "101".into(),
            desc: format!("Payment request for order {order_code} does not exist"),
        })
    }

    async fn cancel_payment_link(
        &self,
        order_code: OrderCode,
        reason: Option<String>,
    ) -> Result<PaymentLinkStatus, GatewayError> {
        self.take_error()?;
        let mut state = self.state.lock().map_err(|e| GatewayError::Transport(e.to_string()))?;
        let link = state.links.entry(order_code).or_insert_with(|| pending_link(order_code, 0));
        link.status = ProviderLinkStatus::Cancelled;
        link.cancellation_reason = reason;
        Ok(link.clone())
    }
}
