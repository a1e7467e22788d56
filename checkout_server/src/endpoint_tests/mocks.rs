use checkout_engine::{
    db_types::OrderCode,
    traits::{CheckoutLink, CheckoutLinkGateway, CheckoutLinkRequest, GatewayError, PaymentLinkStatus},
};
use mockall::mock;

mock! {
    pub Gateway {}
    impl CheckoutLinkGateway for Gateway {
        async fn create_checkout_link(&self, request: CheckoutLinkRequest) -> Result<CheckoutLink, GatewayError>;
        async fn fetch_payment_link(&self, order_code: OrderCode) -> Result<PaymentLinkStatus, GatewayError>;
        async fn cancel_payment_link(&self, order_code: OrderCode, reason: Option<String>) -> Result<PaymentLinkStatus, GatewayError>;
    }
}
