use std::sync::Arc;

use checkout_common::{calculate_signature, canonical_data, verify_signature};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    config::PayOsConfig,
    data_objects::{CreatePaymentResult, PaymentLinkInformation, PaymentRequest, PayOsResponse},
    PayOsApiError,
};

#[derive(Clone)]
pub struct PayOsApi {
    config: PayOsConfig,
    client: Arc<Client>,
}

impl PayOsApi {
    pub fn new(config: PayOsConfig) -> Result<Self, PayOsApiError> {
        let mut headers = HeaderMap::with_capacity(3);
        let client_id =
            HeaderValue::from_str(&config.client_id).map_err(|e| PayOsApiError::Initialization(e.to_string()))?;
        let mut api_key = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| PayOsApiError::Initialization(e.to_string()))?;
        api_key.set_sensitive(true);
        headers.insert("x-client-id", client_id);
        headers.insert("x-api-key", api_key);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PayOsApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    /// Sends a request to PayOS and unwraps the response envelope. Any response code other than `"00"` is turned into
    /// [`PayOsApiError::Rejected`].
    pub async fn rest_query(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<PayOsResponse, PayOsApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| PayOsApiError::RestResponseError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| PayOsApiError::RestResponseError(e.to_string()))?;
            return Err(PayOsApiError::QueryError { status, message });
        }
        trace!("💳️ REST query successful. {}", response.status());
        let envelope =
            response.json::<PayOsResponse>().await.map_err(|e| PayOsApiError::JsonError(e.to_string()))?;
        if envelope.is_success() {
            Ok(envelope)
        } else {
            debug!("💳️ PayOS rejected the request. {} {}", envelope.code, envelope.desc);
            Err(PayOsApiError::Rejected { code: envelope.code, desc: envelope.desc })
        }
    }

    /// Creates a new payment request and returns the hosted checkout details.
    pub async fn create_payment_request(&self, req: &PaymentRequest) -> Result<CreatePaymentResult, PayOsApiError> {
        let signature = calculate_signature(self.config.checksum_key.reveal(), &req.signature_data());
        debug!("💳️ Creating payment request for order {} ({} VND)", req.order_code, req.amount);
        let response = self.rest_query(Method::POST, "/v2/payment-requests", Some(req.signed_body(signature))).await?;
        self.verify_response(&response)?;
        let result = extract_data::<CreatePaymentResult>(response)?;
        info!("💳️ Payment request {} created for order {}", result.payment_link_id, result.order_code);
        Ok(result)
    }

    /// Fetches the current state of the payment request for `order_code`.
    pub async fn get_payment_request(&self, order_code: i64) -> Result<PaymentLinkInformation, PayOsApiError> {
        let path = format!("/v2/payment-requests/{order_code}");
        debug!("💳️ Fetching payment request for order {order_code}");
        let response = self.rest_query(Method::GET, &path, None).await?;
        extract_data(response)
    }

    /// Cancels the payment request for `order_code`. PayOS returns the updated payment request.
    pub async fn cancel_payment_request(
        &self,
        order_code: i64,
        reason: Option<&str>,
    ) -> Result<PaymentLinkInformation, PayOsApiError> {
        let path = format!("/v2/payment-requests/{order_code}/cancel");
        let body = reason.map(|r| json!({ "cancellationReason": r })).unwrap_or_else(|| json!({}));
        debug!("💳️ Cancelling payment request for order {order_code}");
        let response = self.rest_query(Method::POST, &path, Some(body)).await?;
        let info = extract_data::<PaymentLinkInformation>(response)?;
        info!("💳️ Payment request for order {order_code} is now {}", info.status);
        Ok(info)
    }

    /// Payment request responses carry a signature over their `data` object. A response without a signature is
    /// accepted, since PayOS does not sign every response type.
    pub fn verify_response(&self, response: &PayOsResponse) -> Result<(), PayOsApiError> {
        verify_response_signature(self.config.checksum_key.reveal(), response)
    }
}

pub(crate) fn verify_response_signature(key: &str, response: &PayOsResponse) -> Result<(), PayOsApiError> {
    match (&response.data, &response.signature) {
        (Some(Value::Object(data)), Some(signature)) => {
            verify_signature(key, &canonical_data(data), signature).map_err(|e| {
                warn!("💳️ PayOS response signature check failed. {e}");
                PayOsApiError::InvalidSignature(e.to_string())
            })
        },
        _ => Ok(()),
    }
}

fn extract_data<T: DeserializeOwned>(response: PayOsResponse) -> Result<T, PayOsApiError> {
    let data = response.data.ok_or(PayOsApiError::EmptyResponse)?;
    if data.is_null() {
        return Err(PayOsApiError::EmptyResponse);
    }
    serde_json::from_value(data).map_err(|e| PayOsApiError::JsonError(e.to_string()))
}
