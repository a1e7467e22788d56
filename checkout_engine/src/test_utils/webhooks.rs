//! Builds webhook bodies signed the way PayOS signs them.
use checkout_common::{calculate_signature, canonical_data};
use serde_json::{json, Map, Value};

pub const TEST_CHECKSUM_KEY: &str = "1a54716c8f0efb2744fb28b6e38b25da7f67a925d98bc1c18bd8faaecadd7675";

/// Wraps `data` in a webhook envelope and signs it with [`TEST_CHECKSUM_KEY`].
pub fn signed_webhook(data: Value) -> Vec<u8> {
    signed_webhook_with_key(data, TEST_CHECKSUM_KEY)
}

pub fn signed_webhook_with_key(data: Value, key: &str) -> Vec<u8> {
    let map = match &data {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let signature = calculate_signature(key, &canonical_data(&map));
    let body = json!({ "code": "00", "desc": "success", "success": true, "data": data, "signature": signature });
    serde_json::to_vec(&body).unwrap_or_default()
}

/// A successful payment notification for `order_code`.
pub fn paid_webhook(order_code: i64, amount: i64, reference: &str) -> Vec<u8> {
    signed_webhook(json!({
        "orderCode": order_code,
        "amount": amount,
        "description": format!("CS{order_code}"),
        "accountNumber": "12345678",
        "reference": reference,
        "transactionDateTime": "2024-05-01 10:02:00",
        "currency": "VND",
        "paymentLinkId": format!("link-{order_code}"),
        "code": "00",
        "desc": "success",
        "counterAccountBankId": "",
        "counterAccountBankName": "",
        "counterAccountName": null,
        "counterAccountNumber": null,
        "virtualAccountName": "",
        "virtualAccountNumber": ""
    }))
}
