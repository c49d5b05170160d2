// service/gateway.rs
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::service::error::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Thin client for the payment gateway's order/payment REST API. All money
/// movement, authorization and capture happen on the gateway's side; this
/// service only creates orders, fetches authoritative payment state, and
/// checks signatures.
#[derive(Debug, Clone)]
pub struct GatewayService {
    key_id: String,
    key_secret: String,
    webhook_secret: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub method: Option<String>,
}

impl GatewayService {
    pub fn new(config: &Config) -> Self {
        Self {
            key_id: config.gateway_key_id.clone(),
            key_secret: config.gateway_key_secret.clone(),
            webhook_secret: config.gateway_webhook_secret.clone(),
            base_url: config.gateway_base_url.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Public key id, safe to hand to the checkout frontend.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    fn basic_auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.key_id, self.key_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }

    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
        notes: Value,
    ) -> Result<GatewayOrder, ServiceError> {
        let payload = serde_json::json!({
            "amount": amount,
            "currency": currency,
            "receipt": receipt,
            "notes": notes,
        });

        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .header("Authorization", self.basic_auth_header())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Gateway(format!(
                "order creation failed with {}: {}",
                status, body
            )));
        }

        response
            .json::<GatewayOrder>()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))
    }

    /// Fetches the authoritative payment state from the gateway.
    pub async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, ServiceError> {
        let response = self
            .http
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .header("Authorization", self.basic_auth_header())
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::Gateway(format!(
                "payment fetch failed with {}",
                response.status()
            )));
        }

        response
            .json::<GatewayPayment>()
            .await
            .map_err(|e| ServiceError::Gateway(e.to_string()))
    }

    /// Checkout signature: HMAC-SHA256 over "order_id|payment_id" with the
    /// key secret, hex-encoded, compared in constant time.
    pub fn verify_checkout_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        verify_signature(
            format!("{}|{}", order_id, payment_id).as_bytes(),
            signature,
            self.key_secret.as_bytes(),
        )
    }

    /// Webhook signature: HMAC-SHA256 over the exact raw request body with
    /// the webhook secret.
    pub fn verify_webhook_signature(&self, raw_body: &str, signature: &str) -> bool {
        verify_signature(raw_body.as_bytes(), signature, self.webhook_secret.as_bytes())
    }
}

fn verify_signature(message: &[u8], signature: &str, secret: &[u8]) -> bool {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message);

    let expected = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison to prevent timing attacks
    ConstantTimeEq::ct_eq(signature.as_bytes(), expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> GatewayService {
        GatewayService {
            key_id: "rzp_test_key".to_string(),
            key_secret: "checkout_secret".to_string(),
            webhook_secret: "webhook_secret".to_string(),
            base_url: "http://localhost:9000".to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn sign(message: &str, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_checkout_signature_accepts_valid() {
        let service = test_service();
        let signature = sign("order_123|pay_456", "checkout_secret");
        assert!(service.verify_checkout_signature("order_123", "pay_456", &signature));
    }

    #[test]
    fn test_checkout_signature_rejects_tampered_ids() {
        let service = test_service();
        let signature = sign("order_123|pay_456", "checkout_secret");
        assert!(!service.verify_checkout_signature("order_123", "pay_999", &signature));
    }

    #[test]
    fn test_checkout_signature_rejects_wrong_secret() {
        let service = test_service();
        let signature = sign("order_123|pay_456", "other_secret");
        assert!(!service.verify_checkout_signature("order_123", "pay_456", &signature));
    }

    #[test]
    fn test_webhook_signature_over_raw_body() {
        let service = test_service();
        let body = r#"{"event":"payment.captured","payload":{}}"#;
        let signature = sign(body, "webhook_secret");

        assert!(service.verify_webhook_signature(body, &signature));
        // Any re-serialization of the body must fail the check
        let reordered = r#"{"payload":{},"event":"payment.captured"}"#;
        assert!(!service.verify_webhook_signature(reordered, &signature));
    }
}
