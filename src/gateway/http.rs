//! HTTP payment gateway client.

use super::{GatewayError, GatewayOrder, PaymentGateway};
use crate::domain::Money;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Payment gateway client using the gateway's REST orders API.
///
/// Authenticates with HTTP basic auth (key id / key secret), the scheme the
/// hosted-checkout gateways this engine targets all use.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    /// Create a new HTTP payment gateway client.
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            key_id,
            key_secret,
        }
    }

    async fn post_orders(
        &self,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}/orders", self.base_url);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&url)
                .basic_auth(&self.key_id, Some(&self.key_secret))
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(GatewayError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(GatewayError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(GatewayError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(GatewayError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(GatewayError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        debug!(
            "Creating gateway order for amount={}, currency={}, receipt={}",
            amount, currency, receipt
        );

        let payload = serde_json::json!({
            "amount": amount.to_canonical_string(),
            "currency": currency,
            "receipt": receipt
        });

        let response = self.post_orders(payload).await?;

        parse_gateway_order(&response, amount, currency)
    }
}

fn parse_gateway_order(
    order_json: &serde_json::Value,
    requested_amount: Money,
    requested_currency: &str,
) -> Result<GatewayOrder, GatewayError> {
    let id = order_json
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::ParseError("Missing id field".to_string()))?
        .to_string();

    // Gateways echo amount and currency back; fall back to what we sent when
    // the echo is absent.
    let amount = match order_json.get("amount").and_then(|v| v.as_str()) {
        Some(amount_str) => Money::from_str_canonical(amount_str)
            .map_err(|e| GatewayError::ParseError(format!("Invalid amount: {}", e)))?,
        None => requested_amount,
    };

    let currency = order_json
        .get("currency")
        .and_then(|v| v.as_str())
        .unwrap_or(requested_currency)
        .to_string();

    Ok(GatewayOrder {
        id,
        amount,
        currency,
    })
}
