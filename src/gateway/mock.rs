//! Mock payment gateway for testing without network calls.

use super::{GatewayError, GatewayOrder, PaymentGateway};
use crate::domain::Money;
use async_trait::async_trait;

/// Mock payment gateway that returns a predefined order id.
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    order_id: String,
    failure: Option<GatewayError>,
}

impl MockPaymentGateway {
    /// Create a new mock gateway returning a fixed order id.
    pub fn new() -> Self {
        Self {
            order_id: "order_mock".to_string(),
            failure: None,
        }
    }

    /// Set the order id returned by create_order.
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = order_id.into();
        self
    }

    /// Make every create_order call fail with the given error.
    pub fn failing(mut self, error: GatewayError) -> Self {
        self.failure = Some(error);
        self
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        Ok(GatewayOrder {
            id: self.order_id.clone(),
            amount,
            currency: currency.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_gateway_echoes_amount_and_currency() {
        let mock = MockPaymentGateway::new().with_order_id("order_42");
        let order = mock
            .create_order(Money::from_str_canonical("59.97").unwrap(), "INR", "rcpt_1")
            .await
            .unwrap();
        assert_eq!(order.id, "order_42");
        assert_eq!(order.amount.to_canonical_string(), "59.97");
        assert_eq!(order.currency, "INR");
    }

    #[tokio::test]
    async fn test_mock_gateway_failure() {
        let mock = MockPaymentGateway::new().failing(GatewayError::RateLimited);
        let result = mock
            .create_order(Money::from_str_canonical("10").unwrap(), "INR", "rcpt_1")
            .await;
        assert!(matches!(result, Err(GatewayError::RateLimited)));
    }
}
