//! Payment gateway abstraction for creating gateway-side orders at checkout.

use crate::domain::Money;
use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod mock;

pub use http::HttpPaymentGateway;
pub use mock::MockPaymentGateway;

/// A gateway-side order created at checkout.
///
/// The shopper pays against this order in the gateway's own UI; the id comes
/// back later inside the signed payment confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    /// Gateway-assigned order identifier.
    pub id: String,
    /// Amount the gateway will collect.
    pub amount: Money,
    /// ISO currency code the gateway will collect in.
    pub currency: String,
}

/// Payment gateway trait for registering a pending payment.
///
/// Implementations must handle retry/backoff and rate limiting.
#[async_trait]
pub trait PaymentGateway: Send + Sync + fmt::Debug {
    /// Create a gateway order for `amount`.
    ///
    /// # Arguments
    /// * `amount` - Total the shopper will be charged
    /// * `currency` - ISO currency code (e.g., "INR")
    /// * `receipt` - Merchant-side receipt reference, unique per checkout
    ///
    /// # Returns
    /// The created gateway order, including its gateway-assigned id.
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;
}

/// Error type for gateway operations.
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
    /// Other error
    Other(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            GatewayError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            GatewayError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            GatewayError::RateLimited => write!(f, "Rate limited"),
            GatewayError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}
