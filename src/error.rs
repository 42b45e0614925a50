use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InputInvalid(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Insufficient stock: {available} available")]
    InsufficientStock { available: i64 },
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Cart changed since payment was initiated: {0}")]
    CartMismatch(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Payment signature invalid")]
    SignatureInvalid,
    #[error("Payment succeeded but order is pending ({gateway_order_id}/{gateway_payment_id})")]
    PaymentSucceededOrderPending {
        gateway_order_id: String,
        gateway_payment_id: String,
    },
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable reason code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config-error",
            AppError::InputInvalid(_) => "input-invalid",
            AppError::NotFound(_) => "not-found",
            AppError::InsufficientStock { .. } => "insufficient-stock",
            AppError::Unauthenticated => "unauthenticated",
            AppError::CartMismatch(_) => "cart-changed",
            AppError::StoreUnavailable(_) => "store-unavailable",
            AppError::SignatureInvalid => "signature-invalid",
            AppError::PaymentSucceededOrderPending { .. } => "payment-succeeded-order-pending",
            AppError::GatewayUnavailable(_) => "gateway-unavailable",
            AppError::Internal(_) => "internal-error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InputInvalid(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::CartMismatch(_) => StatusCode::CONFLICT,
            // Transient and retryable; must never read as an empty cart or
            // zero stock.
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::SignatureInvalid => StatusCode::BAD_REQUEST,
            AppError::PaymentSucceededOrderPending { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::InsufficientStock { available } => Json(json!({
                "error": self.code(),
                "message": self.to_string(),
                "available": available,
            })),
            AppError::PaymentSucceededOrderPending {
                gateway_order_id,
                gateway_payment_id,
            } => Json(json!({
                "error": self.code(),
                "message": format!(
                    "Your payment was received but the order could not be confirmed. \
                     Please contact support with reference {}/{}.",
                    gateway_order_id, gateway_payment_id
                ),
                "gatewayOrderId": gateway_order_id,
                "gatewayPaymentId": gateway_payment_id,
            })),
            _ => Json(json!({
                "error": self.code(),
                "message": self.to_string(),
            })),
        };

        (status, body).into_response()
    }
}
