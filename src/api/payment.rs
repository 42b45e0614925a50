use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::auth::AuthIdentity;
use crate::db::ExpectedItem;
use crate::domain::{Money, Order, PaymentConfirmation, ProductId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    /// The cart as the client believes it to be; re-validated server-side.
    pub expected_items: Vec<ExpectedItemDto>,
    pub expected_total: Money,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedItemDto {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
    pub total: Money,
    pub items: Vec<OrderItemDto>,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

/// POST /payment/verify: check the gateway signature, then materialize the
/// cart into a durable order.
pub async fn verify_payment(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let confirmation = PaymentConfirmation {
        gateway_order_id: req.gateway_order_id,
        gateway_payment_id: req.gateway_payment_id,
        signature: req.signature,
    };

    let payment = state
        .verifier
        .verify(&confirmation)
        .map_err(|_| AppError::SignatureInvalid)?;

    let expected: Vec<ExpectedItem> = req
        .expected_items
        .into_iter()
        .map(|item| ExpectedItem {
            product_id: ProductId::new(item.product_id),
            quantity: item.quantity,
        })
        .collect();

    let order = state
        .materializer
        .materialize(&identity, &payment, &expected, req.expected_total)
        .await?;

    Ok(Json(order_response(order)))
}

fn order_response(order: Order) -> OrderResponse {
    OrderResponse {
        order_id: order.id.to_string(),
        status: order.status.to_string(),
        total: order.total,
        items: order
            .items
            .into_iter()
            .map(|item| OrderItemDto {
                product_id: item.product_id.as_str().to_string(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
        gateway_order_id: order.gateway_order_id,
        gateway_payment_id: order.gateway_payment_id,
        created_at: order.created_at.as_ms(),
    }
}
