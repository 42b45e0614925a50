use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{opportunistic_sweep, AppState};
use crate::auth::AuthIdentity;
use crate::domain::Money;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub gateway_order_id: String,
    pub amount: Money,
    pub currency: String,
}

/// POST /checkout: total the live cart and register a pending payment with
/// the gateway.
///
/// Nothing is reserved or decremented here beyond what the cart already
/// holds; the stock commitment happens at payment verification.
pub async fn checkout(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
) -> Result<Json<CheckoutResponse>, AppError> {
    let cutoff = state.reservations.expiry_cutoff();
    opportunistic_sweep(&state, cutoff).await;

    let lines = state.repo.list_lines(&identity, cutoff).await?;
    if lines.is_empty() {
        return Err(AppError::InputInvalid("cart is empty".to_string()));
    }

    let mut total = Money::zero();
    for line in &lines {
        let product = state
            .repo
            .get_product(&line.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", line.product_id)))?;
        total = total + product.price.times(line.quantity);
    }

    let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
    let order = state
        .gateway
        .create_order(total, &state.config.currency, &receipt)
        .await
        .map_err(|e| AppError::GatewayUnavailable(e.to_string()))?;

    info!(
        identity = %identity,
        gateway_order_id = %order.id,
        amount = %order.amount,
        "Checkout registered gateway order"
    );

    Ok(Json(CheckoutResponse {
        gateway_order_id: order.id,
        amount: order.amount,
        currency: order.currency,
    }))
}
