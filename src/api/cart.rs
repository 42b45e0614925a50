use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{opportunistic_sweep, AppState};
use crate::auth::AuthIdentity;
use crate::domain::{CartLine, EphemeralLine, Identity, ProductId};
use crate::engine::ReserveIntent;
use crate::error::AppError;
use crate::orchestration::{MergeRejection, ReserveOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineDto {
    pub product_id: String,
    pub quantity: i64,
    pub reserved_at: i64,
}

impl From<CartLine> for CartLineDto {
    fn from(line: CartLine) -> Self {
        CartLineDto {
            product_id: line.product_id.as_str().to_string(),
            quantity: line.quantity,
            reserved_at: line.reserved_at.as_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub line: CartLineDto,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub lines: Vec<EphemeralLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    pub merged: Vec<CartLineDto>,
    pub rejected: Vec<MergeRejection>,
    pub clear_mirror: bool,
}

/// POST /cart: add units to a line (delta semantics).
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Json(req): Json<CartLineRequest>,
) -> Result<Json<CartLineResponse>, AppError> {
    let product_id = parse_product_id(&req.product_id)?;
    apply_reservation(&state, &identity, &product_id, ReserveIntent::Add(req.quantity)).await
}

/// PUT /cart: set a line's quantity outright.
pub async fn set_cart_line(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Json(req): Json<CartLineRequest>,
) -> Result<Json<CartLineResponse>, AppError> {
    let product_id = parse_product_id(&req.product_id)?;
    apply_reservation(&state, &identity, &product_id, ReserveIntent::Set(req.quantity)).await
}

/// GET /cart: the shopper's live lines.
pub async fn get_cart(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
) -> Result<Json<CartResponse>, AppError> {
    let cutoff = state.reservations.expiry_cutoff();
    opportunistic_sweep(&state, cutoff).await;
    let lines = state.repo.list_lines(&identity, cutoff).await?;
    Ok(Json(CartResponse {
        lines: lines.into_iter().map(Into::into).collect(),
    }))
}

/// DELETE /cart: remove one line, or the whole cart when no product is named.
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    body: Option<Json<RemoveRequest>>,
) -> Result<Json<RemoveResponse>, AppError> {
    match body.and_then(|Json(req)| req.product_id) {
        Some(raw) => {
            let product_id = parse_product_id(&raw)?;
            let removed = state.repo.remove_line(&identity, &product_id).await?;
            if !removed {
                return Err(AppError::NotFound(format!("cart line {}", product_id)));
            }
        }
        None => {
            state.repo.clear_cart(&identity).await?;
        }
    }

    Ok(Json(RemoveResponse { success: true }))
}

/// POST /cart/merge: fold an ephemeral pre-login cart into the durable one.
pub async fn merge_cart(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Json(req): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, AppError> {
    let report = state.merger.merge(&identity, &req.lines).await?;

    Ok(Json(MergeResponse {
        merged: report.merged.into_iter().map(Into::into).collect(),
        rejected: report.rejected,
        clear_mirror: report.clear_mirror,
    }))
}

async fn apply_reservation(
    state: &AppState,
    identity: &Identity,
    product_id: &ProductId,
    intent: ReserveIntent,
) -> Result<Json<CartLineResponse>, AppError> {
    match state.reservations.reserve(identity, product_id, intent).await? {
        ReserveOutcome::Admitted(line) => Ok(Json(CartLineResponse { line: line.into() })),
        ReserveOutcome::Rejected { available, .. } => {
            Err(AppError::InsufficientStock { available })
        }
    }
}

fn parse_product_id(raw: &str) -> Result<ProductId, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::InputInvalid("productId must not be empty".into()));
    }
    Ok(ProductId::new(raw))
}
