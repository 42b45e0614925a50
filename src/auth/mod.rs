//! Bearer-token authentication backed by the sessions table.

use crate::api::AppState;
use crate::domain::Identity;
use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The authenticated shopper, resolved from the `Authorization` header.
///
/// Cart and payment handlers take this as an argument, so a route cannot
/// forget the check and still compile against an identity.
#[derive(Debug, Clone)]
pub struct AuthIdentity(pub Identity);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let token = bearer_token(header).ok_or(AppError::Unauthenticated)?;

        state
            .repo
            .identity_for_token(token)
            .await?
            .map(AuthIdentity)
            .ok_or(AppError::Unauthenticated)
    }
}

fn bearer_token(header_value: Option<&str>) -> Option<&str> {
    let token = header_value?.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
