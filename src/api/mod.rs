pub mod cart;
pub mod checkout;
pub mod health;
pub mod payment;

use crate::config::Config;
use crate::db::Repository;
use crate::domain::TimeMs;
use crate::engine::PaymentVerifier;
use crate::gateway::PaymentGateway;
use crate::orchestration::{MergeService, OrderMaterializer, ReservationService};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub reservations: Arc<ReservationService>,
    pub merger: Arc<MergeService>,
    pub materializer: Arc<OrderMaterializer>,
    pub verifier: Arc<PaymentVerifier>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config, gateway: Arc<dyn PaymentGateway>) -> Self {
        let reservations = Arc::new(ReservationService::new(
            repo.clone(),
            config.reservation_ttl_seconds,
        ));
        let merger = Arc::new(MergeService::new(reservations.clone(), repo.clone()));
        let materializer = Arc::new(OrderMaterializer::new(
            repo.clone(),
            config.reservation_ttl_seconds,
        ));
        let verifier = Arc::new(PaymentVerifier::new(config.gateway_key_secret.clone()));

        Self {
            repo,
            config,
            reservations,
            merger,
            materializer,
            verifier,
            gateway,
        }
    }
}

/// Sweep is garbage collection; a failure here must never fail the request
/// that triggered it.
pub(crate) async fn opportunistic_sweep(state: &AppState, cutoff: TimeMs) {
    if let Err(e) = state.repo.sweep_expired(cutoff).await {
        warn!(error = %e, "Opportunistic sweep failed");
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/cart",
            post(cart::add_to_cart)
                .put(cart::set_cart_line)
                .get(cart::get_cart)
                .delete(cart::remove_from_cart),
        )
        .route("/cart/merge", post(cart::merge_cart))
        .route("/checkout", post(checkout::checkout))
        .route("/payment/verify", post(payment::verify_payment))
        .layer(cors)
        .with_state(state)
}
