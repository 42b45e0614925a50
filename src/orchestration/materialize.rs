//! Order materialization: convert a verified payment into a durable order.
//!
//! Thin on purpose. The repository transaction does the re-validation and
//! the atomic writes; this service owns input checks, TTL arithmetic, the
//! error taxonomy mapping, and the logging around the one failure mode that
//! needs a human (payment taken, order not written).

use crate::db::{ExpectedItem, MaterializeOutcome, MaterializeTxError, Repository};
use crate::domain::{Identity, Money, Order, TimeMs};
use crate::engine::VerifiedPayment;
use crate::error::AppError;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct OrderMaterializer {
    repo: Arc<Repository>,
    ttl_seconds: i64,
}

impl OrderMaterializer {
    pub fn new(repo: Arc<Repository>, ttl_seconds: i64) -> Self {
        Self { repo, ttl_seconds }
    }

    /// Materialize a verified payment into an order.
    ///
    /// Taking a [`VerifiedPayment`] rather than a raw confirmation means an
    /// unverified signature cannot reach this path by construction.
    ///
    /// # Errors
    /// `CartMismatch` when the live cart diverged from the snapshot (cart
    /// intact, shopper re-checks out), `PaymentSucceededOrderPending` when a
    /// write failed after validation (needs reconciliation), and
    /// `StoreUnavailable` for failures before any write (safe to retry).
    pub async fn materialize(
        &self,
        identity: &Identity,
        payment: &VerifiedPayment,
        expected: &[ExpectedItem],
        expected_total: Money,
    ) -> Result<Order, AppError> {
        if expected.is_empty() {
            return Err(AppError::InputInvalid(
                "expected items must not be empty".to_string(),
            ));
        }
        if expected.iter().any(|item| item.quantity <= 0) {
            return Err(AppError::InputInvalid(
                "expected item quantities must be positive".to_string(),
            ));
        }

        let now = TimeMs::now();
        let cutoff = now.minus_seconds(self.ttl_seconds);

        let outcome = self
            .repo
            .create_order_transactional(
                identity,
                payment.gateway_order_id(),
                payment.gateway_payment_id(),
                expected,
                expected_total,
                cutoff,
                now,
            )
            .await;

        match outcome {
            Ok(MaterializeOutcome::Created(order)) => {
                info!(
                    order_id = %order.id,
                    identity = %identity,
                    total = %order.total,
                    "Order created"
                );
                Ok(order)
            }
            Ok(MaterializeOutcome::AlreadyExists(order)) => {
                info!(
                    order_id = %order.id,
                    gateway_order_id = payment.gateway_order_id(),
                    gateway_payment_id = payment.gateway_payment_id(),
                    "Payment already materialized, returning existing order"
                );
                Ok(order)
            }
            Err(MaterializeTxError::CartMismatch(detail)) => Err(AppError::CartMismatch(detail)),
            Err(MaterializeTxError::Unavailable(e)) => {
                Err(AppError::StoreUnavailable(e.to_string()))
            }
            Err(MaterializeTxError::WriteFailed(detail)) => {
                error!(
                    gateway_order_id = payment.gateway_order_id(),
                    gateway_payment_id = payment.gateway_payment_id(),
                    identity = %identity,
                    error = %detail,
                    "Payment succeeded but order write failed; needs reconciliation"
                );
                Err(AppError::PaymentSucceededOrderPending {
                    gateway_order_id: payment.gateway_order_id().to_string(),
                    gateway_payment_id: payment.gateway_payment_id().to_string(),
                })
            }
        }
    }
}
