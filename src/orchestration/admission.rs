//! Reservation admission: the single write path into the cart.
//!
//! Admission arithmetic is pure (see `engine::admission`); this service
//! supplies the atomicity. A per-product async mutex is held across the
//! availability read and the cart write, so two requests for the same
//! product can never both admit against the same free units. Requests for
//! different products proceed in parallel.

use crate::db::Repository;
use crate::domain::{CartLine, Identity, ProductId, TimeMs};
use crate::engine::{decide, Decision, ReserveIntent};
use crate::error::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

/// Outcome of a reservation attempt.
///
/// Rejection for lack of stock is an outcome, not an error: merge processes
/// it per line and the cart API turns it into an insufficient-stock response.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// The write happened; this is the resulting line.
    Admitted(CartLine),
    /// The request did not fit. `available` is the most this identity could
    /// hold in total right now.
    Rejected { requested: i64, available: i64 },
}

#[derive(Clone)]
pub struct ReservationService {
    repo: Arc<Repository>,
    ttl_seconds: i64,
    // One entry per product touched since boot; bounded by catalog size.
    locks: Arc<StdMutex<HashMap<ProductId, Arc<TokioMutex<()>>>>>,
}

impl ReservationService {
    pub fn new(repo: Arc<Repository>, ttl_seconds: i64) -> Self {
        Self {
            repo,
            ttl_seconds,
            locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// The instant before which a `reserved_at` counts as expired, as of now.
    pub fn expiry_cutoff(&self) -> TimeMs {
        TimeMs::now().minus_seconds(self.ttl_seconds)
    }

    fn lock_for(&self, product_id: &ProductId) -> Arc<TokioMutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(product_id.clone())
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone()
    }

    /// Attempt to reserve stock for one cart line.
    ///
    /// Holds the product lock across the read-check-write sequence. The
    /// caller's own expired line, if any, is evicted first so it neither
    /// counts against them nor gets accumulated onto.
    ///
    /// # Errors
    /// `NotFound` for an unknown product, `InputInvalid` when the resulting
    /// quantity would be non-positive, `StoreUnavailable` on query failure.
    pub async fn reserve(
        &self,
        identity: &Identity,
        product_id: &ProductId,
        intent: ReserveIntent,
    ) -> Result<ReserveOutcome, AppError> {
        let lock = self.lock_for(product_id);
        let _guard = lock.lock().await;

        let now = TimeMs::now();
        let cutoff = now.minus_seconds(self.ttl_seconds);

        let own_quantity = match self.repo.get_line(identity, product_id).await? {
            Some(line) if line.reserved_at < cutoff => {
                self.repo.remove_line(identity, product_id).await?;
                0
            }
            Some(line) => line.quantity,
            None => 0,
        };

        let available = self
            .repo
            .available_stock(product_id, cutoff, Some(identity))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", product_id)))?;

        match decide(available, own_quantity, intent) {
            Decision::Invalid { resulting } => Err(AppError::InputInvalid(format!(
                "resulting quantity must be at least 1, got {}",
                resulting
            ))),
            Decision::Rejected { available } => {
                debug!(
                    identity = %identity,
                    product_id = %product_id,
                    available,
                    "Reservation rejected"
                );
                Ok(ReserveOutcome::Rejected {
                    requested: intent.resulting_quantity(own_quantity),
                    available,
                })
            }
            Decision::Admitted { new_quantity } => {
                let line = match intent {
                    ReserveIntent::Add(delta) => {
                        self.repo.upsert_line(identity, product_id, delta, now).await?
                    }
                    ReserveIntent::Set(_) => {
                        self.repo
                            .set_line(identity, product_id, new_quantity, now)
                            .await?
                    }
                };
                debug!(
                    identity = %identity,
                    product_id = %product_id,
                    quantity = line.quantity,
                    "Reservation admitted"
                );
                Ok(ReserveOutcome::Admitted(line))
            }
        }
    }
}
