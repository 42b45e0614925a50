//! Cart merge: fold a client-held ephemeral cart into the durable one at
//! login.
//!
//! Each line goes through normal reservation admission, targeting the larger
//! of the durable quantity and the requested one. Replaying the same merge
//! therefore asks for the same target again and changes nothing, so a client
//! that crashed before clearing its mirror cannot double anything.

use crate::db::Repository;
use crate::domain::{CartLine, EphemeralLine, Identity};
use crate::engine::ReserveIntent;
use crate::error::AppError;
use crate::orchestration::admission::{ReservationService, ReserveOutcome};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// One ephemeral line the merge could not land, with the reason.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRejection {
    pub product_id: String,
    pub requested: i64,
    /// Machine-readable reason: mirrors the error codes of the cart API.
    pub reason: &'static str,
    /// Units this identity could still hold; only for insufficient stock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
}

/// What the merge did, line by line.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Durable lines as they stand after the merge.
    pub merged: Vec<CartLine>,
    /// Lines that could not be landed, each with a reason.
    pub rejected: Vec<MergeRejection>,
    /// The client clears its ephemeral mirror when this is true. Always true
    /// today: rejected lines are reported back, not kept client-side for a
    /// retry.
    pub clear_mirror: bool,
}

#[derive(Clone)]
pub struct MergeService {
    reservations: Arc<ReservationService>,
    repo: Arc<Repository>,
}

impl MergeService {
    pub fn new(reservations: Arc<ReservationService>, repo: Arc<Repository>) -> Self {
        Self { reservations, repo }
    }

    /// Merge ephemeral lines into `identity`'s durable cart, best-effort per
    /// line. A rejected line never aborts the rest.
    ///
    /// # Errors
    /// Only infrastructure failures abort the whole merge; the lines already
    /// landed stay landed, and replaying the merge is safe.
    pub async fn merge(
        &self,
        identity: &Identity,
        lines: &[EphemeralLine],
    ) -> Result<MergeReport, AppError> {
        let mut merged = Vec::new();
        let mut rejected = Vec::new();

        for line in lines {
            if line.quantity <= 0 {
                rejected.push(MergeRejection {
                    product_id: line.product_id.as_str().to_string(),
                    requested: line.quantity,
                    reason: "input-invalid",
                    available: None,
                });
                continue;
            }

            let cutoff = self.reservations.expiry_cutoff();
            let own_live = match self.repo.get_line(identity, &line.product_id).await? {
                Some(existing) if existing.reserved_at >= cutoff => existing.quantity,
                _ => 0,
            };
            let target = own_live.max(line.quantity);

            match self
                .reservations
                .reserve(identity, &line.product_id, ReserveIntent::Set(target))
                .await
            {
                Ok(ReserveOutcome::Admitted(landed)) => merged.push(landed),
                Ok(ReserveOutcome::Rejected { requested, available }) => {
                    rejected.push(MergeRejection {
                        product_id: line.product_id.as_str().to_string(),
                        requested,
                        reason: "insufficient-stock",
                        available: Some(available),
                    });
                }
                Err(AppError::NotFound(_)) => {
                    rejected.push(MergeRejection {
                        product_id: line.product_id.as_str().to_string(),
                        requested: line.quantity,
                        reason: "not-found",
                        available: None,
                    });
                }
                Err(AppError::InputInvalid(_)) => {
                    rejected.push(MergeRejection {
                        product_id: line.product_id.as_str().to_string(),
                        requested: line.quantity,
                        reason: "input-invalid",
                        available: None,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            identity = %identity,
            merged = merged.len(),
            rejected = rejected.len(),
            "Cart merge completed"
        );

        Ok(MergeReport {
            merged,
            rejected,
            clear_mirror: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{Money, Product, ProductId};
    use tempfile::TempDir;

    async fn setup_merge() -> (MergeService, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        let reservations = Arc::new(ReservationService::new(repo.clone(), 3600));
        let service = MergeService::new(reservations, repo.clone());
        (service, repo, temp_dir)
    }

    async fn seed_product(repo: &Repository, id: &str, stock: i64) {
        let product = Product::new(
            ProductId::new(id),
            format!("Product {}", id),
            Money::from_str_canonical("19.99").unwrap(),
            stock,
        );
        repo.upsert_product(&product).await.expect("seed failed");
    }

    fn ephemeral(product_id: &str, quantity: i64) -> EphemeralLine {
        EphemeralLine {
            product_id: ProductId::new(product_id),
            name: None,
            price: None,
            image: None,
            quantity,
            variant: None,
        }
    }

    #[tokio::test]
    async fn test_merge_lands_lines_into_empty_cart() {
        let (service, repo, _temp) = setup_merge().await;
        seed_product(&repo, "sku-1", 5).await;
        seed_product(&repo, "sku-2", 5).await;
        let alice = Identity::new("alice");

        let report = service
            .merge(&alice, &[ephemeral("sku-1", 2), ephemeral("sku-2", 1)])
            .await
            .unwrap();

        assert_eq!(report.merged.len(), 2);
        assert!(report.rejected.is_empty());
        assert!(report.clear_mirror);
    }

    #[tokio::test]
    async fn test_merge_twice_is_idempotent() {
        let (service, repo, _temp) = setup_merge().await;
        seed_product(&repo, "sku-1", 5).await;
        let alice = Identity::new("alice");
        let lines = [ephemeral("sku-1", 2)];

        service.merge(&alice, &lines).await.unwrap();
        let report = service.merge(&alice, &lines).await.unwrap();

        assert_eq!(report.merged.len(), 1);
        assert_eq!(
            report.merged[0].quantity, 2,
            "replay must not double the line"
        );
    }

    #[tokio::test]
    async fn test_merge_keeps_larger_durable_quantity() {
        let (service, repo, _temp) = setup_merge().await;
        seed_product(&repo, "sku-1", 5).await;
        let alice = Identity::new("alice");

        service.merge(&alice, &[ephemeral("sku-1", 4)]).await.unwrap();
        let report = service.merge(&alice, &[ephemeral("sku-1", 1)]).await.unwrap();

        assert_eq!(
            report.merged[0].quantity, 4,
            "merge never shrinks the durable cart"
        );
    }

    #[tokio::test]
    async fn test_merge_rejects_only_the_bad_lines() {
        let (service, repo, _temp) = setup_merge().await;
        seed_product(&repo, "sku-1", 5).await;
        seed_product(&repo, "sku-2", 1).await;
        let alice = Identity::new("alice");

        let report = service
            .merge(
                &alice,
                &[
                    ephemeral("sku-1", 2),
                    ephemeral("sku-2", 3),
                    ephemeral("ghost", 1),
                    ephemeral("sku-1", 0),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.merged.len(), 1);
        assert_eq!(report.merged[0].product_id.as_str(), "sku-1");
        assert_eq!(report.rejected.len(), 3);

        let insufficient = report
            .rejected
            .iter()
            .find(|r| r.product_id == "sku-2")
            .unwrap();
        assert_eq!(insufficient.reason, "insufficient-stock");
        assert_eq!(insufficient.available, Some(1));

        let missing = report
            .rejected
            .iter()
            .find(|r| r.product_id == "ghost")
            .unwrap();
        assert_eq!(missing.reason, "not-found");
        assert_eq!(missing.available, None);

        let invalid = report
            .rejected
            .iter()
            .find(|r| r.requested == 0)
            .unwrap();
        assert_eq!(invalid.reason, "input-invalid");
    }

    #[tokio::test]
    async fn test_merge_respects_other_shoppers_reservations() {
        let (service, repo, _temp) = setup_merge().await;
        seed_product(&repo, "sku-1", 5).await;

        service
            .merge(&Identity::new("bob"), &[ephemeral("sku-1", 4)])
            .await
            .unwrap();

        let report = service
            .merge(&Identity::new("alice"), &[ephemeral("sku-1", 2)])
            .await
            .unwrap();

        assert!(report.merged.is_empty());
        assert_eq!(report.rejected[0].available, Some(1));
    }
}
