//! Cart line operations: reservation rows, TTL expiry, availability reads.

use crate::domain::{CartLine, Identity, ProductId, TimeMs};
use sqlx::Row;

use super::Repository;

impl Repository {
    /// Insert a cart line or add `quantity` to an existing one.
    ///
    /// Refreshes `reserved_at` on the surviving row. Returns the resulting
    /// line.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn upsert_line(
        &self,
        identity: &Identity,
        product_id: &ProductId,
        quantity: i64,
        reserved_at: TimeMs,
    ) -> Result<CartLine, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cart_lines (identity, product_id, quantity, reserved_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(identity, product_id) DO UPDATE SET
                quantity = quantity + excluded.quantity,
                reserved_at = excluded.reserved_at
            "#,
        )
        .bind(identity.as_str())
        .bind(product_id.as_str())
        .bind(quantity)
        .bind(reserved_at.as_ms())
        .execute(&self.pool)
        .await?;

        self.fetch_line(identity, product_id).await
    }

    /// Insert a cart line or replace an existing one's quantity outright.
    ///
    /// Refreshes `reserved_at`. Returns the resulting line.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn set_line(
        &self,
        identity: &Identity,
        product_id: &ProductId,
        quantity: i64,
        reserved_at: TimeMs,
    ) -> Result<CartLine, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cart_lines (identity, product_id, quantity, reserved_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(identity, product_id) DO UPDATE SET
                quantity = excluded.quantity,
                reserved_at = excluded.reserved_at
            "#,
        )
        .bind(identity.as_str())
        .bind(product_id.as_str())
        .bind(quantity)
        .bind(reserved_at.as_ms())
        .execute(&self.pool)
        .await?;

        self.fetch_line(identity, product_id).await
    }

    /// Get one cart line by its composite key, expired or not.
    ///
    /// Callers that care about expiry apply the cutoff themselves or sweep
    /// first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_line(
        &self,
        identity: &Identity,
        product_id: &ProductId,
    ) -> Result<Option<CartLine>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT identity, product_id, quantity, reserved_at
            FROM cart_lines
            WHERE identity = ? AND product_id = ?
            "#,
        )
        .bind(identity.as_str())
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| parse_line_row(&r)))
    }

    async fn fetch_line(
        &self,
        identity: &Identity,
        product_id: &ProductId,
    ) -> Result<CartLine, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT identity, product_id, quantity, reserved_at
            FROM cart_lines
            WHERE identity = ? AND product_id = ?
            "#,
        )
        .bind(identity.as_str())
        .bind(product_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(parse_line_row(&row))
    }

    /// List an identity's live cart lines, ordered by product id.
    ///
    /// Lines with `reserved_at` before `cutoff` are excluded even when a
    /// sweep has not removed them yet.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_lines(
        &self,
        identity: &Identity,
        cutoff: TimeMs,
    ) -> Result<Vec<CartLine>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT identity, product_id, quantity, reserved_at
            FROM cart_lines
            WHERE identity = ? AND reserved_at >= ?
            ORDER BY product_id ASC
            "#,
        )
        .bind(identity.as_str())
        .bind(cutoff.as_ms())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(parse_line_row).collect())
    }

    /// Remove one cart line. Returns true if a line existed.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn remove_line(
        &self,
        identity: &Identity,
        product_id: &ProductId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE identity = ? AND product_id = ?")
            .bind(identity.as_str())
            .bind(product_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove all of an identity's cart lines. Returns the number removed.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn clear_cart(&self, identity: &Identity) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE identity = ?")
            .bind(identity.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete every cart line older than `cutoff`, across all identities.
    ///
    /// Pure garbage collection: expired lines are already invisible to
    /// availability math and listings via their cutoff predicates.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn sweep_expired(&self, cutoff: TimeMs) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE reserved_at < ?")
            .bind(cutoff.as_ms())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Available stock for a product: catalog stock minus live reservations.
    ///
    /// A single statement, so the subtraction sees one consistent snapshot.
    /// Lines reserved before `cutoff` never count. When `excluding` is set,
    /// that identity's own lines are left out of the reserved sum, which is
    /// the view admission control needs when the shopper adjusts their own
    /// line.
    ///
    /// Returns `None` for an unknown product.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn available_stock(
        &self,
        product_id: &ProductId,
        cutoff: TimeMs,
        excluding: Option<&Identity>,
    ) -> Result<Option<i64>, sqlx::Error> {
        let sql = if excluding.is_some() {
            r#"
            SELECT p.stock - COALESCE((
                SELECT SUM(c.quantity)
                FROM cart_lines c
                WHERE c.product_id = p.id AND c.reserved_at >= ? AND c.identity != ?
            ), 0) AS available
            FROM products p
            WHERE p.id = ?
            "#
        } else {
            r#"
            SELECT p.stock - COALESCE((
                SELECT SUM(c.quantity)
                FROM cart_lines c
                WHERE c.product_id = p.id AND c.reserved_at >= ?
            ), 0) AS available
            FROM products p
            WHERE p.id = ?
            "#
        };

        let mut query = sqlx::query(sql).bind(cutoff.as_ms());
        if let Some(identity) = excluding {
            query = query.bind(identity.as_str());
        }
        query = query.bind(product_id.as_str());

        let row = query.fetch_optional(&self.pool).await?;

        Ok(row.map(|r| r.get::<i64, _>("available")))
    }
}

fn parse_line_row(row: &sqlx::sqlite::SqliteRow) -> CartLine {
    CartLine {
        identity: Identity::new(row.get::<String, _>("identity")),
        product_id: ProductId::new(row.get::<String, _>("product_id")),
        quantity: row.get("quantity"),
        reserved_at: TimeMs::new(row.get("reserved_at")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{Money, Product};
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    async fn seed_product(repo: &Repository, id: &str, stock: i64) {
        let product = Product::new(
            ProductId::new(id),
            format!("Product {id}"),
            Money::from_str_canonical("19.99").unwrap(),
            stock,
        );
        repo.upsert_product(&product).await.expect("seed failed");
    }

    async fn backdate_line(repo: &Repository, identity: &str, product_id: &str, reserved_at: i64) {
        sqlx::query(
            "UPDATE cart_lines SET reserved_at = ? WHERE identity = ? AND product_id = ?",
        )
        .bind(reserved_at)
        .bind(identity)
        .bind(product_id)
        .execute(repo.pool())
        .await
        .expect("backdate failed");
    }

    #[tokio::test]
    async fn test_upsert_creates_line() {
        let (repo, _temp) = setup_test_db().await;
        let alice = Identity::new("alice");
        let sku = ProductId::new("sku-1");

        let line = repo
            .upsert_line(&alice, &sku, 2, TimeMs::new(1000))
            .await
            .expect("upsert failed");

        assert_eq!(line.quantity, 2);
        assert_eq!(line.reserved_at.as_ms(), 1000);
        assert_eq!(line.identity, alice);
        assert_eq!(line.product_id, sku);
    }

    #[tokio::test]
    async fn test_upsert_accumulates_and_refreshes_timestamp() {
        let (repo, _temp) = setup_test_db().await;
        let alice = Identity::new("alice");
        let sku = ProductId::new("sku-1");

        repo.upsert_line(&alice, &sku, 2, TimeMs::new(1000))
            .await
            .unwrap();
        let line = repo
            .upsert_line(&alice, &sku, 3, TimeMs::new(2000))
            .await
            .unwrap();

        assert_eq!(line.quantity, 5);
        assert_eq!(line.reserved_at.as_ms(), 2000, "timestamp should refresh");
    }

    #[tokio::test]
    async fn test_set_line_replaces_quantity() {
        let (repo, _temp) = setup_test_db().await;
        let alice = Identity::new("alice");
        let sku = ProductId::new("sku-1");

        repo.upsert_line(&alice, &sku, 5, TimeMs::new(1000))
            .await
            .unwrap();
        let line = repo.set_line(&alice, &sku, 2, TimeMs::new(2000)).await.unwrap();

        assert_eq!(line.quantity, 2, "set should replace, not add");
        assert_eq!(line.reserved_at.as_ms(), 2000);
    }

    #[tokio::test]
    async fn test_remove_line_reports_existence() {
        let (repo, _temp) = setup_test_db().await;
        let alice = Identity::new("alice");
        let sku = ProductId::new("sku-1");

        repo.upsert_line(&alice, &sku, 1, TimeMs::new(1000))
            .await
            .unwrap();

        assert!(repo.remove_line(&alice, &sku).await.unwrap());
        assert!(!repo.remove_line(&alice, &sku).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_cart_removes_all_lines_for_identity() {
        let (repo, _temp) = setup_test_db().await;
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");

        repo.upsert_line(&alice, &ProductId::new("sku-1"), 1, TimeMs::new(1000))
            .await
            .unwrap();
        repo.upsert_line(&alice, &ProductId::new("sku-2"), 2, TimeMs::new(1000))
            .await
            .unwrap();
        repo.upsert_line(&bob, &ProductId::new("sku-1"), 3, TimeMs::new(1000))
            .await
            .unwrap();

        let removed = repo.clear_cart(&alice).await.unwrap();
        assert_eq!(removed, 2);

        let bobs = repo.list_lines(&bob, TimeMs::new(0)).await.unwrap();
        assert_eq!(bobs.len(), 1, "other identities' lines must survive");
    }

    #[tokio::test]
    async fn test_list_lines_excludes_expired() {
        let (repo, _temp) = setup_test_db().await;
        let alice = Identity::new("alice");

        repo.upsert_line(&alice, &ProductId::new("sku-live"), 1, TimeMs::new(5000))
            .await
            .unwrap();
        repo.upsert_line(&alice, &ProductId::new("sku-stale"), 1, TimeMs::new(5000))
            .await
            .unwrap();
        backdate_line(&repo, "alice", "sku-stale", 100).await;

        let lines = repo.list_lines(&alice, TimeMs::new(1000)).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id.as_str(), "sku-live");
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_stale_lines() {
        let (repo, _temp) = setup_test_db().await;
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");

        repo.upsert_line(&alice, &ProductId::new("sku-1"), 1, TimeMs::new(5000))
            .await
            .unwrap();
        repo.upsert_line(&bob, &ProductId::new("sku-1"), 2, TimeMs::new(5000))
            .await
            .unwrap();
        backdate_line(&repo, "bob", "sku-1", 100).await;

        let swept = repo.sweep_expired(TimeMs::new(1000)).await.unwrap();
        assert_eq!(swept, 1);

        assert!(repo
            .get_line(&alice, &ProductId::new("sku-1"))
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .get_line(&bob, &ProductId::new("sku-1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_available_stock_subtracts_live_reservations() {
        let (repo, _temp) = setup_test_db().await;
        seed_product(&repo, "sku-1", 10).await;

        repo.upsert_line(&Identity::new("alice"), &ProductId::new("sku-1"), 4, TimeMs::new(5000))
            .await
            .unwrap();
        repo.upsert_line(&Identity::new("bob"), &ProductId::new("sku-1"), 3, TimeMs::new(5000))
            .await
            .unwrap();

        let available = repo
            .available_stock(&ProductId::new("sku-1"), TimeMs::new(1000), None)
            .await
            .unwrap();
        assert_eq!(available, Some(3));
    }

    #[tokio::test]
    async fn test_available_stock_excluding_own_identity() {
        let (repo, _temp) = setup_test_db().await;
        seed_product(&repo, "sku-1", 10).await;

        let alice = Identity::new("alice");
        repo.upsert_line(&alice, &ProductId::new("sku-1"), 4, TimeMs::new(5000))
            .await
            .unwrap();
        repo.upsert_line(&Identity::new("bob"), &ProductId::new("sku-1"), 3, TimeMs::new(5000))
            .await
            .unwrap();

        let available = repo
            .available_stock(&ProductId::new("sku-1"), TimeMs::new(1000), Some(&alice))
            .await
            .unwrap();
        assert_eq!(available, Some(7), "own reservation must not count");
    }

    #[tokio::test]
    async fn test_available_stock_ignores_expired_reservations() {
        let (repo, _temp) = setup_test_db().await;
        seed_product(&repo, "sku-1", 10).await;

        repo.upsert_line(&Identity::new("alice"), &ProductId::new("sku-1"), 9, TimeMs::new(5000))
            .await
            .unwrap();
        backdate_line(&repo, "alice", "sku-1", 100).await;

        let available = repo
            .available_stock(&ProductId::new("sku-1"), TimeMs::new(1000), None)
            .await
            .unwrap();
        assert_eq!(
            available,
            Some(10),
            "expired lines release stock before any sweep runs"
        );
    }

    #[tokio::test]
    async fn test_available_stock_unknown_product_is_none() {
        let (repo, _temp) = setup_test_db().await;

        let available = repo
            .available_stock(&ProductId::new("ghost"), TimeMs::new(0), None)
            .await
            .unwrap();
        assert_eq!(available, None);
    }

    #[tokio::test]
    async fn test_available_stock_can_go_negative_after_restock_shrink() {
        let (repo, _temp) = setup_test_db().await;
        seed_product(&repo, "sku-1", 5).await;

        repo.upsert_line(&Identity::new("alice"), &ProductId::new("sku-1"), 5, TimeMs::new(5000))
            .await
            .unwrap();
        seed_product(&repo, "sku-1", 3).await;

        let available = repo
            .available_stock(&ProductId::new("sku-1"), TimeMs::new(1000), None)
            .await
            .unwrap();
        assert_eq!(available, Some(-2));
    }
}
