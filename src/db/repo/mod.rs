//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `cart.rs` - Cart line reservations, expiry sweeping, availability reads
//! - `orders.rs` - Order materialization and idempotency lookups
//!
//! Catalog (`products`) and session (`sessions`) access lives here in
//! `mod.rs`: both tables are owned by other parts of the storefront, and the
//! engine consumes them as read paths. The seeding writers exist for
//! deployments and tests, never for request handling.

mod cart;
mod orders;

pub use orders::{ExpectedItem, MaterializeOutcome, MaterializeTxError};

use crate::domain::{Identity, Money, Product, ProductId, TimeMs};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Catalog read path (products are owned by the catalog service)
    // =========================================================================

    /// Look up a product by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, sqlx::Error> {
        let row = sqlx::query("SELECT id, name, price, stock FROM products WHERE id = ?")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| parse_product_row(&r)))
    }

    /// Insert or replace a catalog row.
    ///
    /// Seeding path only: catalog rows are maintained by the storefront's
    /// catalog service, and the engine never calls this while serving
    /// requests.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn upsert_product(&self, product: &Product) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, stock)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                stock = excluded.stock
            "#,
        )
        .bind(product.id.as_str())
        .bind(product.name.as_str())
        .bind(product.price.to_canonical_string())
        .bind(product.stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Session read path (sessions are owned by the auth layer)
    // =========================================================================

    /// Resolve an opaque session token to the identity it was issued for.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn identity_for_token(&self, token: &str) -> Result<Option<Identity>, sqlx::Error> {
        let row = sqlx::query("SELECT identity FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Identity::new(r.get::<String, _>("identity"))))
    }

    /// Record a session token for an identity.
    ///
    /// Seeding path only, mirroring `upsert_product`: in production the auth
    /// layer writes these rows.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_session(&self, token: &str, identity: &Identity) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, identity, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET identity = excluded.identity
            "#,
        )
        .bind(token)
        .bind(identity.as_str())
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_product_row(row: &sqlx::sqlite::SqliteRow) -> Product {
    let price_str: String = row.get("price");
    Product {
        id: ProductId::new(row.get::<String, _>("id")),
        name: row.get("name"),
        price: Money::from_str_canonical(&price_str).unwrap_or_default(),
        stock: row.get("stock"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
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

    fn test_product(id: &str, price: &str, stock: i64) -> Product {
        Product::new(
            ProductId::new(id),
            format!("Product {}", id),
            Money::from_str_canonical(price).unwrap(),
            stock,
        )
    }

    #[tokio::test]
    async fn test_upsert_and_get_product() {
        let (repo, _temp) = setup_test_db().await;

        let product = test_product("sku-1", "19.99", 10);
        repo.upsert_product(&product).await.expect("upsert failed");

        let fetched = repo
            .get_product(&product.id)
            .await
            .expect("query failed")
            .expect("product missing");
        assert_eq!(fetched, product);
    }

    #[tokio::test]
    async fn test_upsert_product_replaces_existing() {
        let (repo, _temp) = setup_test_db().await;

        repo.upsert_product(&test_product("sku-1", "19.99", 10))
            .await
            .unwrap();
        repo.upsert_product(&test_product("sku-1", "24.99", 3))
            .await
            .unwrap();

        let fetched = repo
            .get_product(&ProductId::new("sku-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.stock, 3);
        assert_eq!(fetched.price.to_canonical_string(), "24.99");
    }

    #[tokio::test]
    async fn test_get_product_missing_is_none() {
        let (repo, _temp) = setup_test_db().await;

        let fetched = repo.get_product(&ProductId::new("nope")).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_session_token_resolution() {
        let (repo, _temp) = setup_test_db().await;

        let identity = Identity::new("shopper-1");
        repo.insert_session("tok-abc", &identity).await.unwrap();

        let resolved = repo.identity_for_token("tok-abc").await.unwrap();
        assert_eq!(resolved, Some(identity));

        let unknown = repo.identity_for_token("tok-zzz").await.unwrap();
        assert!(unknown.is_none());
    }
}
