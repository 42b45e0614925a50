//! Order persistence: idempotency lookups and the materialization
//! transaction that converts a cart into a durable order.

use crate::domain::{Identity, Money, Order, OrderItem, OrderStatus, ProductId, TimeMs};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::Repository;

/// One line of the client-submitted cart snapshot, as the caller believes it
/// to be at payment time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Result of a successful materialization call.
#[derive(Debug, Clone)]
pub enum MaterializeOutcome {
    /// A new order was committed.
    Created(Order),
    /// An order for this payment pair already existed; it is returned
    /// unchanged and nothing was written.
    AlreadyExists(Order),
}

impl MaterializeOutcome {
    pub fn order(self) -> Order {
        match self {
            MaterializeOutcome::Created(order) => order,
            MaterializeOutcome::AlreadyExists(order) => order,
        }
    }
}

#[derive(Debug, Error)]
pub enum MaterializeTxError {
    /// The live cart diverged from the submitted snapshot; nothing was
    /// written and the cart is intact.
    #[error("cart mismatch: {0}")]
    CartMismatch(String),
    /// Infrastructure failure before any write; safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    /// A write inside the atomic step failed. The transaction rolled back,
    /// so stock and cart are untouched, but the payment has already been
    /// taken; callers must surface this as the pending-order state.
    #[error("order write failed: {0}")]
    WriteFailed(String),
}

impl Repository {
    /// Look up an order by its gateway payment pair.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_order_by_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        fetch_order_by_payment(&mut conn, gateway_order_id, gateway_payment_id).await
    }

    /// Materialize a verified payment into a durable order.
    ///
    /// Inside one transaction: check the payment pair for an existing order,
    /// re-validate the live cart against the submitted snapshot, then
    /// decrement stock, insert the order and its items with prices captured
    /// now, and delete the identity's cart lines. The three effects commit
    /// together or not at all.
    ///
    /// # Errors
    /// See [`MaterializeTxError`]; only `WriteFailed` means a failure after
    /// validation, which callers must report as payment-succeeded-order-
    /// pending rather than a generic error.
    pub async fn create_order_transactional(
        &self,
        identity: &Identity,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        expected: &[ExpectedItem],
        expected_total: Money,
        cutoff: TimeMs,
        now: TimeMs,
    ) -> Result<MaterializeOutcome, MaterializeTxError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(MaterializeTxError::Unavailable)?;

        // Idempotency: at most one order per payment pair.
        if let Some(existing) =
            fetch_order_by_payment(&mut tx, gateway_order_id, gateway_payment_id)
                .await
                .map_err(MaterializeTxError::Unavailable)?
        {
            return Ok(MaterializeOutcome::AlreadyExists(existing));
        }

        // Live cart with unit prices, one snapshot.
        let rows = sqlx::query(
            r#"
            SELECT c.product_id, c.quantity, p.price
            FROM cart_lines c
            JOIN products p ON p.id = c.product_id
            WHERE c.identity = ? AND c.reserved_at >= ?
            ORDER BY c.product_id ASC
            "#,
        )
        .bind(identity.as_str())
        .bind(cutoff.as_ms())
        .fetch_all(&mut *tx)
        .await
        .map_err(MaterializeTxError::Unavailable)?;

        let current: Vec<(String, i64, Money)> = rows
            .iter()
            .map(|row| {
                let product_id: String = row.get("product_id");
                let quantity: i64 = row.get("quantity");
                let price_str: String = row.get("price");
                let price = Money::from_str_canonical(&price_str).unwrap_or_else(|e| {
                    warn!(product_id = %product_id, price = %price_str, error = %e,
                        "Failed to parse product price decimal, using default");
                    Money::default()
                });
                (product_id, quantity, price)
            })
            .collect();

        check_snapshot(&current, expected, expected_total)?;

        // Atomic step: from here on, any failure is post-payment and must be
        // surfaced as the pending-order state by the caller.
        for (product_id, quantity, _) in &current {
            let result = sqlx::query(
                "UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?",
            )
            .bind(quantity)
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| MaterializeTxError::WriteFailed(e.to_string()))?;

            if result.rows_affected() == 0 {
                return Err(MaterializeTxError::WriteFailed(format!(
                    "stock underflow for product {}",
                    product_id
                )));
            }
        }

        let order_id = Uuid::new_v4();
        let total: Money = current
            .iter()
            .map(|(_, quantity, price)| price.times(*quantity))
            .sum();

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (id, identity, total, status, gateway_order_id, gateway_payment_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(gateway_order_id, gateway_payment_id) DO NOTHING
            "#,
        )
        .bind(order_id.to_string())
        .bind(identity.as_str())
        .bind(total.to_canonical_string())
        .bind(OrderStatus::Paid.to_string())
        .bind(gateway_order_id)
        .bind(gateway_payment_id)
        .bind(now.as_ms())
        .execute(&mut *tx)
        .await
        .map_err(|e| MaterializeTxError::WriteFailed(e.to_string()))?;

        if inserted.rows_affected() == 0 {
            // Lost the idempotency race to a concurrent materialization.
            // Roll back our effects and return the winner's order.
            drop(tx);
            let winner = self
                .get_order_by_payment(gateway_order_id, gateway_payment_id)
                .await
                .map_err(MaterializeTxError::Unavailable)?
                .ok_or_else(|| {
                    MaterializeTxError::WriteFailed(
                        "idempotency conflict but no existing order found".to_string(),
                    )
                })?;
            return Ok(MaterializeOutcome::AlreadyExists(winner));
        }

        let mut items = Vec::with_capacity(current.len());
        for (product_id, quantity, price) in &current {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(order_id.to_string())
            .bind(product_id)
            .bind(quantity)
            .bind(price.to_canonical_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| MaterializeTxError::WriteFailed(e.to_string()))?;

            items.push(OrderItem {
                product_id: ProductId::new(product_id.clone()),
                quantity: *quantity,
                unit_price: *price,
            });
        }

        // The cart is consumed whole, expired strays included.
        sqlx::query("DELETE FROM cart_lines WHERE identity = ?")
            .bind(identity.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| MaterializeTxError::WriteFailed(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| MaterializeTxError::WriteFailed(e.to_string()))?;

        Ok(MaterializeOutcome::Created(Order {
            id: order_id,
            identity: identity.clone(),
            items,
            total,
            status: OrderStatus::Paid,
            gateway_order_id: gateway_order_id.to_string(),
            gateway_payment_id: gateway_payment_id.to_string(),
            created_at: now,
        }))
    }
}

/// Exact-multiset comparison of the live cart against the submitted
/// snapshot, plus a total recomputed from current prices.
fn check_snapshot(
    current: &[(String, i64, Money)],
    expected: &[ExpectedItem],
    expected_total: Money,
) -> Result<(), MaterializeTxError> {
    let mut want: BTreeMap<&str, i64> = BTreeMap::new();
    for item in expected {
        *want.entry(item.product_id.as_str()).or_insert(0) += item.quantity;
    }

    let have: BTreeMap<&str, i64> = current
        .iter()
        .map(|(product_id, quantity, _)| (product_id.as_str(), *quantity))
        .collect();

    for (product_id, wanted) in &want {
        match have.get(product_id) {
            Some(held) if held == wanted => {}
            Some(held) => {
                return Err(MaterializeTxError::CartMismatch(format!(
                    "product {} expected {} unit(s), cart holds {}",
                    product_id, wanted, held
                )))
            }
            None => {
                return Err(MaterializeTxError::CartMismatch(format!(
                    "product {} expected {} unit(s), cart holds none",
                    product_id, wanted
                )))
            }
        }
    }
    for product_id in have.keys() {
        if !want.contains_key(product_id) {
            return Err(MaterializeTxError::CartMismatch(format!(
                "cart holds product {} that was not in the submitted snapshot",
                product_id
            )));
        }
    }

    let total: Money = current
        .iter()
        .map(|(_, quantity, price)| price.times(*quantity))
        .sum();
    if total != expected_total {
        return Err(MaterializeTxError::CartMismatch(format!(
            "expected total {} but cart totals {}",
            expected_total.to_canonical_string(),
            total.to_canonical_string()
        )));
    }

    Ok(())
}

async fn fetch_order_by_payment(
    conn: &mut SqliteConnection,
    gateway_order_id: &str,
    gateway_payment_id: &str,
) -> Result<Option<Order>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, identity, total, status, gateway_order_id, gateway_payment_id, created_at
        FROM orders
        WHERE gateway_order_id = ? AND gateway_payment_id = ?
        "#,
    )
    .bind(gateway_order_id)
    .bind(gateway_payment_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str).unwrap_or_else(|e| {
        warn!(order_id = %id_str, error = %e, "Failed to parse order id, using nil");
        Uuid::nil()
    });
    let total_str: String = row.get("total");
    let total = Money::from_str_canonical(&total_str).unwrap_or_else(|e| {
        warn!(order_id = %id_str, total = %total_str, error = %e,
            "Failed to parse order total decimal, using default");
        Money::default()
    });
    let status_str: String = row.get("status");
    let status: OrderStatus = status_str.parse().unwrap_or_else(|e| {
        warn!(order_id = %id_str, error = %e, "Unknown order status, using paid");
        OrderStatus::Paid
    });

    let item_rows = sqlx::query(
        r#"
        SELECT product_id, quantity, unit_price
        FROM order_items
        WHERE order_id = ?
        ORDER BY product_id ASC
        "#,
    )
    .bind(&id_str)
    .fetch_all(&mut *conn)
    .await?;

    let items = item_rows
        .iter()
        .map(|item_row| {
            let product_id: String = item_row.get("product_id");
            let price_str: String = item_row.get("unit_price");
            let unit_price = Money::from_str_canonical(&price_str).unwrap_or_else(|e| {
                warn!(order_id = %id_str, product_id = %product_id, error = %e,
                    "Failed to parse order item price decimal, using default");
                Money::default()
            });
            OrderItem {
                product_id: ProductId::new(product_id),
                quantity: item_row.get("quantity"),
                unit_price,
            }
        })
        .collect();

    Ok(Some(Order {
        id,
        identity: Identity::new(row.get::<String, _>("identity")),
        items,
        total,
        status,
        gateway_order_id: row.get("gateway_order_id"),
        gateway_payment_id: row.get("gateway_payment_id"),
        created_at: TimeMs::new(row.get("created_at")),
    }))
}
