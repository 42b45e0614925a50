//! Cart line types: the durable reservation and its client-held mirror.

use crate::domain::{Identity, Money, ProductId, TimeMs};
use serde::{Deserialize, Serialize};

/// A durable cart line: one identity's soft claim on a product's stock.
///
/// Keyed by (identity, product_id). `reserved_at` is refreshed on every
/// mutation of the line and drives TTL expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Owning identity.
    pub identity: Identity,
    /// Reserved product.
    pub product_id: ProductId,
    /// Units reserved; strictly positive.
    pub quantity: i64,
    /// Last mutation time; lines older than the TTL are expired.
    pub reserved_at: TimeMs,
}

impl CartLine {
    /// Create a new CartLine reserved now.
    pub fn new(identity: Identity, product_id: ProductId, quantity: i64) -> Self {
        CartLine {
            identity,
            product_id,
            quantity,
            reserved_at: TimeMs::now(),
        }
    }

    /// Whether this line is older than the TTL as of `now`.
    pub fn is_expired(&self, now: TimeMs, ttl_seconds: i64) -> bool {
        self.reserved_at < now.minus_seconds(ttl_seconds)
    }
}

/// A client-held cart line from before the shopper authenticated.
///
/// Untrusted input: only `product_id` and `quantity` are consulted by the
/// merge. Name, price, and image are display baggage the client carried and
/// are re-derived from the catalog once the line lands server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemeralLine {
    /// Product identifier as the client knew it.
    pub product_id: ProductId,
    /// Display name the client cached.
    #[serde(default)]
    pub name: Option<String>,
    /// Price the client cached; advisory only.
    #[serde(default)]
    pub price: Option<Money>,
    /// Image reference for rendering; ignored here.
    #[serde(default)]
    pub image: Option<String>,
    /// Requested units.
    pub quantity: i64,
    /// Optional size/variant selector.
    #[serde(default)]
    pub variant: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_line_expiry() {
        let mut line = CartLine::new(Identity::new("a"), ProductId::new("p"), 2);
        let now = TimeMs::now();
        assert!(!line.is_expired(now, 7200));

        line.reserved_at = now.minus_seconds(7201);
        assert!(line.is_expired(now, 7200));
    }

    #[test]
    fn test_cart_line_at_ttl_boundary_not_expired() {
        let mut line = CartLine::new(Identity::new("a"), ProductId::new("p"), 2);
        let now = TimeMs::now();
        line.reserved_at = now.minus_seconds(7200);
        assert!(!line.is_expired(now, 7200));
    }

    #[test]
    fn test_ephemeral_line_deserializes_minimal_payload() {
        let line: EphemeralLine =
            serde_json::from_str(r#"{"productId": "sku-1", "quantity": 3}"#).unwrap();
        assert_eq!(line.product_id.as_str(), "sku-1");
        assert_eq!(line.quantity, 3);
        assert_eq!(line.name, None);
        assert_eq!(line.variant, None);
    }

    #[test]
    fn test_ephemeral_line_accepts_full_payload() {
        let line: EphemeralLine = serde_json::from_str(
            r#"{"productId":"sku-1","name":"Tote","price":24.5,"image":"tote.jpg","quantity":1,"variant":"M"}"#,
        )
        .unwrap();
        assert_eq!(line.variant.as_deref(), Some("M"));
        assert_eq!(line.price, Some(Money::from_str_canonical("24.5").unwrap()));
    }
}
