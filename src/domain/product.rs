//! Product type: the catalog's view of a sellable item.

use crate::domain::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A catalog product as this engine sees it.
///
/// Owned by catalog storage. `stock` counts total units physically available
/// and is decremented only by order materialization; cart operations never
/// touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price in the store currency.
    pub price: Money,
    /// Total units physically available, before subtracting reservations.
    pub stock: i64,
}

impl Product {
    /// Create a new Product.
    pub fn new(id: ProductId, name: impl Into<String>, price: Money, stock: i64) -> Self {
        Product {
            id,
            name: name.into(),
            price,
            stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_creation() {
        let product = Product::new(
            ProductId::new("sku-101"),
            "Canvas Tote",
            Money::from_str_canonical("24.50").unwrap(),
            12,
        );
        assert_eq!(product.id.as_str(), "sku-101");
        assert_eq!(product.stock, 12);
    }

    #[test]
    fn test_product_serialization() {
        let product = Product::new(
            ProductId::new("sku-101"),
            "Canvas Tote",
            Money::from_str_canonical("24.50").unwrap(),
            12,
        );
        let json = serde_json::to_string(&product).unwrap();
        let deserialized: Product = serde_json::from_str(&json).unwrap();
        assert_eq!(product, deserialized);
    }
}
