//! Order types and the gateway payment confirmation they are built from.

use crate::domain::{Identity, Money, ProductId, TimeMs};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A signed payment confirmation as delivered by the gateway callback.
///
/// Transient: consumed exactly once by order materialization, never stored
/// on its own. The (order id, payment id) pair is the idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    /// Gateway-side order identifier, created at checkout.
    pub gateway_order_id: String,
    /// Gateway-side payment identifier.
    pub gateway_payment_id: String,
    /// Hex-encoded HMAC-SHA256 over `"{order_id}|{payment_id}"`.
    pub signature: String,
}

impl PaymentConfirmation {
    /// The idempotency key this confirmation materializes under.
    pub fn payment_reference(&self) -> String {
        format!("{}:{}", self.gateway_order_id, self.gateway_payment_id)
    }
}

/// Order lifecycle status.
///
/// This engine only ever creates `Paid` orders; later fulfilment states are
/// owned elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Payment verified and stock committed.
    Paid,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Paid => write!(f, "paid"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(OrderStatus::Paid),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

/// One product line inside an order, with its price frozen at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Purchased product.
    pub product_id: ProductId,
    /// Units purchased.
    pub quantity: i64,
    /// Unit price captured at materialization.
    pub unit_price: Money,
}

impl OrderItem {
    /// The line total (unit price times quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A durable order produced by materializing a verified payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier.
    pub id: Uuid,
    /// Owning identity.
    pub identity: Identity,
    /// Purchased lines with prices at purchase.
    pub items: Vec<OrderItem>,
    /// Sum of line totals.
    pub total: Money,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Gateway order id half of the idempotency key.
    pub gateway_order_id: String,
    /// Gateway payment id half of the idempotency key.
    pub gateway_payment_id: String,
    /// Creation time.
    pub created_at: TimeMs,
}

impl Order {
    /// Sum the line totals of `items`.
    pub fn total_of(items: &[OrderItem]) -> Money {
        items.iter().map(OrderItem::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product: &str, quantity: i64, unit_price: &str) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(product),
            quantity,
            unit_price: Money::from_str_canonical(unit_price).unwrap(),
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item("p", 3, "19.99").line_total().to_canonical_string(), "59.97");
    }

    #[test]
    fn test_total_of_items() {
        let items = vec![item("a", 2, "10"), item("b", 1, "20")];
        assert_eq!(Order::total_of(&items).to_canonical_string(), "40");
    }

    #[test]
    fn test_payment_reference_format() {
        let confirmation = PaymentConfirmation {
            gateway_order_id: "order_9".to_string(),
            gateway_payment_id: "pay_4".to_string(),
            signature: "ab".to_string(),
        };
        assert_eq!(confirmation.payment_reference(), "order_9:pay_4");
    }

    #[test]
    fn test_order_status_roundtrip() {
        let parsed: OrderStatus = OrderStatus::Paid.to_string().parse().unwrap();
        assert_eq!(parsed, OrderStatus::Paid);
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_confirmation_deserializes_camel_case() {
        let confirmation: PaymentConfirmation = serde_json::from_str(
            r#"{"gatewayOrderId":"o1","gatewayPaymentId":"p1","signature":"00ff"}"#,
        )
        .unwrap();
        assert_eq!(confirmation.gateway_order_id, "o1");
    }
}
