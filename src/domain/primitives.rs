//! Domain primitives: Identity, ProductId, TimeMs.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// This time moved back by the given number of seconds, saturating at zero.
    pub fn minus_seconds(&self, seconds: i64) -> Self {
        TimeMs(self.0.saturating_sub(seconds.saturating_mul(1000)))
    }
}

/// The stable key under which a durable cart and orders are tracked.
///
/// Issued by the authentication layer; opaque to this engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub String);

impl Identity {
    /// Create an Identity from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Identity(id.into())
    }

    /// Get the identity as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog identifier of a product.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    /// Create a ProductId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        ProductId(id.into())
    }

    /// Get the product id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timems_ordering() {
        let t1 = TimeMs::new(1000);
        let t2 = TimeMs::new(2000);
        assert!(t1 < t2);
    }

    #[test]
    fn test_timems_minus_seconds() {
        let t = TimeMs::new(10_000);
        assert_eq!(t.minus_seconds(3).as_ms(), 7_000);
        assert_eq!(t.minus_seconds(11).as_ms(), 0);
    }

    #[test]
    fn test_identity_display() {
        let id = Identity::new("shopper-42");
        assert_eq!(id.to_string(), "shopper-42");
        assert_eq!(id.as_str(), "shopper-42");
    }

    #[test]
    fn test_product_id_display() {
        let pid = ProductId::new("sku-101");
        assert_eq!(pid.to_string(), "sku-101");
    }
}
