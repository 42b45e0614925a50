//! Domain types for the cart-to-order consistency engine.
//!
//! This module provides:
//! - Lossless monetary handling via the Money wrapper
//! - Domain primitives: Identity, ProductId, TimeMs
//! - Cart, product, and order types with canonical JSON serialization

pub mod cart;
pub mod money;
pub mod order;
pub mod primitives;
pub mod product;

pub use cart::{CartLine, EphemeralLine};
pub use money::Money;
pub use order::{Order, OrderItem, OrderStatus, PaymentConfirmation};
pub use primitives::{Identity, ProductId, TimeMs};
pub use product::Product;
