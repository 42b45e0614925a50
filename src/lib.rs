pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod orchestration;

pub use config::Config;
pub use db::{init_db, ExpectedItem, Repository};
pub use domain::{
    CartLine, EphemeralLine, Identity, Money, Order, OrderItem, OrderStatus, PaymentConfirmation,
    Product, ProductId, TimeMs,
};
pub use error::AppError;
pub use gateway::{
    GatewayError, GatewayOrder, HttpPaymentGateway, MockPaymentGateway, PaymentGateway,
};
