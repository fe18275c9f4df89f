//! Shared types for the print relay
//!
//! The order payloads served by the relay endpoints of the main application,
//! plus the money helpers used wherever amounts are shown to a human.

pub mod models;
pub mod money;

// Re-exports
pub use models::{
    FulfillmentMethod, Modifier, Order, OrderIdBody, OrderItem, OrdersResponse, RejectedOrder,
};
pub use money::{format_money, line_total, round_money};
pub use rust_decimal::Decimal;
