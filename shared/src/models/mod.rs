//! Data models
//!
//! Mirror the JSON the main application serialises for `/api/print-relay/*`.
//! Field names are camelCase on the wire.

pub mod order;

// Re-exports
pub use order::*;
