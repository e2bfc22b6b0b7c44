//! Data models for the driver adapter.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionMode, Flavour, TransactionOptions, TransactionState};
pub use query::{FieldDescription, Query, QueryOutput, QueryParam, ResultSet};
