//! Connection-related data models.
//!
//! This module defines the connection modes, SQL flavour and transaction state
//! shared by the adapter and its strategies.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// SQL dialect spoken by a queryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavour {
    Postgres,
}

impl std::fmt::Display for Flavour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// How the adapter reaches the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Persistent connections checked out of a pool
    #[default]
    Pooled,
    /// One-shot SQL-over-HTTP requests (no transactions)
    Http,
}

impl ConnectionMode {
    /// Whether this mode can hold a connection across statements.
    pub fn supports_transactions(&self) -> bool {
        matches!(self, Self::Pooled)
    }
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pooled => write!(f, "pooled"),
            Self::Http => write!(f, "HTTP"),
        }
    }
}

/// Transaction state for checked-out transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

impl TransactionState {
    /// Check if the transaction is still active.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check if the transaction has ended (committed or rolled back).
    pub fn is_ended(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Committed => write!(f, "committed"),
            Self::RolledBack => write!(f, "rolled back"),
        }
    }
}

/// Options a transaction was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    /// When false the caller issues `BEGIN` itself through `execute_raw`.
    pub use_phantom_query: bool,
}
