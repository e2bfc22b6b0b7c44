//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - The `Queryable` capability shared by strategies, adapters and transactions
//! - Pooled and stateless (HTTP) connection strategies
//! - Transactions on checked-out connections
//! - Column type mapping
//! - sqlx and SQL-over-HTTP client bindings

pub mod adapter;
pub mod client;
pub mod http;
pub mod postgres;
pub mod queryable;
pub mod strategy;
pub mod transaction;
pub mod types;

pub use adapter::Adapter;
pub use client::{ConnectionPool, HttpQueryOptions, PoolConnection, QueryFunction};
pub use http::NeonHttpClient;
pub use postgres::create_pool;
pub use queryable::Queryable;
pub use strategy::{ConnectionStrategy, PooledStrategy, StatelessStrategy};
pub use transaction::Transaction;
pub use types::{ColumnType, map_column_type};
