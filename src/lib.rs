//! Postgres Driver Adapter Library
//!
//! A uniform query and transaction surface over two ways of reaching Postgres:
//! a pool of persistent connections (sqlx) and a stateless SQL-over-HTTP
//! endpoint. Results come back with every column tagged by a [`ColumnType`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::Config;
pub use db::{Adapter, ColumnType, Queryable, Transaction, map_column_type};
pub use error::{DbError, DbResult};
