//! Client seam.
//!
//! These traits describe what the adapter needs from the code that actually
//! speaks to Postgres. `db::postgres` implements the pooled pair for sqlx and
//! `db::http` implements [`QueryFunction`] for a SQL-over-HTTP endpoint; tests
//! substitute in-memory fakes.
//!
//! Rows always come back positionally (`QueryOutput::rows` is a
//! `Vec<Vec<_>>`), so array mode is implied for the pooled pair.

use crate::error::DbResult;
use crate::models::{Query, QueryOutput, QueryParam};
use async_trait::async_trait;
use serde::Serialize;

/// A pool of persistent connections.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Run one query on any available connection.
    async fn query(&self, query: &Query) -> DbResult<QueryOutput>;

    /// Check out a connection for exclusive use.
    async fn connect(&self) -> DbResult<Box<dyn PoolConnection>>;

    /// Shut the pool down.
    async fn end(&self) -> DbResult<()>;
}

/// A connection checked out of a [`ConnectionPool`].
#[async_trait]
pub trait PoolConnection: Send {
    async fn query(&mut self, query: &Query) -> DbResult<QueryOutput>;

    /// Return the connection to its pool. Consumes the handle, so a
    /// connection cannot be released twice.
    async fn release(self: Box<Self>) -> DbResult<()>;
}

/// Options passed with every one-shot HTTP query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpQueryOptions {
    /// Rows as positional arrays rather than keyed objects.
    pub array_mode: bool,
    /// Include field metadata and the row count, not just rows.
    pub full_results: bool,
}

impl HttpQueryOptions {
    /// The only combination the adapter issues.
    pub const ARRAY_MODE_FULL_RESULTS: Self = Self {
        array_mode: true,
        full_results: true,
    };
}

/// A stateless, single-shot query callable.
#[async_trait]
pub trait QueryFunction: Send + Sync {
    async fn call(
        &self,
        sql: &str,
        args: &[QueryParam],
        options: HttpQueryOptions,
    ) -> DbResult<QueryOutput>;
}
