//! Connection strategies.
//!
//! The set of ways to reach the database is closed: a pool of persistent
//! connections, or a one-shot HTTP query function. Only the pooled strategy can
//! check out a connection, which is what transactions are built on.

use crate::db::client::{ConnectionPool, HttpQueryOptions, PoolConnection, QueryFunction};
use crate::db::queryable::Queryable;
use crate::error::DbResult;
use crate::models::{ConnectionMode, Query, QueryOutput};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Strategy backed by a connection pool.
#[derive(Clone)]
pub struct PooledStrategy {
    pool: Arc<dyn ConnectionPool>,
}

impl PooledStrategy {
    pub fn new(pool: Arc<dyn ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Check out one connection for exclusive use.
    pub async fn checkout(&self) -> DbResult<Box<dyn PoolConnection>> {
        self.pool.connect().await
    }

    /// Shut the pool down.
    pub async fn end(&self) -> DbResult<()> {
        self.pool.end().await
    }
}

#[async_trait]
impl Queryable for PooledStrategy {
    async fn perform_io(&self, query: &Query) -> DbResult<QueryOutput> {
        self.pool
            .query(query)
            .await
            .inspect_err(|e| log_io_error(query, e))
    }
}

/// Strategy backed by a stateless query function.
#[derive(Clone)]
pub struct StatelessStrategy {
    query_fn: Arc<dyn QueryFunction>,
}

impl StatelessStrategy {
    pub fn new(query_fn: Arc<dyn QueryFunction>) -> Self {
        Self { query_fn }
    }
}

#[async_trait]
impl Queryable for StatelessStrategy {
    async fn perform_io(&self, query: &Query) -> DbResult<QueryOutput> {
        // A one-shot call has no separate describe step, so metadata must
        // come back with the rows.
        self.query_fn
            .call(
                &query.sql,
                &query.args,
                HttpQueryOptions::ARRAY_MODE_FULL_RESULTS,
            )
            .await
            .inspect_err(|e| log_io_error(query, e))
    }
}

#[derive(Clone)]
pub enum ConnectionStrategy {
    Pooled(PooledStrategy),
    Stateless(StatelessStrategy),
}

impl ConnectionStrategy {
    pub fn mode(&self) -> ConnectionMode {
        match self {
            Self::Pooled(_) => ConnectionMode::Pooled,
            Self::Stateless(_) => ConnectionMode::Http,
        }
    }

    pub fn supports_transactions(&self) -> bool {
        self.mode().supports_transactions()
    }
}

#[async_trait]
impl Queryable for ConnectionStrategy {
    async fn perform_io(&self, query: &Query) -> DbResult<QueryOutput> {
        match self {
            Self::Pooled(strategy) => strategy.perform_io(query).await,
            Self::Stateless(strategy) => strategy.perform_io(query).await,
        }
    }
}

/// Record diagnostic context for a failed round trip. The error itself is
/// returned to the caller untouched.
pub(crate) fn log_io_error(query: &Query, error: &crate::error::DbError) {
    debug!(
        sql = %query.sql,
        args = query.args.len(),
        error = %error,
        "Error in perform_io"
    );
}
