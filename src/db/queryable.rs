//! The shared query capability.
//!
//! Every strategy, the adapter and transactions implement [`Queryable`] by
//! supplying `perform_io`; result shaping lives in the provided methods.

use crate::error::DbResult;
use crate::models::{Flavour, Query, QueryOutput, ResultSet};
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait Queryable: Send + Sync {
    fn flavour(&self) -> Flavour {
        Flavour::Postgres
    }

    /// Run the query against the underlying client. Suspends once, at the I/O.
    async fn perform_io(&self, query: &Query) -> DbResult<QueryOutput>;

    /// Run a query and return a type-tagged result set.
    async fn query_raw(&self, query: &Query) -> DbResult<ResultSet> {
        debug!(sql = %query.sql, args = query.args.len(), "query_raw");

        let output = self.perform_io(query).await?;
        Ok(ResultSet::from_output(output))
    }

    /// Run a statement and return the affected-row count.
    async fn execute_raw(&self, query: &Query) -> DbResult<u64> {
        debug!(sql = %query.sql, args = query.args.len(), "execute_raw");

        let output = self.perform_io(query).await?;
        // No count is reported for statements such as BEGIN
        Ok(output.row_count.unwrap_or(0))
    }
}
