//! Transactions on a checked-out connection.
//!
//! A [`Transaction`] exclusively owns one pooled connection from
//! `start_transaction` until `commit` or `rollback` hands it back. Both
//! transitions are terminal and release the connection exactly once.
//!
//! Neither transition sends SQL. Transactions are opened with
//! `use_phantom_query: false`, so the caller issues `BEGIN`, `COMMIT` and
//! `ROLLBACK` through `execute_raw` and then calls the matching method here to
//! give the connection back.

use crate::db::client::PoolConnection;
use crate::db::queryable::Queryable;
use crate::db::strategy::log_io_error;
use crate::error::{DbError, DbResult};
use crate::models::{Query, QueryOutput, TransactionOptions, TransactionState};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct Slot {
    state: TransactionState,
    /// `Some` exactly while the state is `Active`.
    connection: Option<Box<dyn PoolConnection>>,
}

pub struct Transaction {
    id: String,
    options: TransactionOptions,
    slot: Mutex<Slot>,
}

impl Transaction {
    pub(crate) fn new(connection: Box<dyn PoolConnection>, options: TransactionOptions) -> Self {
        Self {
            id: generate_transaction_id(),
            options,
            slot: Mutex::new(Slot {
                state: TransactionState::Active,
                connection: Some(connection),
            }),
        }
    }

    /// Unique identifier, used in log output.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> TransactionOptions {
        self.options
    }

    pub async fn state(&self) -> TransactionState {
        self.slot.lock().await.state
    }

    /// Finish the transaction and release its connection.
    pub async fn commit(&self) -> DbResult<()> {
        debug!(transaction_id = %self.id, "commit");
        self.finish(TransactionState::Committed).await
    }

    /// Abandon the transaction and release its connection.
    pub async fn rollback(&self) -> DbResult<()> {
        debug!(transaction_id = %self.id, "rollback");
        self.finish(TransactionState::RolledBack).await
    }

    async fn finish(&self, terminal: TransactionState) -> DbResult<()> {
        let connection = {
            let mut slot = self.slot.lock().await;
            if slot.state.is_ended() {
                return Err(DbError::transaction_closed(slot.state));
            }
            slot.state = terminal;
            slot.connection.take()
        };

        // The state is terminal before release runs, so even a failed release
        // cannot be attempted a second time.
        match connection {
            Some(connection) => connection.release().await.inspect_err(|e| {
                warn!(
                    transaction_id = %self.id,
                    error = %e,
                    "Failed to release transaction connection"
                );
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Queryable for Transaction {
    async fn perform_io(&self, query: &Query) -> DbResult<QueryOutput> {
        let mut slot = self.slot.lock().await;
        let state = slot.state;
        let connection = slot
            .connection
            .as_mut()
            .ok_or_else(|| DbError::transaction_closed(state))?;

        connection
            .query(query)
            .await
            .inspect_err(|e| log_io_error(query, e))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let slot = self.slot.get_mut();
        if slot.state.is_active() {
            // Dropping the handle returns the connection to its pool.
            warn!(
                transaction_id = %self.id,
                "Transaction dropped without commit or rollback"
            );
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("options", &self.options)
            .finish()
    }
}

/// Generate a unique transaction ID.
fn generate_transaction_id() -> String {
    format!("tx_{}", uuid::Uuid::new_v4().simple())
}
