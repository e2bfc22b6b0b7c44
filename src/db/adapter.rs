//! The adapter handed to callers.
//!
//! An [`Adapter`] wraps one [`ConnectionStrategy`] and adds the transaction
//! lifecycle and teardown on top of the shared [`Queryable`] surface.
//!
//! Closing a pooled adapter while transactions are still outstanding is the
//! caller's responsibility to avoid.

use crate::config::DatabaseConfig;
use crate::db::client::{ConnectionPool, QueryFunction};
use crate::db::http::NeonHttpClient;
use crate::db::postgres::create_pool;
use crate::db::queryable::Queryable;
use crate::db::strategy::{ConnectionStrategy, PooledStrategy, StatelessStrategy};
use crate::db::transaction::Transaction;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionMode, Query, QueryOutput, TransactionOptions};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct Adapter {
    strategy: ConnectionStrategy,
    running: AtomicBool,
    /// Serializes teardown so `end()` never runs twice at once.
    close_lock: Mutex<()>,
}

impl Adapter {
    pub fn new(strategy: ConnectionStrategy) -> Self {
        Self {
            strategy,
            running: AtomicBool::new(true),
            close_lock: Mutex::new(()),
        }
    }

    /// Adapter over a pool of persistent connections.
    pub fn pooled(pool: impl ConnectionPool + 'static) -> Self {
        Self::new(ConnectionStrategy::Pooled(PooledStrategy::new(Arc::new(
            pool,
        ))))
    }

    /// Adapter over a one-shot HTTP query function. Cannot run transactions.
    pub fn http(query_fn: impl QueryFunction + 'static) -> Self {
        Self::new(ConnectionStrategy::Stateless(StatelessStrategy::new(
            Arc::new(query_fn),
        )))
    }

    /// Build the client for `mode` from a parsed database configuration.
    pub async fn connect(config: &DatabaseConfig, mode: ConnectionMode) -> DbResult<Self> {
        info!(
            mode = %mode,
            database = ?config.database,
            "Connecting adapter"
        );

        match mode {
            ConnectionMode::Pooled => Ok(Self::pooled(create_pool(config).await?)),
            ConnectionMode::Http => {
                let client = match &config.http_endpoint {
                    Some(endpoint) => {
                        NeonHttpClient::with_endpoint(&config.connection_string, endpoint)?
                    }
                    None => NeonHttpClient::new(&config.connection_string)?,
                };
                Ok(Self::http(client))
            }
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        self.strategy.mode()
    }

    /// True until a call to `close` succeeds.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Check out a dedicated connection and wrap it in a transaction.
    pub async fn start_transaction(&self) -> DbResult<Transaction> {
        let options = TransactionOptions {
            use_phantom_query: false,
        };
        debug!(mode = %self.mode(), options = ?options, "start_transaction");

        match &self.strategy {
            ConnectionStrategy::Pooled(pooled) => {
                let connection = pooled.checkout().await?;
                let transaction = Transaction::new(connection, options);
                debug!(transaction_id = %transaction.id(), "Transaction started");
                Ok(transaction)
            }
            ConnectionStrategy::Stateless(_) => {
                Err(DbError::transactions_not_supported(self.mode()))
            }
        }
    }

    /// Release the adapter's resources.
    ///
    /// The adapter stops running only once teardown succeeds. A failed close
    /// leaves it running so the caller can retry; closing a stopped adapter
    /// does nothing.
    pub async fn close(&self) -> DbResult<()> {
        let _guard = self.close_lock.lock().await;
        if !self.is_running() {
            return Ok(());
        }

        if let ConnectionStrategy::Pooled(pooled) = &self.strategy {
            pooled.end().await.inspect_err(|e| {
                warn!(error = %e, "Failed to close connection pool");
            })?;
            info!("Connection pool closed");
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Queryable for Adapter {
    async fn perform_io(&self, query: &Query) -> DbResult<QueryOutput> {
        self.strategy.perform_io(query).await
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("mode", &self.mode())
            .field("running", &self.is_running())
            .finish()
    }
}
