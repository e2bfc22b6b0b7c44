//! Integration tests for the adapter, strategies and transactions.
//!
//! The clients are in-memory fakes, so these run without a database.

use async_trait::async_trait;
use pg_driver_adapter::db::{
    Adapter, ColumnType, ConnectionPool, HttpQueryOptions, PoolConnection, QueryFunction,
    Queryable,
};
use pg_driver_adapter::error::{DbError, DbResult};
use pg_driver_adapter::models::{
    ConnectionMode, FieldDescription, Flavour, Query, QueryOutput, QueryParam, TransactionState,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};

/// Canned responses keyed on the SQL text.
fn respond(query: &Query) -> DbResult<QueryOutput> {
    match query.sql.as_str() {
        "SELECT 1 AS x" => Ok(QueryOutput {
            fields: vec![FieldDescription::new("x", 23)],
            rows: vec![vec![json!(1)]],
            row_count: Some(1),
        }),
        "SELECT id, name, tags FROM users" => Ok(QueryOutput {
            fields: vec![
                FieldDescription::new("id", 20),
                FieldDescription::new("name", 25),
                FieldDescription::new("tags", 1009),
            ],
            rows: vec![
                vec![json!(1), json!("ann"), json!(["a"])],
                vec![json!(2), json!("bob"), json!([])],
            ],
            row_count: Some(2),
        }),
        "SELECT mood FROM people" => Ok(QueryOutput {
            fields: vec![FieldDescription::new("mood", 16_384)],
            rows: vec![vec![json!("happy")]],
            row_count: Some(1),
        }),
        "UPDATE t SET n = n + 1" => Ok(QueryOutput {
            row_count: Some(3),
            ..Default::default()
        }),
        "BEGIN" | "COMMIT" | "ROLLBACK" => Ok(QueryOutput::default()),
        _ => Err(DbError::Driver(sqlx::Error::Protocol("boom".to_string()))),
    }
}

#[derive(Default)]
struct Counters {
    pool_queries: AtomicUsize,
    connection_queries: AtomicUsize,
    checkouts: AtomicUsize,
    releases: AtomicUsize,
    ends: AtomicUsize,
}

#[derive(Default)]
struct FakePool {
    counters: Arc<Counters>,
    fail_checkout: bool,
    fail_release: bool,
    /// Number of `end` calls that fail before one succeeds.
    fail_end_times: usize,
}

struct FakeConnection {
    counters: Arc<Counters>,
    fail_release: bool,
}

#[async_trait]
impl ConnectionPool for FakePool {
    async fn query(&self, query: &Query) -> DbResult<QueryOutput> {
        self.counters.pool_queries.fetch_add(1, Ordering::SeqCst);
        respond(query)
    }

    async fn connect(&self) -> DbResult<Box<dyn PoolConnection>> {
        if self.fail_checkout {
            return Err(DbError::Driver(sqlx::Error::PoolTimedOut));
        }
        self.counters.checkouts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            counters: self.counters.clone(),
            fail_release: self.fail_release,
        }))
    }

    async fn end(&self) -> DbResult<()> {
        let attempt = self.counters.ends.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_end_times {
            return Err(DbError::Driver(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl PoolConnection for FakeConnection {
    async fn query(&mut self, query: &Query) -> DbResult<QueryOutput> {
        self.counters.connection_queries.fetch_add(1, Ordering::SeqCst);
        respond(query)
    }

    async fn release(self: Box<Self>) -> DbResult<()> {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(DbError::Driver(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeQueryFunction {
    calls: Arc<Mutex<Vec<(String, Vec<QueryParam>, HttpQueryOptions)>>>,
}

#[async_trait]
impl QueryFunction for FakeQueryFunction {
    async fn call(
        &self,
        sql: &str,
        args: &[QueryParam],
        options: HttpQueryOptions,
    ) -> DbResult<QueryOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), args.to_vec(), options));
        respond(&Query {
            sql: sql.to_string(),
            args: args.to_vec(),
        })
    }
}

fn pooled() -> (Adapter, Arc<Counters>) {
    let pool = FakePool::default();
    let counters = pool.counters.clone();
    (Adapter::pooled(pool), counters)
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test]
async fn test_pooled_query_tags_columns() {
    let (adapter, counters) = pooled();

    let result = assert_ok!(adapter.query_raw(&Query::new("SELECT 1 AS x")).await);
    assert_eq!(result.column_names, vec!["x"]);
    assert_eq!(result.column_types, vec![ColumnType::Int32]);
    assert_eq!(result.rows, vec![vec![json!(1)]]);
    assert_eq!(counters.pool_queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_result_set_is_rectangular() {
    let (adapter, _) = pooled();

    let result = assert_ok!(
        adapter
            .query_raw(&Query::new("SELECT id, name, tags FROM users"))
            .await
    );
    assert!(result.is_rectangular());
    assert_eq!(
        result.column_types,
        vec![ColumnType::Int64, ColumnType::Text, ColumnType::TextArray]
    );
    assert_eq!(result.row_count(), 2);
}

#[tokio::test]
async fn test_custom_type_maps_to_enum() {
    let (adapter, _) = pooled();

    let result = assert_ok!(adapter.query_raw(&Query::new("SELECT mood FROM people")).await);
    assert_eq!(result.column_types, vec![ColumnType::Enum]);
    assert_eq!(result.rows, vec![vec![json!("happy")]]);
}

#[tokio::test]
async fn test_execute_reports_row_count() {
    let (adapter, _) = pooled();

    let affected = assert_ok!(
        adapter
            .execute_raw(&Query::new("UPDATE t SET n = n + 1"))
            .await
    );
    assert_eq!(affected, 3);
}

#[tokio::test]
async fn test_execute_without_row_count_is_zero() {
    let (adapter, _) = pooled();

    let affected = assert_ok!(adapter.execute_raw(&Query::new("BEGIN")).await);
    assert_eq!(affected, 0);
}

#[tokio::test]
async fn test_io_error_is_propagated_unchanged() {
    let (adapter, _) = pooled();

    let err = assert_err!(adapter.query_raw(&Query::new("SELEC oops")).await);
    assert!(matches!(err, DbError::Driver(sqlx::Error::Protocol(ref msg)) if msg == "boom"));
    assert!(err.is_io());

    let err = assert_err!(adapter.execute_raw(&Query::new("SELEC oops")).await);
    assert!(matches!(err, DbError::Driver(sqlx::Error::Protocol(_))));
}

#[tokio::test]
async fn test_concurrent_queries_share_the_pool() {
    let (adapter, counters) = pooled();
    let query = Query::new("SELECT 1 AS x");

    let (a, b, c) = tokio::join!(
        adapter.query_raw(&query),
        adapter.query_raw(&query),
        adapter.execute_raw(&query)
    );
    assert_ok!(a);
    assert_ok!(b);
    assert_eq!(assert_ok!(c), 1);
    assert_eq!(counters.pool_queries.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_flavour_and_mode() {
    let (adapter, _) = pooled();
    assert_eq!(adapter.flavour(), Flavour::Postgres);
    assert_eq!(adapter.mode(), ConnectionMode::Pooled);

    let http = Adapter::http(FakeQueryFunction::default());
    assert_eq!(http.flavour(), Flavour::Postgres);
    assert_eq!(http.mode(), ConnectionMode::Http);
}

// =============================================================================
// Stateless strategy
// =============================================================================

#[tokio::test]
async fn test_http_query_uses_array_mode_full_results() {
    let query_fn = FakeQueryFunction::default();
    let calls = query_fn.calls.clone();
    let adapter = Adapter::http(query_fn);

    let query = Query::new("SELECT 1 AS x").with_arg(7);
    let result = assert_ok!(adapter.query_raw(&query).await);
    assert_eq!(result.column_types, vec![ColumnType::Int32]);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (sql, args, options) = &calls[0];
    assert_eq!(sql, "SELECT 1 AS x");
    assert_eq!(args, &vec![QueryParam::Int(7)]);
    assert_eq!(*options, HttpQueryOptions::ARRAY_MODE_FULL_RESULTS);
}

#[tokio::test]
async fn test_http_start_transaction_fails() {
    let adapter = Adapter::http(FakeQueryFunction::default());

    let err = assert_err!(adapter.start_transaction().await);
    assert!(matches!(
        err,
        DbError::TransactionsNotSupported {
            mode: ConnectionMode::Http
        }
    ));
    assert!(err.to_string().contains("not supported in HTTP mode"));
}

#[tokio::test]
async fn test_http_close_is_a_no_op() {
    let adapter = Adapter::http(FakeQueryFunction::default());

    assert_ok!(adapter.close().await);
    assert!(!adapter.is_running());
    assert_ok!(adapter.close().await);
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn test_transaction_runs_on_checked_out_connection() {
    let (adapter, counters) = pooled();

    let tx = assert_ok!(adapter.start_transaction().await);
    assert!(tx.id().starts_with("tx_"));
    assert!(!tx.options().use_phantom_query);
    assert_eq!(tx.state().await, TransactionState::Active);

    assert_ok!(tx.execute_raw(&Query::new("BEGIN")).await);
    let result = assert_ok!(tx.query_raw(&Query::new("SELECT 1 AS x")).await);
    assert_eq!(result.rows, vec![vec![json!(1)]]);
    assert_ok!(tx.execute_raw(&Query::new("COMMIT")).await);
    assert_ok!(tx.commit().await);

    assert_eq!(counters.checkouts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.connection_queries.load(Ordering::SeqCst), 3);
    assert_eq!(counters.pool_queries.load(Ordering::SeqCst), 0);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_query_after_commit_fails() {
    let (adapter, counters) = pooled();

    let tx = assert_ok!(adapter.start_transaction().await);
    assert_ok!(tx.commit().await);
    assert_eq!(tx.state().await, TransactionState::Committed);

    let err = assert_err!(tx.query_raw(&Query::new("SELECT 1 AS x")).await);
    assert!(matches!(
        err,
        DbError::TransactionClosed {
            state: TransactionState::Committed
        }
    ));
    assert_eq!(counters.connection_queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_query_after_rollback_fails() {
    let (adapter, _) = pooled();

    let tx = assert_ok!(adapter.start_transaction().await);
    assert_ok!(tx.rollback().await);
    assert_eq!(tx.state().await, TransactionState::RolledBack);

    let err = assert_err!(tx.execute_raw(&Query::new("SELECT 1 AS x")).await);
    assert!(matches!(
        err,
        DbError::TransactionClosed {
            state: TransactionState::RolledBack
        }
    ));
}

#[tokio::test]
async fn test_connection_released_exactly_once() {
    let (adapter, counters) = pooled();

    let tx = assert_ok!(adapter.start_transaction().await);
    assert_ok!(tx.commit().await);
    assert_err!(tx.commit().await);
    assert_err!(tx.rollback().await);

    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
    assert_eq!(tx.state().await, TransactionState::Committed);
}

#[tokio::test]
async fn test_failed_release_is_still_terminal() {
    let pool = FakePool {
        fail_release: true,
        ..Default::default()
    };
    let counters = pool.counters.clone();
    let adapter = Adapter::pooled(pool);

    let tx = assert_ok!(adapter.start_transaction().await);
    let err = assert_err!(tx.rollback().await);
    assert!(matches!(err, DbError::Driver(sqlx::Error::PoolClosed)));
    assert_eq!(tx.state().await, TransactionState::RolledBack);

    assert_err!(tx.rollback().await);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_checkout_failure_is_propagated() {
    let adapter = Adapter::pooled(FakePool {
        fail_checkout: true,
        ..Default::default()
    });

    let err = assert_err!(adapter.start_transaction().await);
    assert!(matches!(err, DbError::Driver(sqlx::Error::PoolTimedOut)));
}

#[tokio::test]
async fn test_transactions_are_independent() {
    let (adapter, counters) = pooled();

    let first = assert_ok!(adapter.start_transaction().await);
    let second = assert_ok!(adapter.start_transaction().await);
    assert_ne!(first.id(), second.id());

    assert_ok!(first.commit().await);
    assert_ok!(second.query_raw(&Query::new("SELECT 1 AS x")).await);
    assert_eq!(second.state().await, TransactionState::Active);
    assert_ok!(second.rollback().await);

    assert_eq!(counters.checkouts.load(Ordering::SeqCst), 2);
    assert_eq!(counters.releases.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_transaction_io_error_keeps_it_active() {
    let (adapter, _) = pooled();

    let tx = assert_ok!(adapter.start_transaction().await);
    assert_err!(tx.query_raw(&Query::new("SELEC oops")).await);
    assert_eq!(tx.state().await, TransactionState::Active);
    assert_ok!(tx.rollback().await);
}

// =============================================================================
// Teardown
// =============================================================================

#[tokio::test]
async fn test_close_ends_pool_once() {
    let (adapter, counters) = pooled();
    assert!(adapter.is_running());

    assert_ok!(adapter.close().await);
    assert!(!adapter.is_running());
    assert_ok!(adapter.close().await);

    assert_eq!(counters.ends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_close_can_be_retried() {
    let pool = FakePool {
        fail_end_times: 1,
        ..Default::default()
    };
    let counters = pool.counters.clone();
    let adapter = Adapter::pooled(pool);

    let err = assert_err!(adapter.close().await);
    assert!(matches!(err, DbError::Driver(sqlx::Error::PoolClosed)));
    assert!(adapter.is_running());

    assert_ok!(adapter.close().await);
    assert!(!adapter.is_running());
    assert_ok!(adapter.close().await);

    assert_eq!(counters.ends.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_close_ends_pool_once() {
    let (adapter, counters) = pooled();

    let (a, b, c) = tokio::join!(adapter.close(), adapter.close(), adapter.close());
    assert_ok!(a);
    assert_ok!(b);
    assert_ok!(c);

    assert!(!adapter.is_running());
    assert_eq!(counters.ends.load(Ordering::SeqCst), 1);
}
