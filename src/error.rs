//! Error types for the driver adapter.
//!
//! Failures raised by the underlying clients (sqlx, reqwest) are carried through
//! unchanged; the remaining variants describe conditions this layer detects itself.

use crate::models::{ConnectionMode, TransactionState};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Failure reported by the sqlx connection or pool.
    #[error(transparent)]
    Driver(#[from] sqlx::Error),

    /// Transport failure talking to the SQL-over-HTTP endpoint.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        code: Option<String>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Transactions are not supported in {mode} mode")]
    TransactionsNotSupported { mode: ConnectionMode },

    #[error("Transaction is no longer active (state: {state})")]
    TransactionClosed { state: TransactionState },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A binary-encoded column value with no JSON decoder.
    #[error("Column '{column}' has type {type_name}, which cannot be decoded")]
    UnsupportedColumnType { column: String, type_name: String },
}

impl DbError {
    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            code,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn transactions_not_supported(mode: ConnectionMode) -> Self {
        Self::TransactionsNotSupported { mode }
    }

    pub fn transaction_closed(state: TransactionState) -> Self {
        Self::TransactionClosed { state }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an error for a column value that has no decoder.
    pub fn unsupported_column_type(column: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::UnsupportedColumnType {
            column: column.into(),
            type_name: type_name.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::TransactionsNotSupported { .. } => {
                Some("Use a pooled connection to run interactive transactions")
            }
            Self::UnsupportedColumnType { .. } => Some("Cast the column to text in the query"),
            _ => None,
        }
    }

    /// SQLSTATE reported by the server, if any.
    pub fn sql_state(&self) -> Option<String> {
        match self {
            Self::Database { code, .. } => code.clone(),
            Self::Driver(sqlx::Error::Database(db_err)) => db_err.code().map(|c| c.to_string()),
            _ => None,
        }
    }

    /// True for failures raised by a client while performing I/O.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Driver(_) | Self::Http(_) | Self::Database { .. }
        )
    }
}

/// Result type alias for adapter operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_transactions_not_supported_message() {
        let err = DbError::transactions_not_supported(ConnectionMode::Http);
        assert_eq!(
            err.to_string(),
            "Transactions are not supported in HTTP mode"
        );
        assert!(!err.is_io());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_transaction_closed_names_state() {
        let err = DbError::transaction_closed(TransactionState::Committed);
        assert!(err.to_string().contains("committed"));
        assert!(!err.is_io());
    }

    #[test]
    fn test_database_error_sql_state() {
        let err = DbError::database("relation \"users\" does not exist", Some("42P01".into()));
        assert_eq!(err.sql_state().as_deref(), Some("42P01"));
        assert!(err.is_io());
    }

    #[test]
    fn test_driver_error_is_transparent() {
        let err: DbError = sqlx::Error::Protocol("unexpected message".to_string()).into();
        assert!(err.is_io());
        assert_eq!(err.to_string(), sqlx::Error::Protocol("unexpected message".to_string()).to_string());
    }

    #[test]
    fn test_unsupported_column_type_message() {
        let err = DbError::unsupported_column_type("doc", "TSVECTOR");
        assert_eq!(
            err.to_string(),
            "Column 'doc' has type TSVECTOR, which cannot be decoded"
        );
        assert!(!err.is_io());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_invalid_input_has_no_sql_state() {
        let err = DbError::invalid_input("bad url");
        assert!(err.sql_state().is_none());
        assert!(err.suggestion().is_none());
    }
}
