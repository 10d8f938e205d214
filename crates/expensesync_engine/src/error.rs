//! Error types for the engine.

use expensesync_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A mutating operation guarded by the connectivity gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Creating a single expense.
    AddExpense,
    /// Deleting a single expense.
    DeleteExpense,
    /// Deleting every expense in one batch.
    ClearExpenses,
}

impl Operation {
    /// Human-readable action phrase, e.g. "add expense".
    pub fn action(&self) -> &'static str {
        match self {
            Operation::AddExpense => "add expense",
            Operation::DeleteExpense => "delete expense",
            Operation::ClearExpenses => "clear expenses",
        }
    }

    /// Status message shown when the gate refuses the operation.
    pub fn offline_message(&self) -> String {
        format!("Cannot {}: No internet connection", self.action())
    }

    /// Status message shown when the store fails the operation.
    pub fn failure_message(&self, cause: &StoreError) -> String {
        format!("Failed to {}: {}", self.action(), cause)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

/// Errors that can occur during engine operations.
///
/// None of these are retried by the engine; retrying means calling the
/// operation again.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A mutation was attempted while offline. No store call was made.
    #[error("cannot {operation}: no internet connection")]
    ConnectivityDenied {
        /// The refused operation.
        operation: Operation,
    },

    /// The expense failed create-time validation.
    #[error("invalid expense: {0}")]
    InvalidExpense(String),

    /// The remote store failed a put, delete or batch commit.
    #[error("failed to {operation}: {source}")]
    StoreWriteFailed {
        /// The failed operation.
        operation: Operation,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// The subscription delivered an error.
    #[error("failed to fetch expenses: {0}")]
    StoreListenFailed(#[source] StoreError),

    /// A stored document could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// An expense could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// The settings store failed to persist a value.
    #[error("settings error: {0}")]
    Settings(#[source] StoreError),
}

impl EngineError {
    /// Returns true if the error came from a connectivity refusal.
    pub fn is_connectivity_denied(&self) -> bool {
        matches!(self, EngineError::ConnectivityDenied { .. })
    }
}
