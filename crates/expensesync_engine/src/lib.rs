//! # expensesync Engine
//!
//! Connectivity-aware synchronization and budget alerting for expenses.
//!
//! This crate provides:
//! - A mutation gate that refuses writes while offline
//! - Failure recovery that disables the network and clears the local cache
//! - A projection of the remote expense set, replaced on every snapshot
//! - An operation status machine for UI consumption
//! - A two-tier budget threshold evaluator driving alerts
//!
//! ## Architecture
//!
//! The engine sits between a UI layer and a remote document store:
//! 1. Callers invoke mutations with a pre-sampled online flag
//! 2. The gate performs the guarded write against the [`RemoteStore`]
//! 3. The store's subscription pushes full snapshots back into the engine
//! 4. Totals are recomputed and run through the threshold evaluator
//!
//! ## Key Invariants
//!
//! - No store interaction is attempted while offline
//! - A failed write leaves the store with network disabled and cache cleared
//! - The projection is only ever replaced by the subscription handler
//! - Bulk clear is a single atomic batch, skipped entirely on an empty store
//! - Alerts are keyed by a fixed id per type, so re-issuing replaces
//!
//! [`RemoteStore`]: expensesync_store::RemoteStore

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod alert;
mod config;
mod connectivity;
mod engine;
mod error;
mod expense;
mod preferences;
mod status;
mod threshold;

pub use alert::{
    Alert, AlertChannel, AlertSink, RecordingAlertSink, TracingAlertSink, APPROACHING_ALERT_ID,
    EXCEEDED_ALERT_ID,
};
pub use config::{AlertTrigger, EngineConfig};
pub use connectivity::{Connectivity, StaticConnectivity};
pub use engine::ExpenseEngine;
pub use error::{EngineError, EngineResult, Operation};
pub use expense::{total_for, DateRange, Expense};
pub use preferences::{Preferences, DEFAULT_CATEGORIES};
pub use status::OperationStatus;
pub use threshold::{range_qualifier, BudgetState, ThresholdEvaluator};

/// Re-exported store seams, so hosts need only depend on the engine.
pub use expensesync_store as store;
