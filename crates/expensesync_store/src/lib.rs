//! # expensesync Store
//!
//! Collaborator seams consumed by the expensesync engine.
//!
//! This crate provides the two stores the engine talks to:
//! - [`RemoteStore`] - an asynchronous document collection with live
//!   snapshot subscriptions and a host-wide network / local cache switch
//! - [`SettingsStore`] - a durable key/value store for user preferences
//!
//! ## Design Principles
//!
//! - Documents are **opaque bytes** - stores never interpret record payloads
//! - Snapshots are always full listings, never incremental patches
//! - Stores are explicitly constructed and injected; there is no global handle
//! - Must be `Send + Sync` for use from independent async tasks
//!
//! ## Available Implementations
//!
//! - [`InMemoryRemoteStore`] - simulated remote store with failure injection
//! - [`MemorySettings`] - ephemeral settings for tests
//! - [`FileSettings`] - JSON-file-backed settings, durable on every write

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod memory;
mod remote;
mod settings;

pub use document::{Document, Snapshot, SnapshotEvent, SnapshotReceiver};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryRemoteStore, StoreCall, StoreOp};
pub use remote::RemoteStore;
pub use settings::{FileSettings, MemorySettings, SettingValue, SettingsStore};
