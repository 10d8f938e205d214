//! Remote store trait definition.

use crate::document::{Document, SnapshotReceiver};
use crate::error::StoreResult;
use async_trait::async_trait;

/// An asynchronous remote document store.
///
/// This trait abstracts the hosted document database the engine synchronizes
/// with, allowing an in-memory fake to stand in for tests.
///
/// # Invariants
///
/// - `new_id` never suspends and never repeats an id
/// - `delete_batch` is atomic: either every id is deleted or none is
/// - `subscribe` delivers full snapshots, never incremental changes
/// - The network switch and the local cache are shared host-wide state
///
/// Every async method is a suspension point and may fail with a
/// transport-level error.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Allocates a fresh document id for `collection`.
    fn new_id(&self, collection: &str) -> String;

    /// Writes (creates or replaces) a document.
    async fn put(&self, collection: &str, document: Document) -> StoreResult<()>;

    /// Deletes a single document. Deleting a missing id is not an error.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Deletes every listed id in one atomic batch commit.
    async fn delete_batch(&self, collection: &str, ids: &[String]) -> StoreResult<()>;

    /// Lists every document currently in `collection`.
    async fn list_all(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Subscribes to live snapshots of `collection`.
    ///
    /// The current snapshot is delivered first, then one per change.
    /// Listen errors are delivered in-band and do not end the subscription.
    fn subscribe(&self, collection: &str) -> SnapshotReceiver;

    /// Enables or disables network access. Idempotent.
    async fn set_network_enabled(&self, enabled: bool) -> StoreResult<()>;

    /// Discards locally cached, uncommitted writes.
    async fn clear_local_cache(&self) -> StoreResult<()>;
}
