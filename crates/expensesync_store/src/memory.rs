//! In-memory remote store for testing and local hosts.

use crate::document::{Document, Snapshot, SnapshotEvent, SnapshotReceiver};
use crate::error::{StoreError, StoreResult};
use crate::remote::RemoteStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Semaphore;

/// Remote store operation kinds, used for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Id allocation.
    NewId,
    /// Single document write.
    Put,
    /// Single document delete.
    Delete,
    /// Batch delete commit.
    DeleteBatch,
    /// Collection listing.
    ListAll,
    /// Network enable/disable.
    SetNetwork,
    /// Local cache clear.
    ClearCache,
}

/// A recorded call against the store, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `new_id` was called.
    NewId,
    /// `put` was called for the given document id.
    Put(String),
    /// `delete` was called for the given document id.
    Delete(String),
    /// `delete_batch` was called with the given ids.
    DeleteBatch(Vec<String>),
    /// `list_all` was called.
    ListAll,
    /// `set_network_enabled` was called.
    SetNetworkEnabled(bool),
    /// `clear_local_cache` was called.
    ClearLocalCache,
}

impl StoreCall {
    /// Returns the operation kind of this call.
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::NewId => StoreOp::NewId,
            StoreCall::Put(_) => StoreOp::Put,
            StoreCall::Delete(_) => StoreOp::Delete,
            StoreCall::DeleteBatch(_) => StoreOp::DeleteBatch,
            StoreCall::ListAll => StoreOp::ListAll,
            StoreCall::SetNetworkEnabled(_) => StoreOp::SetNetwork,
            StoreCall::ClearLocalCache => StoreOp::ClearCache,
        }
    }
}

/// A write accepted while the network was disabled.
#[derive(Debug, Clone)]
enum PendingWrite {
    Put(String, Document),
    Delete(String, String),
    DeleteBatch(String, Vec<String>),
}

impl PendingWrite {
    fn collection(&self) -> &str {
        match self {
            PendingWrite::Put(c, _) | PendingWrite::Delete(c, _) | PendingWrite::DeleteBatch(c, _) => c,
        }
    }

    fn apply(&self, docs: &mut Vec<Document>) {
        match self {
            PendingWrite::Put(_, doc) => upsert(docs, doc.clone()),
            PendingWrite::Delete(_, id) => docs.retain(|d| &d.id != id),
            PendingWrite::DeleteBatch(_, ids) => docs.retain(|d| !ids.contains(&d.id)),
        }
    }
}

fn upsert(docs: &mut Vec<Document>, doc: Document) {
    match docs.iter_mut().find(|d| d.id == doc.id) {
        Some(existing) => *existing = doc,
        None => docs.push(doc),
    }
}

#[derive(Default)]
struct Inner {
    committed: HashMap<String, Vec<Document>>,
    pending: Vec<PendingWrite>,
    subscribers: HashMap<String, Vec<UnboundedSender<SnapshotEvent>>>,
    failures: HashSet<StoreOp>,
    calls: Vec<StoreCall>,
}

impl Inner {
    /// Committed documents with local pending writes layered on top.
    fn visible(&self, collection: &str) -> Vec<Document> {
        let mut docs = self.committed.get(collection).cloned().unwrap_or_default();
        for write in self.pending.iter().filter(|w| w.collection() == collection) {
            write.apply(&mut docs);
        }
        docs
    }

    fn broadcast(&mut self, collection: &str) {
        let snapshot = Snapshot::new(self.visible(collection));
        if let Some(subs) = self.subscribers.get_mut(collection) {
            subs.retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
        }
    }

    fn check(&self, op: StoreOp) -> StoreResult<()> {
        if self.failures.contains(&op) {
            Err(StoreError::Backend(format!("injected {op:?} failure")))
        } else {
            Ok(())
        }
    }
}

/// A simulated remote document store held entirely in memory.
///
/// Behaves like a hosted document database with an offline cache:
/// - With the network enabled, writes commit immediately
/// - With the network disabled, writes land in the local cache, are visible
///   to subscribers, fail with [`StoreError::Unavailable`], and replay when
///   the network is re-enabled unless the cache is cleared first
/// - Every visible change pushes a full snapshot to subscribers
///
/// Failures can be injected per [`StoreOp`], and every call is recorded.
///
/// # Example
///
/// ```rust
/// use expensesync_store::{Document, InMemoryRemoteStore, RemoteStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = InMemoryRemoteStore::new();
/// let id = store.new_id("expenses");
/// store.put("expenses", Document::new(id.clone(), vec![1, 2, 3])).await.unwrap();
/// assert_eq!(store.list_all("expenses").await.unwrap().len(), 1);
/// # }
/// ```
pub struct InMemoryRemoteStore {
    inner: Mutex<Inner>,
    network_enabled: AtomicBool,
    gates: Mutex<HashMap<StoreOp, Arc<Semaphore>>>,
}

impl InMemoryRemoteStore {
    /// Creates an empty store with the network enabled.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            network_enabled: AtomicBool::new(true),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Makes every subsequent call of `op` fail (or succeed again).
    pub fn set_failure(&self, op: StoreOp, fail: bool) {
        let mut inner = self.inner.lock();
        if fail {
            inner.failures.insert(op);
        } else {
            inner.failures.remove(&op);
        }
    }

    /// Suspends every subsequent call of `op` until [`resume`](Self::resume).
    pub fn pause(&self, op: StoreOp) {
        self.gates.lock().insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Releases calls suspended by [`pause`](Self::pause).
    pub fn resume(&self, op: StoreOp) {
        if let Some(gate) = self.gates.lock().remove(&op) {
            gate.close();
        }
    }

    /// Returns whether the network is currently enabled.
    pub fn is_network_enabled(&self) -> bool {
        self.network_enabled.load(Ordering::SeqCst)
    }

    /// Returns the committed (server-side) documents of a collection.
    pub fn committed(&self, collection: &str) -> Vec<Document> {
        self.inner
            .lock()
            .committed
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of writes waiting in the local cache.
    pub fn pending_writes(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Returns every recorded call, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    /// Returns how many times `op` was called.
    pub fn count(&self, op: StoreOp) -> usize {
        self.inner.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Forgets all recorded calls.
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Returns the number of live subscribers on a collection.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .subscribers
            .get(collection)
            .map(|subs| subs.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Commits a document directly, bypassing the network switch.
    ///
    /// Simulates a write from another client; useful for seeding data and
    /// for delivering payloads the caller cannot decode.
    pub fn insert_raw(&self, collection: &str, document: Document) {
        let mut inner = self.inner.lock();
        upsert(
            inner.committed.entry(collection.to_string()).or_default(),
            document,
        );
        inner.broadcast(collection);
    }

    /// Delivers a listen error to every subscriber of a collection.
    pub fn inject_listen_error(&self, collection: &str, message: impl Into<String>) {
        let message = message.into();
        let mut inner = self.inner.lock();
        if let Some(subs) = inner.subscribers.get_mut(collection) {
            subs.retain(|tx| tx.send(Err(StoreError::Listen(message.clone()))).is_ok());
        }
    }

    async fn enter(&self, call: StoreCall) -> StoreResult<()> {
        let op = call.op();
        self.inner.lock().calls.push(call);

        let gate = self.gates.lock().get(&op).cloned();
        if let Some(gate) = gate {
            // A closed gate means the op was resumed.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.inner.lock().check(op)
    }

    /// Commits `write` when online; otherwise caches it and reports unavailability.
    ///
    /// The network flag is read under the `inner` lock, which is also held
    /// while it is flipped, so a write never lands in the cache after a replay.
    fn write(&self, write: PendingWrite) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let online = self.is_network_enabled();
        let collection = write.collection().to_string();

        if online {
            write.apply(inner.committed.entry(collection.clone()).or_default());
            inner.broadcast(&collection);
            Ok(())
        } else {
            inner.pending.push(write);
            inner.broadcast(&collection);
            Err(StoreError::Unavailable(
                "network disabled; write held in local cache".into(),
            ))
        }
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    fn new_id(&self, _collection: &str) -> String {
        self.inner.lock().calls.push(StoreCall::NewId);
        uuid::Uuid::new_v4().simple().to_string()
    }

    async fn put(&self, collection: &str, document: Document) -> StoreResult<()> {
        self.enter(StoreCall::Put(document.id.clone())).await?;
        self.write(PendingWrite::Put(collection.to_string(), document))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.enter(StoreCall::Delete(id.to_string())).await?;
        self.write(PendingWrite::Delete(collection.to_string(), id.to_string()))
    }

    async fn delete_batch(&self, collection: &str, ids: &[String]) -> StoreResult<()> {
        self.enter(StoreCall::DeleteBatch(ids.to_vec())).await?;
        self.write(PendingWrite::DeleteBatch(
            collection.to_string(),
            ids.to_vec(),
        ))
    }

    async fn list_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.enter(StoreCall::ListAll).await?;
        // Offline reads are served from the local cache.
        Ok(self.inner.lock().visible(collection))
    }

    fn subscribe(&self, collection: &str) -> SnapshotReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let snapshot = Snapshot::new(inner.visible(collection));
        if tx.send(Ok(snapshot)).is_ok() {
            inner
                .subscribers
                .entry(collection.to_string())
                .or_default()
                .push(tx);
        }
        rx
    }

    async fn set_network_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.enter(StoreCall::SetNetworkEnabled(enabled)).await?;
        let mut inner = self.inner.lock();
        let was_enabled = self.network_enabled.swap(enabled, Ordering::SeqCst);
        if enabled && !was_enabled {
            let pending = std::mem::take(&mut inner.pending);
            let mut touched = Vec::new();
            for write in pending {
                let collection = write.collection().to_string();
                write.apply(inner.committed.entry(collection.clone()).or_default());
                if !touched.contains(&collection) {
                    touched.push(collection);
                }
            }
            for collection in touched {
                inner.broadcast(&collection);
            }
            tracing::debug!("network enabled; replayed cached writes");
        }
        Ok(())
    }

    async fn clear_local_cache(&self) -> StoreResult<()> {
        self.enter(StoreCall::ClearLocalCache).await?;
        let mut inner = self.inner.lock();
        let dropped = std::mem::take(&mut inner.pending);
        let mut touched: Vec<String> = dropped.iter().map(|w| w.collection().to_string()).collect();
        touched.sort();
        touched.dedup();
        for collection in touched {
            inner.broadcast(&collection);
        }
        Ok(())
    }
}
