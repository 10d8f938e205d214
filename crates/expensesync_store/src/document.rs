//! Documents and snapshots exchanged with a remote store.

use crate::error::StoreError;
use tokio::sync::mpsc::UnboundedReceiver;

/// A single stored document.
///
/// The payload is opaque to the store; callers own its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Document id, unique within its collection.
    pub id: String,
    /// Encoded record bytes.
    pub data: Vec<u8>,
}

impl Document {
    /// Creates a new document.
    pub fn new(id: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// A full point-in-time listing of a collection, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Every document currently visible in the collection.
    pub documents: Vec<Document>,
}

impl Snapshot {
    /// Creates a snapshot from a list of documents.
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Returns the number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the snapshot holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns the ids of all documents, in order.
    pub fn ids(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.id.clone()).collect()
    }
}

/// One delivery on a subscription: a snapshot or a listen error.
pub type SnapshotEvent = Result<Snapshot, StoreError>;

/// Receiving half of a collection subscription.
///
/// The subscription ends when the store drops its sender.
pub type SnapshotReceiver = UnboundedReceiver<SnapshotEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_ids_preserve_order() {
        let snapshot = Snapshot::new(vec![
            Document::new("b", vec![1]),
            Document::new("a", vec![2]),
        ]);
        assert_eq!(snapshot.ids(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.is_empty());
        assert!(Snapshot::default().is_empty());
    }
}
