//! Operation status state machine.

use tokio::sync::watch;

/// Transient outcome of the most recent mutating operation.
///
/// `success` / `error_message` form the Idle/Success vs Failed(message)
/// axis; `is_deleting` is an orthogonal flag raised only for the duration
/// of a bulk clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStatus {
    /// Whether the last operation succeeded.
    pub success: bool,
    /// Most recent failure description, until cleared.
    pub error_message: Option<String>,
    /// True while a bulk clear is in flight.
    pub is_deleting: bool,
}

impl OperationStatus {
    /// Returns true if the status carries a failure.
    pub fn is_failed(&self) -> bool {
        !self.success
    }
}

impl Default for OperationStatus {
    fn default() -> Self {
        Self {
            success: true,
            error_message: None,
            is_deleting: false,
        }
    }
}

/// Owner of the status triple.
///
/// Every transition is a single atomic update of the whole triple, so
/// observers never see a torn status.
#[derive(Debug)]
pub(crate) struct StatusCell {
    tx: watch::Sender<OperationStatus>,
}

impl StatusCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(OperationStatus::default());
        Self { tx }
    }

    pub(crate) fn current(&self) -> OperationStatus {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.tx.subscribe()
    }

    /// Start of a single add/delete: drop any stale deleting flag.
    pub(crate) fn begin_single(&self) {
        self.tx.send_if_modified(|s| std::mem::replace(&mut s.is_deleting, false));
    }

    /// Start of a bulk clear.
    pub(crate) fn begin_bulk(&self) {
        self.tx.send_modify(|s| s.is_deleting = true);
    }

    /// End of a bulk clear, whatever its outcome.
    pub(crate) fn end_bulk(&self) {
        self.tx.send_if_modified(|s| std::mem::replace(&mut s.is_deleting, false));
    }

    pub(crate) fn succeed(&self) {
        self.tx.send_modify(|s| {
            s.success = true;
            s.error_message = None;
        });
    }

    pub(crate) fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|s| {
            s.success = false;
            s.error_message = Some(message);
        });
    }

    /// Records a message without changing the success flag.
    pub(crate) fn set_error_message(&self, message: Option<String>) {
        self.tx.send_modify(|s| s.error_message = message);
    }
}
