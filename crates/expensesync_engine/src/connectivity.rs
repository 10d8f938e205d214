//! Connectivity oracle seam.

use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether an internet-capable network path is available.
///
/// The answer is point-in-time; the engine samples it once at startup and
/// callers sample it before each mutation.
pub trait Connectivity: Send + Sync {
    /// Returns true if the host is currently online.
    fn is_online(&self) -> bool;
}

/// A connectivity oracle whose answer is set by the host.
#[derive(Debug)]
pub struct StaticConnectivity {
    online: AtomicBool,
}

impl StaticConnectivity {
    /// Creates an oracle with the given initial state.
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    /// Sets the reported state.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for StaticConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
