//! Alert presentation seam.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed id of the "approaching budget" alert.
pub const APPROACHING_ALERT_ID: u32 = 1;

/// Fixed id of the "budget exceeded" alert.
pub const EXCEEDED_ALERT_ID: u32 = 2;

/// A named channel alerts are grouped under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertChannel {
    /// Stable channel id.
    pub id: String,
    /// User-visible channel name.
    pub name: String,
    /// User-visible channel description.
    pub description: String,
}

impl AlertChannel {
    /// Creates a channel.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// The budget alert channel.
    pub fn budget() -> Self {
        Self::new(
            "budget_channel",
            "Budget Alerts",
            "Notifications for budget alerts",
        )
    }
}

/// An alert to present to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Channel the alert belongs to.
    pub channel_id: String,
    /// Fixed per-type id; presenting the same id again replaces the alert.
    pub alert_id: u32,
    /// Alert title.
    pub title: String,
    /// Alert body.
    pub body: String,
}

/// Presents alerts on the host.
///
/// Presentation is fire-and-forget. Implementations must silently skip
/// presentation when the host has not granted the capability.
pub trait AlertSink: Send + Sync {
    /// Registers a channel. Sinks without channels may ignore this.
    fn register_channel(&self, _channel: &AlertChannel) {}

    /// Presents (or replaces, by `alert_id`) an alert.
    fn present(&self, alert: Alert);
}

/// A sink that writes alerts to the `tracing` log.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn register_channel(&self, channel: &AlertChannel) {
        tracing::debug!(channel = %channel.id, name = %channel.name, "alert channel registered");
    }

    fn present(&self, alert: Alert) {
        tracing::warn!(
            channel = %alert.channel_id,
            id = alert.alert_id,
            "{}: {}",
            alert.title,
            alert.body
        );
    }
}

/// A sink that records alerts, replacing by id like a notification tray.
///
/// Useful for tests and for hosts that render alerts themselves.
#[derive(Debug)]
pub struct RecordingAlertSink {
    permitted: AtomicBool,
    channels: Mutex<Vec<AlertChannel>>,
    visible: Mutex<Vec<Alert>>,
    presented: Mutex<Vec<Alert>>,
}

impl RecordingAlertSink {
    /// Creates a sink with the presentation capability granted.
    pub fn new() -> Self {
        Self {
            permitted: AtomicBool::new(true),
            channels: Mutex::new(Vec::new()),
            visible: Mutex::new(Vec::new()),
            presented: Mutex::new(Vec::new()),
        }
    }

    /// Creates a sink whose capability has been denied.
    pub fn denied() -> Self {
        let sink = Self::new();
        sink.set_permitted(false);
        sink
    }

    /// Grants or revokes the presentation capability.
    pub fn set_permitted(&self, permitted: bool) {
        self.permitted.store(permitted, Ordering::SeqCst);
    }

    /// Currently visible alerts, at most one per id.
    pub fn visible(&self) -> Vec<Alert> {
        self.visible.lock().clone()
    }

    /// Every alert ever presented, in order.
    pub fn presented(&self) -> Vec<Alert> {
        self.presented.lock().clone()
    }

    /// Number of alerts ever presented.
    pub fn presented_count(&self) -> usize {
        self.presented.lock().len()
    }

    /// Registered channels.
    pub fn channels(&self) -> Vec<AlertChannel> {
        self.channels.lock().clone()
    }

    /// Dismisses every visible alert and forgets history.
    pub fn clear(&self) {
        self.visible.lock().clear();
        self.presented.lock().clear();
    }
}

impl Default for RecordingAlertSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink for RecordingAlertSink {
    fn register_channel(&self, channel: &AlertChannel) {
        let mut channels = self.channels.lock();
        if !channels.iter().any(|c| c.id == channel.id) {
            channels.push(channel.clone());
        }
    }

    fn present(&self, alert: Alert) {
        if !self.permitted.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut visible = self.visible.lock();
            match visible.iter_mut().find(|a| a.alert_id == alert.alert_id) {
                Some(existing) => *existing = alert.clone(),
                None => visible.push(alert.clone()),
            }
        }
        self.presented.lock().push(alert);
    }
}
