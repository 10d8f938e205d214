//! Configuration for the expense engine.

use crate::alert::AlertChannel;

/// When the budget threshold evaluator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTrigger {
    /// Only on explicit recalculation: budget updates, caller-supplied
    /// totals, and [`recalculate`](crate::ExpenseEngine::recalculate).
    OnRecalculation,
    /// Additionally on every snapshot delivered by the subscription.
    OnSnapshot,
}

/// Configuration for the expense engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Remote collection holding expense documents.
    pub collection: String,
    /// Distance below the budget at which the approaching alert starts,
    /// in currency units.
    pub approaching_margin: f64,
    /// Budget used when none has been persisted.
    pub default_budget: f64,
    /// Channel alerts are presented on.
    pub alert_channel: AlertChannel,
    /// When alerts are evaluated.
    pub alert_trigger: AlertTrigger,
}

impl EngineConfig {
    /// Creates a configuration with the standard defaults.
    pub fn new() -> Self {
        Self {
            collection: "expenses".into(),
            approaching_margin: 300.0,
            default_budget: 1000.0,
            alert_channel: AlertChannel::budget(),
            alert_trigger: AlertTrigger::OnRecalculation,
        }
    }

    /// Sets the remote collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Sets the approaching margin.
    pub fn with_approaching_margin(mut self, margin: f64) -> Self {
        self.approaching_margin = margin;
        self
    }

    /// Sets the default budget.
    pub fn with_default_budget(mut self, budget: f64) -> Self {
        self.default_budget = budget;
        self
    }

    /// Sets the alert channel.
    pub fn with_alert_channel(mut self, channel: AlertChannel) -> Self {
        self.alert_channel = channel;
        self
    }

    /// Sets when alerts are evaluated.
    pub fn with_alert_trigger(mut self, trigger: AlertTrigger) -> Self {
        self.alert_trigger = trigger;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
