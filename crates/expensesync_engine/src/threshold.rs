//! Budget threshold evaluation.
//!
//! The evaluator is stateless: it does not remember the previous state, so
//! every evaluation that lands in a warning band re-issues that band's alert
//! under its fixed id. Repeated alerts replace rather than stack in the
//! host's presentation layer.

use crate::alert::{Alert, AlertSink, APPROACHING_ALERT_ID, EXCEEDED_ALERT_ID};
use crate::expense::DateRange;

/// Where a total sits relative to the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetState {
    /// `total < budget - margin`.
    Normal,
    /// `budget - margin <= total <= budget`.
    Approaching,
    /// `total > budget`.
    Exceeded,
}

impl BudgetState {
    /// Returns true for the states that raise an alert.
    pub fn alerts(&self) -> bool {
        !matches!(self, BudgetState::Normal)
    }
}

/// Classifies totals against a budget and raises alerts.
#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    margin: f64,
    channel_id: String,
}

impl ThresholdEvaluator {
    /// Creates an evaluator with an absolute margin in currency units.
    pub fn new(margin: f64, channel_id: impl Into<String>) -> Self {
        Self {
            margin,
            channel_id: channel_id.into(),
        }
    }

    /// The approaching margin.
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Classifies `total` against `budget`. NaN totals are `Normal`.
    pub fn classify(&self, total: f64, budget: f64) -> BudgetState {
        if total > budget {
            BudgetState::Exceeded
        } else if total >= budget - self.margin && total <= budget {
            BudgetState::Approaching
        } else {
            BudgetState::Normal
        }
    }

    /// Builds the alert for a state, if that state alerts.
    pub fn alert_for(
        &self,
        state: BudgetState,
        total: f64,
        budget: f64,
        qualifier: &str,
    ) -> Option<Alert> {
        let (alert_id, title, body) = match state {
            BudgetState::Normal => return None,
            BudgetState::Approaching => (
                APPROACHING_ALERT_ID,
                "Approaching Budget Alert",
                format!(
                    "You’re approaching your budget! Total expenses (${total:.2}){qualifier} are close to your budget (${budget:.2})."
                ),
            ),
            BudgetState::Exceeded => (
                EXCEEDED_ALERT_ID,
                "Budget Exceeded Alert",
                format!(
                    "Budget exceeded! Total expenses (${total:.2}){qualifier} exceed your budget (${budget:.2})."
                ),
            ),
        };

        Some(Alert {
            channel_id: self.channel_id.clone(),
            alert_id,
            title: title.to_string(),
            body,
        })
    }

    /// Runs one evaluation.
    ///
    /// Returns `None` without classifying when notifications are disabled.
    /// Otherwise classifies, presents the matching alert (if any) and
    /// returns the state.
    pub fn evaluate(
        &self,
        total: f64,
        budget: f64,
        notifications_enabled: bool,
        qualifier: &str,
        sink: &dyn AlertSink,
    ) -> Option<BudgetState> {
        if !notifications_enabled {
            return None;
        }

        let state = self.classify(total, budget);
        if let Some(alert) = self.alert_for(state, total, budget, qualifier) {
            tracing::info!(?state, total, budget, "budget alert raised");
            sink.present(alert);
        }
        Some(state)
    }
}

/// Human-readable range text interpolated into alert bodies.
///
/// Empty without a range; otherwise `" within MM/DD/YYYY - MM/DD/YYYY"`.
pub fn range_qualifier(range: Option<&DateRange>) -> String {
    match range {
        Some(range) => format!(
            " within {} - {}",
            range.start().format("%m/%d/%Y"),
            range.end().format("%m/%d/%Y")
        ),
        None => String::new(),
    }
}
