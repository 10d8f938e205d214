//! Typed access to persisted user preferences.

use crate::expense::DateRange;
use chrono::{DateTime, NaiveDate};
use expensesync_store::{SettingValue, SettingsStore, StoreResult};
use std::sync::Arc;

const KEY_BUDGET: &str = "budget";
const KEY_NOTIFICATIONS: &str = "notifications_enabled";
const KEY_START_DATE: &str = "start_date";
const KEY_END_DATE: &str = "end_date";
const KEY_CUSTOM_CATEGORIES: &str = "custom_categories";

/// Categories offered before any custom ones.
pub const DEFAULT_CATEGORIES: [&str; 6] =
    ["Food", "Travel", "Shopping", "Bills", "Entertainment", "Other"];

/// Preferences view over a settings store.
///
/// Reads go straight to the store and writes are durable on return.
pub struct Preferences<K: SettingsStore> {
    settings: Arc<K>,
}

impl<K: SettingsStore> Preferences<K> {
    /// Wraps a settings store.
    pub fn new(settings: Arc<K>) -> Self {
        Self { settings }
    }

    /// The underlying settings store.
    pub fn settings(&self) -> &Arc<K> {
        &self.settings
    }

    /// Persisted budget, or `default` if none was saved.
    pub fn budget(&self, default: f64) -> f64 {
        self.settings.get_float(KEY_BUDGET, default)
    }

    /// Persists the budget.
    pub fn set_budget(&self, budget: f64) -> StoreResult<()> {
        self.settings.set_float(KEY_BUDGET, budget)
    }

    /// Persisted notification preference; enabled by default.
    pub fn notifications_enabled(&self) -> bool {
        self.settings.get_bool(KEY_NOTIFICATIONS, true)
    }

    /// Persists the notification preference.
    pub fn set_notifications_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.settings.set_bool(KEY_NOTIFICATIONS, enabled)
    }

    /// Last-used date range, if both bounds were saved and are ordered.
    pub fn date_range(&self) -> Option<DateRange> {
        DateRange::from_bounds(self.read_date(KEY_START_DATE), self.read_date(KEY_END_DATE))
    }

    /// Persists the date range, or removes both bounds for `None`.
    pub fn set_date_range(&self, range: Option<&DateRange>) -> StoreResult<()> {
        match range {
            Some(range) => {
                self.settings
                    .set_long(KEY_START_DATE, day_start_millis(range.start()))?;
                self.settings
                    .set_long(KEY_END_DATE, day_start_millis(range.end()))
            }
            None => {
                self.settings.remove(KEY_START_DATE)?;
                self.settings.remove(KEY_END_DATE)
            }
        }
    }

    /// Default categories followed by persisted custom ones, de-duplicated.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
        for custom in self.custom_categories() {
            if !categories.contains(&custom) {
                categories.push(custom);
            }
        }
        categories
    }

    /// Adds a custom category.
    ///
    /// Returns `Ok(false)` for blank names and names already offered.
    pub fn add_category(&self, name: &str) -> StoreResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }

        let mut categories = self.categories();
        if categories.iter().any(|c| c == name) {
            return Ok(false);
        }
        categories.push(name.to_string());

        let custom: Vec<&str> = categories
            .iter()
            .map(String::as_str)
            .filter(|c| !DEFAULT_CATEGORIES.contains(c))
            .collect();
        self.settings
            .set_string(KEY_CUSTOM_CATEGORIES, &custom.join(","))?;
        Ok(true)
    }

    fn custom_categories(&self) -> Vec<String> {
        self.settings
            .get_string(KEY_CUSTOM_CATEGORIES)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn read_date(&self, key: &str) -> Option<NaiveDate> {
        match self.settings.get(key) {
            Some(SettingValue::Long(millis)) => {
                DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
            }
            _ => None,
        }
    }
}

fn day_start_millis(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN)
        .and_utc()
        .timestamp_millis()
}
