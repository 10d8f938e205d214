//! The expense engine: mutation gate, projection and alerting.

use crate::alert::AlertSink;
use crate::config::{AlertTrigger, EngineConfig};
use crate::connectivity::Connectivity;
use crate::error::{EngineError, EngineResult, Operation};
use crate::expense::{total_for, DateRange, Expense};
use crate::preferences::Preferences;
use crate::status::{OperationStatus, StatusCell};
use crate::threshold::{range_qualifier, BudgetState, ThresholdEvaluator};
use chrono::{NaiveDate, Utc};
use expensesync_store::{RemoteStore, SettingsStore, SnapshotEvent, StoreError, StoreResult};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const INVALID_INPUT_MESSAGE: &str = "Please enter a valid amount and category";

/// Synchronizes expenses with a remote store and raises budget alerts.
///
/// Mutations are gated on a caller-sampled online flag. The expense
/// projection is replaced wholesale by the subscription handler and never
/// written by a mutation. Each reactive field lives in its own `watch`
/// channel, so every write is a single atomic replace; no method holds more
/// than one of them at a time, and when several are touched they are touched
/// in the order gate, status, projection.
///
/// Concurrent calls are not serialized against each other: the final status
/// reflects whichever call finished last.
pub struct ExpenseEngine<S: RemoteStore, K: SettingsStore> {
    config: EngineConfig,
    store: Arc<S>,
    prefs: Preferences<K>,
    alerts: Arc<dyn AlertSink>,
    connectivity: Arc<dyn Connectivity>,
    evaluator: ThresholdEvaluator,
    status: StatusCell,
    expenses: watch::Sender<Vec<Expense>>,
    total: watch::Sender<f64>,
    budget: watch::Sender<f64>,
    notifications: watch::Sender<bool>,
    range: RwLock<Option<DateRange>>,
}

impl<S, K> ExpenseEngine<S, K>
where
    S: RemoteStore + 'static,
    K: SettingsStore + 'static,
{
    /// Creates an engine, loading preferences and registering the alert channel.
    ///
    /// No store call is made until [`start`](Self::start) or a mutation.
    pub fn new(
        config: EngineConfig,
        store: Arc<S>,
        settings: Arc<K>,
        alerts: Arc<dyn AlertSink>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        let prefs = Preferences::new(settings);

        let mut budget = prefs.budget(config.default_budget);
        if !budget.is_finite() || budget <= 0.0 {
            warn!(budget, "persisted budget is not a positive number; using default");
            budget = config.default_budget;
        }
        let notifications = prefs.notifications_enabled();
        let range = prefs.date_range();

        alerts.register_channel(&config.alert_channel);
        let evaluator =
            ThresholdEvaluator::new(config.approaching_margin, config.alert_channel.id.clone());

        let (expenses, _) = watch::channel(Vec::new());
        let (total, _) = watch::channel(0.0);
        let (budget, _) = watch::channel(budget);
        let (notifications, _) = watch::channel(notifications);

        Self {
            config,
            store,
            prefs,
            alerts,
            connectivity,
            evaluator,
            status: StatusCell::new(),
            expenses,
            total,
            budget,
            notifications,
            range: RwLock::new(range),
        }
    }

    /// Brings the store in line with connectivity and starts listening.
    ///
    /// Connectivity is sampled once. Offline, the store's network is disabled
    /// and its local cache cleared so stale cached writes never surface as
    /// confirmed; online, the network is enabled. Failures here are logged
    /// and do not prevent the subscription, which is always established.
    ///
    /// The returned task applies every delivered snapshot and ends when the
    /// subscription closes or the engine is dropped.
    pub async fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let online = self.connectivity.is_online();
        info!(online, collection = %self.config.collection, "starting expense engine");

        if online {
            if let Err(e) = self.store.set_network_enabled(true).await {
                warn!(error = %e, "failed to enable network at startup");
            }
        } else {
            self.disable_and_clear().await;
        }

        let mut rx = self.store.subscribe(&self.config.collection);
        let engine = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                engine.apply_snapshot(event);
            }
            debug!("expense subscription closed");
        })
    }

    /// Applies one subscription delivery.
    ///
    /// A listen error sets the status message and leaves the projection as
    /// is. A snapshot replaces the projection; documents that fail to decode
    /// are skipped individually.
    pub fn apply_snapshot(&self, event: SnapshotEvent) {
        let snapshot = match event {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let message = format!("Failed to fetch expenses: {e}");
                let err = EngineError::StoreListenFailed(e);
                warn!(error = %err, "listen error; keeping current projection");
                self.status.set_error_message(Some(message));
                return;
            }
        };

        let mut skipped = 0usize;
        let expenses: Vec<Expense> = snapshot
            .documents
            .iter()
            .filter_map(|doc| match Expense::from_document(doc) {
                Ok(expense) => Some(expense),
                Err(err) => {
                    skipped += 1;
                    debug!(id = %doc.id, error = %err, "skipping undecodable document");
                    None
                }
            })
            .collect();

        let total = total_for(&expenses, self.range.read().as_ref());
        let count = expenses.len();
        self.expenses.send_replace(expenses);
        self.total.send_replace(total);
        debug!(count, skipped, total, "snapshot applied");

        if self.config.alert_trigger == AlertTrigger::OnSnapshot {
            self.evaluate(total);
        }
    }

    /// Creates an expense stamped with the current time.
    ///
    /// The id is allocated from the store before any suspension point.
    /// The projection is not touched; the new record arrives through the
    /// subscription once the store confirms it.
    pub async fn add_expense(
        &self,
        amount: f64,
        category: &str,
        is_online: bool,
    ) -> EngineResult<Expense> {
        if let Err(err) = Expense::validate_new(amount, category) {
            debug!(error = %err, "rejected expense input");
            self.status.fail(INVALID_INPUT_MESSAGE);
            return Err(err);
        }
        self.gate(Operation::AddExpense, is_online)?;

        let id = self.store.new_id(&self.config.collection);
        let expense = Expense::new(id, amount, category.trim(), Utc::now());
        let document = match expense.to_document() {
            Ok(document) => document,
            Err(err) => {
                self.status.fail(format!("Failed to add expense: {err}"));
                return Err(err);
            }
        };

        self.status.begin_single();
        debug!(id = %expense.id, amount, category = %expense.category, "adding expense");

        let result = self
            .online_call(self.store.put(&self.config.collection, document))
            .await;
        match result {
            Ok(()) => {
                self.status.succeed();
                info!(id = %expense.id, "expense added");
                Ok(expense)
            }
            Err(source) => Err(self.fail_write(Operation::AddExpense, source).await),
        }
    }

    /// Deletes a single expense by id.
    pub async fn delete_expense(&self, id: &str, is_online: bool) -> EngineResult<()> {
        self.gate(Operation::DeleteExpense, is_online)?;

        self.status.begin_single();
        debug!(id, "deleting expense");

        let result = self
            .online_call(self.store.delete(&self.config.collection, id))
            .await;
        match result {
            Ok(()) => {
                self.status.succeed();
                info!(id, "expense deleted");
                Ok(())
            }
            Err(source) => Err(self.fail_write(Operation::DeleteExpense, source).await),
        }
    }

    /// Deletes every expense currently in the store in one atomic batch.
    ///
    /// `is_deleting` is raised from the start of the call until the listing
    /// comes back empty or the batch resolves. An empty store short-circuits
    /// to success without a batch request. Returns the number of deleted
    /// records.
    pub async fn clear_all_expenses(&self, is_online: bool) -> EngineResult<usize> {
        self.gate(Operation::ClearExpenses, is_online)?;

        self.status.begin_bulk();
        debug!("clearing all expenses");

        let result = self.online_call(self.delete_all_listed()).await;
        match result {
            Ok(count) => {
                self.status.succeed();
                self.status.end_bulk();
                info!(count, "expenses cleared");
                Ok(count)
            }
            Err(source) => {
                let operation = Operation::ClearExpenses;
                self.record_failure(operation, &source);
                self.status.end_bulk();
                self.disable_and_clear().await;
                Err(EngineError::StoreWriteFailed { operation, source })
            }
        }
    }

    /// Updates and persists the budget, then re-evaluates alerts.
    ///
    /// Values that are not finite and strictly positive are ignored. Returns whether
    /// the budget was applied.
    pub fn update_budget(&self, new_budget: f64) -> bool {
        if !new_budget.is_finite() || new_budget <= 0.0 {
            debug!(new_budget, "ignoring non-positive or non-finite budget");
            return false;
        }

        self.budget.send_replace(new_budget);
        if let Err(e) = self.prefs.set_budget(new_budget) {
            warn!(error = %EngineError::Settings(e), "failed to persist budget");
        }
        let total = *self.total.borrow();
        self.evaluate(total);
        true
    }

    /// Enables or disables budget alerts and persists the choice.
    pub fn toggle_notifications(&self, enabled: bool) {
        self.notifications.send_replace(enabled);
        if let Err(e) = self.prefs.set_notifications_enabled(enabled) {
            warn!(error = %EngineError::Settings(e), "failed to persist notification preference");
        }
    }

    /// Sets or clears the status error message.
    pub fn set_error_message(&self, message: Option<String>) {
        self.status.set_error_message(message);
    }

    /// Accepts an externally computed total and date range, then evaluates.
    ///
    /// The range is remembered (and persisted) for later snapshots and alert
    /// text; it only applies when both bounds are present and ordered.
    pub fn update_total_expenses_for_notifications(
        &self,
        total: f64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Option<BudgetState> {
        self.total.send_replace(total);
        self.store_range(DateRange::from_bounds(start_date, end_date));
        self.evaluate(total)
    }

    /// Recomputes the total from the projection over the current range and
    /// evaluates it.
    pub fn recalculate(&self) -> Option<BudgetState> {
        let total = self.total_for(self.date_range().as_ref());
        self.total.send_replace(total);
        self.evaluate(total)
    }

    /// Sums the projection over an optional range.
    pub fn total_for(&self, range: Option<&DateRange>) -> f64 {
        total_for(&self.expenses.borrow(), range)
    }

    /// Samples the connectivity oracle.
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Current projection, in arrival order.
    pub fn expenses(&self) -> Vec<Expense> {
        self.expenses.borrow().clone()
    }

    /// Watches the projection.
    pub fn subscribe_expenses(&self) -> watch::Receiver<Vec<Expense>> {
        self.expenses.subscribe()
    }

    /// Current total used for alerting.
    pub fn total_expenses(&self) -> f64 {
        *self.total.borrow()
    }

    /// Watches the total.
    pub fn subscribe_total(&self) -> watch::Receiver<f64> {
        self.total.subscribe()
    }

    /// Current budget.
    pub fn budget(&self) -> f64 {
        *self.budget.borrow()
    }

    /// Watches the budget.
    pub fn subscribe_budget(&self) -> watch::Receiver<f64> {
        self.budget.subscribe()
    }

    /// Whether budget alerts are enabled.
    pub fn notifications_enabled(&self) -> bool {
        *self.notifications.borrow()
    }

    /// Watches the notification preference.
    pub fn subscribe_notifications(&self) -> watch::Receiver<bool> {
        self.notifications.subscribe()
    }

    /// Current operation status.
    pub fn status(&self) -> OperationStatus {
        self.status.current()
    }

    /// Watches the operation status.
    pub fn subscribe_status(&self) -> watch::Receiver<OperationStatus> {
        self.status.subscribe()
    }

    /// Whether the last operation succeeded.
    pub fn operation_success(&self) -> bool {
        self.status.current().success
    }

    /// Most recent error message, if not cleared.
    pub fn error_message(&self) -> Option<String> {
        self.status.current().error_message
    }

    /// Whether a bulk clear is in flight.
    pub fn is_deleting(&self) -> bool {
        self.status.current().is_deleting
    }

    /// The date range alerts are currently restricted to.
    pub fn date_range(&self) -> Option<DateRange> {
        *self.range.read()
    }

    /// Categories offered for new expenses.
    pub fn categories(&self) -> Vec<String> {
        self.prefs.categories()
    }

    /// Adds a custom category; returns whether it was new.
    pub fn add_category(&self, name: &str) -> bool {
        match self.prefs.add_category(name) {
            Ok(added) => added,
            Err(e) => {
                warn!(error = %EngineError::Settings(e), "failed to persist category");
                false
            }
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn gate(&self, operation: Operation, is_online: bool) -> EngineResult<()> {
        if is_online {
            return Ok(());
        }
        warn!(%operation, "refused while offline");
        self.status.fail(operation.offline_message());
        Err(EngineError::ConnectivityDenied { operation })
    }

    /// Enables the network, then runs `call`.
    async fn online_call<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        self.store.set_network_enabled(true).await?;
        call.await
    }

    async fn delete_all_listed(&self) -> StoreResult<usize> {
        let documents = self.store.list_all(&self.config.collection).await?;
        if documents.is_empty() {
            debug!("nothing to clear");
            return Ok(0);
        }
        let ids: Vec<String> = documents.into_iter().map(|d| d.id).collect();
        self.store
            .delete_batch(&self.config.collection, &ids)
            .await?;
        Ok(ids.len())
    }

    fn record_failure(&self, operation: Operation, source: &StoreError) {
        error!(%operation, error = %source, "store write failed");
        self.status.fail(operation.failure_message(source));
    }

    async fn fail_write(&self, operation: Operation, source: StoreError) -> EngineError {
        self.record_failure(operation, &source);
        self.disable_and_clear().await;
        EngineError::StoreWriteFailed { operation, source }
    }

    /// Disables the network, then drops cached writes so nothing queued is
    /// replayed later. A failed disable skips the clear; nothing is rolled back.
    async fn disable_and_clear(&self) {
        if let Err(e) = self.store.set_network_enabled(false).await {
            error!(error = %e, "failed to disable network");
            return;
        }
        if let Err(e) = self.store.clear_local_cache().await {
            error!(error = %e, "failed to clear local cache");
            return;
        }
        debug!("network disabled and local cache cleared");
    }

    fn store_range(&self, range: Option<DateRange>) {
        *self.range.write() = range;
        if let Err(e) = self.prefs.set_date_range(range.as_ref()) {
            warn!(error = %EngineError::Settings(e), "failed to persist date range");
        }
    }

    fn evaluate(&self, total: f64) -> Option<BudgetState> {
        let qualifier = range_qualifier(self.date_range().as_ref());
        self.evaluator.evaluate(
            total,
            self.budget(),
            self.notifications_enabled(),
            &qualifier,
            self.alerts.as_ref(),
        )
    }
}
