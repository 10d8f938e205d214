//! Integration tests for the expense engine against the in-memory store.

use chrono::{NaiveDate, TimeZone, Utc};
use expensesync_engine::store::{
    Document, FileSettings, InMemoryRemoteStore, MemorySettings, RemoteStore, SettingsStore,
    StoreCall, StoreOp,
};
use expensesync_engine::{
    AlertTrigger, BudgetState, EngineConfig, EngineError, Expense, ExpenseEngine,
    RecordingAlertSink, StaticConnectivity, APPROACHING_ALERT_ID, EXCEEDED_ALERT_ID,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const COLL: &str = "expenses";

struct Harness<K: SettingsStore + 'static> {
    store: Arc<InMemoryRemoteStore>,
    settings: Arc<K>,
    alerts: Arc<RecordingAlertSink>,
    connectivity: Arc<StaticConnectivity>,
    engine: Arc<ExpenseEngine<InMemoryRemoteStore, K>>,
}

impl<K: SettingsStore + 'static> Harness<K> {
    fn with(
        config: EngineConfig,
        store: Arc<InMemoryRemoteStore>,
        settings: Arc<K>,
        online: bool,
    ) -> Self {
        let alerts = Arc::new(RecordingAlertSink::new());
        let connectivity = Arc::new(StaticConnectivity::new(online));
        let engine = Arc::new(ExpenseEngine::new(
            config,
            Arc::clone(&store),
            Arc::clone(&settings),
            alerts.clone(),
            connectivity.clone(),
        ));
        Self {
            store,
            settings,
            alerts,
            connectivity,
            engine,
        }
    }

    async fn wait_for_count(&self, count: usize) {
        let mut rx = self.engine.subscribe_expenses();
        timeout(Duration::from_secs(2), rx.wait_for(|e| e.len() == count))
            .await
            .expect("projection did not reach expected size")
            .expect("projection channel closed");
    }
}

fn harness() -> Harness<MemorySettings> {
    Harness::with(
        EngineConfig::default(),
        Arc::new(InMemoryRemoteStore::new()),
        Arc::new(MemorySettings::new()),
        true,
    )
}

fn seeded(id: &str, amount: f64, y: i32, m: u32, d: u32) -> Document {
    let ts = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
    Expense::new(id, amount, "Food", ts).to_document().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn added_expenses_arrive_through_subscription() {
    let h = harness();
    h.store.insert_raw(COLL, seeded("existing", 5.0, 2024, 1, 1));
    let _task = h.engine.start().await;
    h.wait_for_count(1).await;

    let a = h.engine.add_expense(10.0, "Food", true).await.unwrap();
    let b = h.engine.add_expense(20.0, "Travel", true).await.unwrap();
    h.wait_for_count(3).await;

    let ids: Vec<String> = h.engine.expenses().into_iter().map(|e| e.id).collect();
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), 3);
    assert!(ids.contains(&"existing".to_string()));
    assert!(ids.contains(&a.id));
    assert!(ids.contains(&b.id));
    assert_eq!(h.engine.total_expenses(), 35.0);
    assert!(h.engine.operation_success());
}

#[tokio::test]
async fn delete_removes_from_projection() {
    let h = harness();
    let _task = h.engine.start().await;
    let expense = h.engine.add_expense(10.0, "Food", true).await.unwrap();
    h.wait_for_count(1).await;

    h.engine.delete_expense(&expense.id, true).await.unwrap();
    h.wait_for_count(0).await;
    assert!(h.engine.operation_success());
    assert_eq!(h.engine.total_expenses(), 0.0);
}

#[tokio::test]
async fn offline_mutations_are_refused() {
    let h = harness();
    let _task = h.engine.start().await;
    h.store.clear_calls();

    let add = h.engine.add_expense(10.0, "Food", false).await;
    assert!(matches!(add, Err(EngineError::ConnectivityDenied { .. })));
    let delete = h.engine.delete_expense("x", false).await;
    assert!(delete.unwrap_err().is_connectivity_denied());
    let clear = h.engine.clear_all_expenses(false).await;
    assert!(clear.unwrap_err().is_connectivity_denied());

    assert!(h.store.calls().is_empty());
    assert!(!h.engine.operation_success());
    assert_eq!(
        h.engine.error_message().as_deref(),
        Some("Cannot clear expenses: No internet connection")
    );
    assert!(!h.engine.is_deleting());
}

#[tokio::test]
async fn clear_on_empty_store_skips_batch() {
    let h = harness();
    let cleared = h.engine.clear_all_expenses(true).await.unwrap();

    assert_eq!(cleared, 0);
    assert!(h.engine.operation_success());
    assert!(!h.engine.is_deleting());
    assert_eq!(h.store.count(StoreOp::DeleteBatch), 0);
}

#[tokio::test]
async fn clear_issues_one_batch_and_flags_deleting() {
    let h = harness();
    for (i, amount) in [10.0, 20.0, 30.0].iter().enumerate() {
        h.store
            .insert_raw(COLL, seeded(&format!("e{i}"), *amount, 2024, 1, 1));
    }
    let _task = h.engine.start().await;
    h.wait_for_count(3).await;

    h.store.pause(StoreOp::ListAll);
    let engine = Arc::clone(&h.engine);
    let clear = tokio::spawn(async move { engine.clear_all_expenses(true).await });

    timeout(Duration::from_secs(2), async {
        while h.store.count(StoreOp::ListAll) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert!(h.engine.is_deleting());

    h.store.resume(StoreOp::ListAll);
    let cleared = clear.await.unwrap().unwrap();
    assert_eq!(cleared, 3);
    assert!(!h.engine.is_deleting());
    assert!(h.engine.operation_success());

    let batches: Vec<Vec<String>> = h
        .store
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            StoreCall::DeleteBatch(ids) => Some(ids),
            _ => None,
        })
        .collect();
    assert_eq!(
        batches,
        vec![vec!["e0".to_string(), "e1".to_string(), "e2".to_string()]]
    );
    h.wait_for_count(0).await;
}

#[tokio::test]
async fn failed_clear_recovers_and_drops_flag() {
    let h = harness();
    h.store.insert_raw(COLL, seeded("a", 10.0, 2024, 1, 1));
    h.store.set_failure(StoreOp::DeleteBatch, true);

    let err = h.engine.clear_all_expenses(true).await.unwrap_err();
    assert!(matches!(err, EngineError::StoreWriteFailed { .. }));
    assert!(!h.engine.is_deleting());
    assert!(!h.engine.operation_success());
    assert!(h
        .engine
        .error_message()
        .unwrap()
        .starts_with("Failed to clear expenses:"));
    assert!(!h.store.is_network_enabled());
    assert_eq!(h.store.count(StoreOp::ClearCache), 1);
    assert_eq!(h.store.committed(COLL).len(), 1);
}

#[tokio::test]
async fn offline_startup_disables_network_and_clears_cache() {
    let store = Arc::new(InMemoryRemoteStore::new());
    store.set_network_enabled(false).await.unwrap();
    let _ = store.put(COLL, seeded("stale", 40.0, 2024, 1, 1)).await;
    store.clear_calls();

    let h = Harness::with(
        EngineConfig::default(),
        store,
        Arc::new(MemorySettings::new()),
        false,
    );
    let _task = h.engine.start().await;

    assert_eq!(
        h.store.calls(),
        vec![StoreCall::SetNetworkEnabled(false), StoreCall::ClearLocalCache]
    );
    assert_eq!(h.store.pending_writes(), 0);
    assert_eq!(h.store.subscriber_count(COLL), 1);
    h.wait_for_count(0).await;
    assert!(!h.engine.is_online());

    h.connectivity.set_online(true);
    assert!(h.engine.is_online());
}

#[tokio::test]
async fn online_startup_enables_network() {
    let store = Arc::new(InMemoryRemoteStore::new());
    store.set_network_enabled(false).await.unwrap();
    store.clear_calls();

    let h = Harness::with(
        EngineConfig::default(),
        store,
        Arc::new(MemorySettings::new()),
        true,
    );
    let _task = h.engine.start().await;
    assert_eq!(h.store.calls(), vec![StoreCall::SetNetworkEnabled(true)]);
    assert!(h.store.is_network_enabled());
}

#[tokio::test]
async fn startup_failure_still_subscribes() {
    let h = harness();
    h.store.set_failure(StoreOp::SetNetwork, true);
    h.store.insert_raw(COLL, seeded("a", 1.0, 2024, 1, 1));

    let _task = h.engine.start().await;
    h.wait_for_count(1).await;
}

#[tokio::test]
async fn malformed_documents_are_skipped() {
    let h = harness();
    h.store.insert_raw(COLL, seeded("good", 12.0, 2024, 1, 1));
    h.store.insert_raw(COLL, Document::new("bad", vec![0xde, 0xad]));
    let _task = h.engine.start().await;

    h.wait_for_count(1).await;
    assert_eq!(h.engine.expenses()[0].id, "good");
    assert!(h.engine.error_message().is_none());
}

#[tokio::test]
async fn listen_errors_keep_projection() {
    let h = harness();
    h.store.insert_raw(COLL, seeded("a", 12.0, 2024, 1, 1));
    let _task = h.engine.start().await;
    h.wait_for_count(1).await;

    let mut status = h.engine.subscribe_status();
    h.store.inject_listen_error(COLL, "unavailable");
    timeout(
        Duration::from_secs(2),
        status.wait_for(|s| s.error_message.is_some()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(h.engine.expenses().len(), 1);
    h.engine.set_error_message(None);
    assert!(h.engine.error_message().is_none());
}

#[tokio::test]
async fn threshold_alerts_follow_total() {
    let h = harness();

    assert_eq!(
        h.engine.update_total_expenses_for_notifications(750.0, None, None),
        Some(BudgetState::Approaching)
    );
    assert_eq!(h.alerts.presented().last().unwrap().alert_id, APPROACHING_ALERT_ID);

    assert_eq!(
        h.engine.update_total_expenses_for_notifications(1001.0, None, None),
        Some(BudgetState::Exceeded)
    );
    assert_eq!(h.alerts.presented().last().unwrap().alert_id, EXCEEDED_ALERT_ID);

    h.alerts.clear();
    assert_eq!(
        h.engine.update_total_expenses_for_notifications(699.0, None, None),
        Some(BudgetState::Normal)
    );
    assert_eq!(h.alerts.presented_count(), 0);

    h.engine.toggle_notifications(false);
    for total in [750.0, 1001.0, 10_000.0] {
        assert_eq!(
            h.engine.update_total_expenses_for_notifications(total, None, None),
            None
        );
    }
    assert_eq!(h.alerts.presented_count(), 0);
}

#[tokio::test]
async fn date_range_filters_snapshot_total_and_alert_text() {
    let h = harness();
    h.store.insert_raw(COLL, seeded("jan", 800.0, 2024, 1, 15));
    h.store.insert_raw(COLL, seeded("feb", 500.0, 2024, 2, 15));

    let january = (Some(date(2024, 1, 1)), Some(date(2024, 1, 31)));
    h.engine
        .update_total_expenses_for_notifications(0.0, january.0, january.1);
    assert!(h.engine.date_range().is_some());

    let _task = h.engine.start().await;
    h.wait_for_count(2).await;
    assert_eq!(h.engine.total_expenses(), 800.0);
    assert_eq!(h.engine.total_for(None), 1300.0);

    assert_eq!(h.engine.recalculate(), Some(BudgetState::Approaching));
    let body = h.alerts.presented().last().unwrap().body.clone();
    assert!(body.contains("($800.00) within 01/01/2024 - 01/31/2024"));
}

#[tokio::test]
async fn snapshot_trigger_alerts_on_delivery() {
    let h = Harness::with(
        EngineConfig::new().with_alert_trigger(AlertTrigger::OnSnapshot),
        Arc::new(InMemoryRemoteStore::new()),
        Arc::new(MemorySettings::new()),
        true,
    );
    let _task = h.engine.start().await;
    h.wait_for_count(0).await;
    assert_eq!(h.alerts.presented_count(), 0);

    h.engine.add_expense(1200.0, "Travel", true).await.unwrap();
    h.wait_for_count(1).await;
    assert_eq!(h.alerts.visible()[0].alert_id, EXCEEDED_ALERT_ID);
}

#[tokio::test]
async fn recalculation_trigger_ignores_snapshots() {
    let h = harness();
    let _task = h.engine.start().await;
    h.engine.add_expense(1200.0, "Travel", true).await.unwrap();
    h.wait_for_count(1).await;
    assert_eq!(h.alerts.presented_count(), 0);

    assert_eq!(h.engine.recalculate(), Some(BudgetState::Exceeded));
    assert_eq!(h.alerts.presented_count(), 1);
}

#[tokio::test]
async fn preferences_survive_restart() {
    let settings = Arc::new(MemorySettings::new());
    let store = Arc::new(InMemoryRemoteStore::new());

    let first = Harness::with(
        EngineConfig::default(),
        Arc::clone(&store),
        Arc::clone(&settings),
        true,
    );
    first.engine.toggle_notifications(false);
    first.engine.update_budget(640.0);
    first.engine.update_total_expenses_for_notifications(
        0.0,
        Some(date(2024, 3, 1)),
        Some(date(2024, 3, 31)),
    );
    assert!(first.engine.add_category("Gym"));
    drop(first);

    let second = Harness::with(EngineConfig::default(), store, Arc::clone(&settings), true);
    assert!(!second.engine.notifications_enabled());
    assert_eq!(second.engine.budget(), 640.0);
    let range = second.engine.date_range().unwrap();
    assert_eq!(range.start(), date(2024, 3, 1));
    assert_eq!(range.end(), date(2024, 3, 31));
    assert!(second.engine.categories().contains(&"Gym".to_string()));
    assert_eq!(second.settings.get_float("budget", 0.0), 640.0);
}

#[tokio::test]
async fn file_settings_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    {
        let h = Harness::with(
            EngineConfig::default(),
            Arc::new(InMemoryRemoteStore::new()),
            Arc::new(FileSettings::open(&path).unwrap()),
            true,
        );
        h.engine.toggle_notifications(false);
        h.engine.toggle_notifications(true);
        h.engine.toggle_notifications(false);
        assert!(!h.engine.update_budget(-5.0));
    }

    let h = Harness::with(
        EngineConfig::default(),
        Arc::new(InMemoryRemoteStore::new()),
        Arc::new(FileSettings::open(&path).unwrap()),
        true,
    );
    assert!(!h.engine.notifications_enabled());
    assert_eq!(h.engine.budget(), 1000.0);
    assert!(!h.settings.contains("budget"));
}

#[tokio::test]
async fn non_finite_budget_never_reaches_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    {
        let h = Harness::with(
            EngineConfig::default(),
            Arc::new(InMemoryRemoteStore::new()),
            Arc::new(FileSettings::open(&path).unwrap()),
            true,
        );
        assert!(h.engine.update_budget(750.0));
        assert!(!h.engine.update_budget(f64::INFINITY));
        assert_eq!(h.engine.budget(), 750.0);
    }

    let reopened = FileSettings::open(&path).unwrap();
    assert_eq!(reopened.get_float("budget", 0.0), 750.0);

    let h = Harness::with(
        EngineConfig::default(),
        Arc::new(InMemoryRemoteStore::new()),
        Arc::new(reopened),
        true,
    );
    assert_eq!(h.engine.budget(), 750.0);
}

#[tokio::test]
async fn dropping_engine_ends_subscription_task() {
    let h = harness();
    let task = h.engine.start().await;
    h.wait_for_count(0).await;

    let Harness { store, engine, .. } = h;
    drop(engine);
    store.insert_raw(COLL, seeded("late", 1.0, 2024, 1, 1));

    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    assert_eq!(store.subscriber_count(COLL), 0);
}
