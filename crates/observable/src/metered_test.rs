//! Tests for the metered updater

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;

use super::collection::{Action, ObservableCollection, Value};
use super::metered::MeteredUpdater;

#[tokio::test(start_paused = true)]
async fn test_coalesces_to_last_value_per_key() {
    let target = ObservableCollection::map();

    // No observer on the target may ever see an intermediate value
    let seen: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    target.add_observer(move |action, _key, value| {
        if action == Action::Set {
            log.lock().push(value.to_json());
        }
    });

    let updater = MeteredUpdater::new(target.clone(), Duration::from_millis(100), || true);
    updater.set("k", json!(1));
    updater.set("k", json!(2));
    updater.set("k", json!(3));

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(target.get("k"), Some(Value::Int(3)));
    assert_eq!(&*seen.lock(), &[json!(3)]);
}

#[tokio::test(start_paused = true)]
async fn test_last_write_per_interval_wins_across_intervals() {
    let target = ObservableCollection::map();
    let updater = MeteredUpdater::new(target.clone(), Duration::from_millis(50), || true);

    updater.set("k", json!("first"));
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(target.get_str("k").unwrap(), "first");

    updater.set("k", json!("second"));
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(target.get_str("k").unwrap(), "second");
}

#[tokio::test(start_paused = true)]
async fn test_stops_when_liveness_fails() {
    let target = ObservableCollection::map();
    let alive = Arc::new(AtomicBool::new(true));

    let flag = Arc::clone(&alive);
    let updater = MeteredUpdater::new(target.clone(), Duration::from_millis(50), move || {
        flag.load(Ordering::SeqCst)
    });

    alive.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;

    // Writes after the stop are never flushed
    updater.set("k", json!(1));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(target.get("k").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_independent_keys_both_flush() {
    let target = ObservableCollection::map();
    let updater = MeteredUpdater::new(target.clone(), Duration::from_millis(50), || true);

    updater.set("a", json!(1));
    updater.set("b", json!(2));
    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(target.get("a"), Some(Value::Int(1)));
    assert_eq!(target.get("b"), Some(Value::Int(2)));
}
