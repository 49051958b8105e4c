//! Tests for observable collections

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use super::address::{Address, Key};
use super::collection::*;
use super::error::ObservableError;

/// Collects (action, address-ish key, json value) triples for assertions
fn recording_observer(
    log: &Arc<Mutex<Vec<(Action, String, serde_json::Value)>>>,
) -> impl Fn(Action, &Key, &Value) + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |action, key, value| {
        log.lock().push((action, key.to_string(), value.to_json()));
    }
}

// ============================================================================
// Basic mutation and reads
// ============================================================================

#[test]
fn test_map_set_get_remove() {
    let map = ObservableCollection::map();
    map.set("a", 1i64).unwrap();
    map.set("b", "two").unwrap();

    assert_eq!(map.get("a"), Some(Value::Int(1)));
    assert_eq!(map.get_str("b").unwrap(), "two");
    assert_eq!(map.keys(), vec!["a".to_string(), "b".to_string()]);

    assert!(map.remove("a").unwrap().is_some());
    assert!(map.get("a").is_none());
    // Deleting a missing map key is a no-op
    assert!(map.remove("zzz").unwrap().is_none());
}

#[test]
fn test_seq_push_insert_remove() {
    let seq = ObservableCollection::seq();
    seq.push(1i64).unwrap();
    seq.push(3i64).unwrap();
    seq.insert(1, 2i64).unwrap();

    assert_eq!(seq.len(), 3);
    assert_eq!(seq.get_index(1), Some(Value::Int(2)));

    seq.remove_index(0).unwrap();
    assert_eq!(seq.get_index(0), Some(Value::Int(2)));

    // Out-of-bounds removal is an error on sequences
    assert!(matches!(
        seq.remove_index(10),
        Err(ObservableError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn test_map_ops_on_seq_rejected() {
    let seq = ObservableCollection::seq();
    assert!(matches!(seq.set("a", 1i64), Err(ObservableError::NotAMap)));
    let map = ObservableCollection::map();
    assert!(matches!(map.push(1i64), Err(ObservableError::NotASeq)));
}

#[test]
fn test_attached_subtree_rejected_in_second_parent() {
    let root = ObservableCollection::map();
    let child = ObservableCollection::map();
    root.set("a", child.clone()).unwrap();

    let other = ObservableCollection::map();
    assert!(matches!(
        other.set("b", child.clone()),
        Err(ObservableError::AlreadyAttached)
    ));

    // Replacing detaches the old subtree, which may then be re-attached
    root.set("a", 1i64).unwrap();
    assert!(child.parent().is_none());
    other.set("b", child).unwrap();
}

#[test]
fn test_address_computation() {
    let root = ObservableCollection::map();
    let nodes = ObservableCollection::seq();
    let node = ObservableCollection::map();
    root.set("nodes", nodes.clone()).unwrap();
    nodes.push(node.clone()).unwrap();

    assert_eq!(node.address().to_string(), "['nodes'][0]");
    assert_eq!(root.address(), Address::root());
    assert_eq!(node.key_in_parent(), Some(Key::Index(0)));
}

// ============================================================================
// Observers
// ============================================================================

#[test]
fn test_observer_sees_mutations_in_order() {
    let map = ObservableCollection::map();
    let log = Arc::new(Mutex::new(Vec::new()));
    map.add_observer(recording_observer(&log));

    map.set("a", 1i64).unwrap();
    map.set("a", 2i64).unwrap();
    map.remove("a").unwrap();

    let log = log.lock();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0], (Action::Set, "['a']".into(), json!(1)));
    assert_eq!(log[1], (Action::Set, "['a']".into(), json!(2)));
    assert_eq!(log[2], (Action::Delete, "['a']".into(), json!(2)));
}

#[test]
fn test_equal_scalar_write_does_not_notify() {
    let map = ObservableCollection::map();
    let count = Arc::new(AtomicUsize::new(0));
    let n = Arc::clone(&count);
    map.add_observer(move |_, _, _| {
        n.fetch_add(1, Ordering::SeqCst);
    });

    map.set("a", 1i64).unwrap();
    map.set("a", 1i64).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dead_observer_never_fires_again() {
    let map = ObservableCollection::map();
    let alive = Arc::new(AtomicBool::new(true));
    let count = Arc::new(AtomicUsize::new(0));

    let a = Arc::clone(&alive);
    let n = Arc::clone(&count);
    map.add_observer_while(
        move |_, _, _| {
            n.fetch_add(1, Ordering::SeqCst);
        },
        move || a.load(Ordering::SeqCst),
    );

    map.set("a", 1i64).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    alive.store(false, Ordering::SeqCst);
    map.set("a", 2i64).unwrap();
    map.set("a", 3i64).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_recursive_observer_receives_bubbled_origin() {
    let root = ObservableCollection::map();
    let child = ObservableCollection::map();
    root.set("child", child.clone()).unwrap();

    let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    root.add_recursive_observer(
        move |origin, _action, key, _value| {
            log.lock().push((origin.address().to_string(), key.to_string()));
        },
        true,
    );

    child.set("x", 1i64).unwrap();
    root.set("y", 2i64).unwrap();

    let seen = seen.lock();
    assert_eq!(seen[0], ("['child']".to_string(), "['x']".to_string()));
    assert_eq!(seen[1], (String::new(), "['y']".to_string()));
}

#[test]
fn test_recursive_observer_without_self_delivery() {
    let root = ObservableCollection::map();
    let child = ObservableCollection::map();
    root.set("child", child.clone()).unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let n = Arc::clone(&count);
    root.add_recursive_observer(
        move |_, _, _, _| {
            n.fetch_add(1, Ordering::SeqCst);
        },
        false,
    );

    root.set("y", 1i64).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    child.set("x", 1i64).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_observer_panic_does_not_abort_fanout() {
    let map = ObservableCollection::map();
    let count = Arc::new(AtomicUsize::new(0));

    map.add_observer(|_, _, _| panic!("misbehaving observer"));
    let n = Arc::clone(&count);
    map.add_observer(move |_, _, _| {
        n.fetch_add(1, Ordering::SeqCst);
    });

    map.set("a", 1i64).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_set_with_runs_after_observers() {
    let map = ObservableCollection::map();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&order);
    map.add_observer(move |_, _, _| log.lock().push("observer"));

    let log = Arc::clone(&order);
    map.set_with("a", 1i64, move || log.lock().push("done"))
        .unwrap();

    assert_eq!(&*order.lock(), &["observer", "done"]);
}

// ============================================================================
// Merge and unwrap
// ============================================================================

#[test]
fn test_merge_fans_out_per_level() {
    // Seed scenario: merge a node config into an empty root. The direct
    // observer sees SET on nodes; a recursive observer additionally sees
    // SET on nodes[0] and on each field.
    let root = ObservableCollection::map();

    let direct = Arc::new(Mutex::new(Vec::new()));
    root.add_observer(recording_observer(&direct));

    let bubbled: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&bubbled);
    root.add_recursive_observer(
        move |origin, _action, key, _value| {
            log.lock().push(format!("{}{}", origin.address(), key));
        },
        true,
    );

    root.merge(&json!({
        "nodes": [{"name": "A", "type": "WAVE", "Running": false}]
    }))
    .unwrap();

    let direct = direct.lock();
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].1, "['nodes']");

    let bubbled = bubbled.lock();
    assert!(bubbled.contains(&"['nodes']".to_string()));
    assert!(bubbled.contains(&"['nodes'][0]".to_string()));
    assert!(bubbled.contains(&"['nodes'][0]['name']".to_string()));
    assert!(bubbled.contains(&"['nodes'][0]['type']".to_string()));
    assert!(bubbled.contains(&"['nodes'][0]['Running']".to_string()));
}

#[test]
fn test_merge_unwrap_identity() {
    let source = json!({
        "nodes": [
            {"name": "A", "type": "WAVE", "Running": true, "Frequency": 2.5},
            {"name": "B", "type": "NONE"}
        ],
        "data_views": {"left": [1, 2, 3]},
        "custom": null
    });

    let root = ObservableCollection::map();
    root.merge(&source).unwrap();
    assert_eq!(root.unwrap(), source);

    // Round trip through a second empty root
    let again = ObservableCollection::map();
    again.merge(&root.unwrap()).unwrap();
    assert_eq!(again.unwrap(), source);
}

#[test]
fn test_merge_right_scalars_win_and_maps_recurse() {
    let root = ObservableCollection::map();
    root.merge(&json!({"a": {"x": 1, "y": 2}, "b": 1})).unwrap();
    let inner = root.get("a").unwrap().as_collection().unwrap().clone();

    root.merge(&json!({"a": {"y": 3}, "b": 2})).unwrap();

    // The nested map identity survives a recursive merge
    assert!(root.get("a").unwrap().as_collection().unwrap().ptr_eq(&inner));
    assert_eq!(root.unwrap(), json!({"a": {"x": 1, "y": 3}, "b": 2}));
}

#[test]
fn test_merge_replaces_sequences_wholesale() {
    let root = ObservableCollection::map();
    root.merge(&json!({"s": [1, 2, 3]})).unwrap();
    let old = root.get("s").unwrap().as_collection().unwrap().clone();

    root.merge(&json!({"s": [9]})).unwrap();
    assert!(!root.get("s").unwrap().as_collection().unwrap().ptr_eq(&old));
    assert_eq!(root.unwrap(), json!({"s": [9]}));
    assert!(old.parent().is_none());
}

#[test]
fn test_assign_deletes_absent_keys() {
    let root = ObservableCollection::map();
    root.merge(&json!({"a": 1, "b": 2})).unwrap();
    root.assign(&json!({"b": 3})).unwrap();
    assert_eq!(root.unwrap(), json!({"b": 3}));
}

// ============================================================================
// Replication
// ============================================================================

#[test]
fn test_remote_writer_sees_local_changes() {
    let root = ObservableCollection::map();
    let nodes = ObservableCollection::seq();
    root.set("nodes", nodes.clone()).unwrap();

    let records: Arc<Mutex<Vec<(Action, String, serde_json::Value)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    root.set_remote_writer(Arc::new(move |action, address, value| {
        sink.lock().push((action, address.to_string(), value.clone()));
    }));

    nodes.push(42i64).unwrap();
    root.set("x", true).unwrap();
    root.remove("x").unwrap();

    let records = records.lock();
    assert_eq!(records[0], (Action::Set, "['nodes'][0]".into(), json!(42)));
    assert_eq!(records[1], (Action::Set, "['x']".into(), json!(true)));
    assert_eq!(records[2], (Action::Delete, "['x']".into(), json!(true)));
}

#[test]
fn test_inbound_change_applies_without_echo() {
    let root = ObservableCollection::map();
    root.merge(&json!({"nodes": [{"name": "A", "Running": false}]}))
        .unwrap();

    let records: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    root.set_remote_writer(Arc::new(move |_, address, _| {
        sink.lock().push(address.to_string());
    }));

    // Local observers still fire for inbound changes
    let count = Arc::new(AtomicUsize::new(0));
    let n = Arc::clone(&count);
    root.add_recursive_observer(
        move |_, _, _, _| {
            n.fetch_add(1, Ordering::SeqCst);
        },
        true,
    );

    let address = Address::parse("['nodes'][0]['Running']").unwrap();
    apply_change(&root, &address, Action::Set, &json!(true)).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(records.lock().is_empty(), "inbound change echoed to writer");
    assert_eq!(
        root.unwrap()["nodes"][0]["Running"],
        serde_json::Value::Bool(true)
    );
}

#[test]
fn test_apply_change_appends_at_sequence_end() {
    let root = ObservableCollection::map();
    root.merge(&json!({"nodes": []})).unwrap();

    let address = Address::parse("['nodes'][0]").unwrap();
    apply_change(&root, &address, Action::Set, &json!({"name": "A"})).unwrap();
    assert_eq!(root.unwrap()["nodes"][0]["name"], json!("A"));
}

#[test]
fn test_apply_change_full_document() {
    let root = ObservableCollection::map();
    root.merge(&json!({"a": 1, "stale": true})).unwrap();

    apply_change(&root, &Address::root(), Action::Set, &json!({"a": 2})).unwrap();
    assert_eq!(root.unwrap(), json!({"a": 2}));
}

#[test]
fn test_apply_change_unresolved_address() {
    let root = ObservableCollection::map();
    let address = Address::parse("['missing'][0]['x']").unwrap();
    assert!(matches!(
        apply_change(&root, &address, Action::Set, &json!(1)),
        Err(ObservableError::AddressResolve(_))
    ));
}
