//! Tests for document load/save

use serde_json::json;

use super::collection::ObservableCollection;
use super::document::*;

#[test]
fn test_load_defaults_mandatory_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    std::fs::write(&path, "{}").unwrap();

    let root = load(&path).unwrap();
    assert!(root.get("nodes").is_some());
    assert_eq!(
        root.unwrap()["reward_schedule"],
        json!({"schedules": [[0]], "index": 0})
    );
}

#[test]
fn test_load_rejects_non_object() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    std::fs::write(&path, "[1, 2]").unwrap();
    assert!(load(&path).is_err());
}

#[test]
fn test_unknown_keys_survive_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    let source = json!({
        "nodes": [{"name": "A", "type": "WAVE"}],
        "data_views": {"panes": []},
        "node_widgets": {"A": {"collapsed": true}},
        "thalamus_view_geometry": [0, 0, 800, 600],
        "an_unknown_extension": {"keep": "me"}
    });
    std::fs::write(&path, serde_json::to_string(&source).unwrap()).unwrap();

    let root = load(&path).unwrap();
    let out = dir.path().join("saved.json");
    save(&out, &root).unwrap();

    let reloaded: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(reloaded["an_unknown_extension"], source["an_unknown_extension"]);
    assert_eq!(reloaded["node_widgets"], source["node_widgets"]);
    assert_eq!(reloaded["nodes"], source["nodes"]);
}

#[test]
fn test_save_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");

    let root = empty();
    save(&path, &root).unwrap();
    root.set("marker", 1i64).unwrap();
    save(&path, &root).unwrap();

    let reloaded: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reloaded["marker"], json!(1));
    assert!(!dir.path().join("pipeline.json.tmp").exists());
}

#[test]
fn test_empty_document_has_nodes() {
    let root = empty();
    assert!(root
        .get("nodes")
        .and_then(|v| v.as_collection().map(ObservableCollection::is_seq))
        .unwrap_or(false));
}
