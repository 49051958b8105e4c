//! Pipeline document load/save
//!
//! The configuration is a single JSON document. `nodes` is the only
//! mandatory top-level key and is defaulted when absent; unknown keys are
//! preserved across load → save untouched.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::collection::{ObservableCollection, Value};
use crate::error::ObservableError;
use crate::Result;

/// Load a pipeline document from a JSON file
pub fn load(path: impl AsRef<Path>) -> Result<ObservableCollection> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    if !json.is_object() {
        return Err(ObservableError::Shape {
            expected: "object",
            found: if json.is_array() { "array" } else { "scalar" },
        });
    }

    let root = ObservableCollection::from_json(&json)?;
    ensure_defaults(&root)?;

    info!(path = %path.display(), nodes = node_count(&root), "loaded pipeline document");
    Ok(root)
}

/// An empty document with the mandatory keys installed
pub fn empty() -> ObservableCollection {
    let root = ObservableCollection::map();
    // Defaults on a fresh map cannot fail.
    let _ = ensure_defaults(&root);
    root
}

fn ensure_defaults(root: &ObservableCollection) -> Result<()> {
    if !root.contains_key("nodes") {
        root.set("nodes", ObservableCollection::seq())?;
    }
    if !root.contains_key("reward_schedule") {
        let schedule = serde_json::json!({"schedules": [[0]], "index": 0});
        root.set("reward_schedule", Value::from_json(&schedule))?;
    }
    Ok(())
}

fn node_count(root: &ObservableCollection) -> usize {
    root.get("nodes")
        .and_then(|v| v.as_collection().map(ObservableCollection::len))
        .unwrap_or(0)
}

/// Save a pipeline document atomically: write a temp file, then rename
pub fn save(path: impl AsRef<Path>, root: &ObservableCollection) -> Result<()> {
    let path = path.as_ref();
    let json = root.unwrap();
    let text = serde_json::to_string_pretty(&json)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;

    info!(path = %path.display(), "saved pipeline document");
    Ok(())
}
