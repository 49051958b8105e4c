//! Observable collections - maps and sequences with change observers
//!
//! `ObservableCollection` is a cheaply clonable handle to one interior node
//! of the configuration tree. Mutations become visible first, then observers
//! fire on the mutating task: direct observers on the edited collection,
//! recursive observers on it and every ancestor. A collection attached under
//! a remote-marked subtree additionally mirrors each mutation to the
//! replication writer as an `(address, action, value)` record.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::error;

use crate::address::{Address, Key};
use crate::error::ObservableError;
use crate::Result;

/// Kind of mutation reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Insert or replace
    Set,
    /// Removal; the observer receives the removed value
    Delete,
}

/// Replication writer: receives every local mutation under a remote subtree
pub type RemoteWriter = dyn Fn(Action, &str, &serde_json::Value) + Send + Sync;

type ObserverFn = dyn Fn(Action, &Key, &Value) + Send + Sync;
type RecursiveObserverFn = dyn Fn(&ObservableCollection, Action, &Key, &Value) + Send + Sync;
type LivenessFn = dyn Fn() -> bool + Send + Sync;

/// One value in a collection: a JSON scalar or a nested collection
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Collection(ObservableCollection),
}

impl Value {
    /// Wrap a plain JSON value, building unattached collections for
    /// objects and arrays
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                let seq = ObservableCollection::seq();
                for item in items {
                    // Fresh unattached sequence: push cannot fail.
                    let _ = seq.push(Value::from_json(item));
                }
                Value::Collection(seq)
            }
            serde_json::Value::Object(entries) => {
                let map = ObservableCollection::map();
                for (key, value) in entries {
                    let _ = map.set(key.clone(), Value::from_json(value));
                }
                Value::Collection(map)
            }
        }
    }

    /// Deep plain copy
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Collection(c) => c.unwrap(),
        }
    }

    /// The nested collection, if any
    pub fn as_collection(&self) -> Option<&ObservableCollection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// The string, if this is a text scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is a bool scalar
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric value widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Collection(a), Value::Collection(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<ObservableCollection> for Value {
    fn from(c: ObservableCollection) -> Self {
        Value::Collection(c)
    }
}

enum Content {
    Map(Vec<(String, Value)>),
    Seq(Vec<Value>),
}

struct DirectEntry {
    id: u64,
    callback: Box<ObserverFn>,
    is_alive: Option<Box<LivenessFn>>,
}

struct RecursiveEntry {
    id: u64,
    callback: Box<RecursiveObserverFn>,
    is_alive: Option<Box<LivenessFn>>,
    deliver_on_self: bool,
}

#[derive(Default)]
struct Observers {
    direct: Vec<Arc<DirectEntry>>,
    recursive: Vec<Arc<RecursiveEntry>>,
}

struct Inner {
    content: RwLock<Content>,
    parent: RwLock<Option<Weak<Inner>>>,
    observers: Mutex<Observers>,
    remote: RwLock<Option<Arc<RemoteWriter>>>,
    next_observer_id: AtomicU64,
}

/// Handle to one interior node of the configuration tree
#[derive(Clone)]
pub struct ObservableCollection {
    inner: Arc<Inner>,
}

impl ObservableCollection {
    fn with_content(content: Content) -> Self {
        Self {
            inner: Arc::new(Inner {
                content: RwLock::new(content),
                parent: RwLock::new(None),
                observers: Mutex::new(Observers::default()),
                remote: RwLock::new(None),
                next_observer_id: AtomicU64::new(1),
            }),
        }
    }

    /// An empty, unattached map
    pub fn map() -> Self {
        Self::with_content(Content::Map(Vec::new()))
    }

    /// An empty, unattached sequence
    pub fn seq() -> Self {
        Self::with_content(Content::Seq(Vec::new()))
    }

    /// Wrap a JSON object or array
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match Value::from_json(json) {
            Value::Collection(c) => Ok(c),
            _ => Err(ObservableError::Shape {
                expected: "object or array",
                found: json_kind(json),
            }),
        }
    }

    /// Identity comparison of handles
    #[inline]
    pub fn ptr_eq(&self, other: &ObservableCollection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// True when this collection is a map
    pub fn is_map(&self) -> bool {
        matches!(&*self.inner.content.read(), Content::Map(_))
    }

    /// True when this collection is a sequence
    pub fn is_seq(&self) -> bool {
        !self.is_map()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        match &*self.inner.content.read() {
            Content::Map(entries) => entries.len(),
            Content::Seq(items) => items.len(),
        }
    }

    /// True when the collection has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The parent collection, if attached
    pub fn parent(&self) -> Option<ObservableCollection> {
        self.inner
            .parent
            .read()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| ObservableCollection { inner })
    }

    /// The key under which this collection sits in its parent
    pub fn key_in_parent(&self) -> Option<Key> {
        let parent = self.parent()?;
        parent.key_of(self)
    }

    fn key_of(&self, child: &ObservableCollection) -> Option<Key> {
        let content = self.inner.content.read();
        match &*content {
            Content::Map(entries) => entries.iter().find_map(|(k, v)| match v {
                Value::Collection(c) if c.ptr_eq(child) => Some(Key::Field(k.clone())),
                _ => None,
            }),
            Content::Seq(items) => items.iter().enumerate().find_map(|(i, v)| match v {
                Value::Collection(c) if c.ptr_eq(child) => Some(Key::Index(i)),
                _ => None,
            }),
        }
    }

    /// The path of keys from the tree root to this collection
    pub fn address(&self) -> Address {
        let mut reverse = Vec::new();
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            if let Some(key) = parent.key_of(&current) {
                reverse.push(key);
            }
            current = parent;
        }
        reverse.reverse();
        Address(reverse)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Look up a map field
    pub fn get(&self, key: &str) -> Option<Value> {
        match &*self.inner.content.read() {
            Content::Map(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
            Content::Seq(_) => None,
        }
    }

    /// Look up a sequence element
    pub fn get_index(&self, index: usize) -> Option<Value> {
        match &*self.inner.content.read() {
            Content::Seq(items) => items.get(index).cloned(),
            Content::Map(_) => None,
        }
    }

    /// Look up by either key kind
    pub fn get_key(&self, key: &Key) -> Option<Value> {
        match key {
            Key::Field(name) => self.get(name),
            Key::Index(index) => self.get_index(*index),
        }
    }

    /// Map field as a string
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Map field as a boolean
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Map field widened to f64
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    /// True when the map holds the field
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Snapshot of map keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        match &*self.inner.content.read() {
            Content::Map(entries) => entries.iter().map(|(k, _)| k.clone()).collect(),
            Content::Seq(_) => Vec::new(),
        }
    }

    /// Snapshot of entries in order
    pub fn entries(&self) -> Vec<(Key, Value)> {
        match &*self.inner.content.read() {
            Content::Map(entries) => entries
                .iter()
                .map(|(k, v)| (Key::Field(k.clone()), v.clone()))
                .collect(),
            Content::Seq(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Key::Index(i), v.clone()))
                .collect(),
        }
    }

    /// Deep plain copy of the subtree
    pub fn unwrap(&self) -> serde_json::Value {
        match &*self.inner.content.read() {
            Content::Map(entries) => {
                let mut object = serde_json::Map::new();
                for (key, value) in entries {
                    object.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(object)
            }
            Content::Seq(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Set a map field
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.map_set_impl(key.into(), value.into(), true)
    }

    /// Set a map field; `on_done` runs after every observer callback for
    /// this mutation, which makes it safe to register observers on a
    /// freshly inserted subtree from there
    pub fn set_with(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        on_done: impl FnOnce(),
    ) -> Result<()> {
        self.map_set_impl(key.into(), value.into(), true)?;
        on_done();
        Ok(())
    }

    /// Delete a map field; missing keys are a no-op
    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        self.map_remove_impl(key, true)
    }

    /// Replace a sequence element
    pub fn set_index(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.seq_set_impl(index, value.into(), true)
    }

    /// Append to a sequence
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let len = self.seq_len()?;
        self.seq_insert_impl(len, value.into(), true)
    }

    /// Insert into a sequence, clamping past-the-end indices
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.seq_insert_impl(index, value.into(), true)
    }

    /// Remove a sequence element; out-of-bounds indices are an error
    pub fn remove_index(&self, index: usize) -> Result<Value> {
        self.seq_remove_impl(index, true)
    }

    fn seq_len(&self) -> Result<usize> {
        match &*self.inner.content.read() {
            Content::Seq(items) => Ok(items.len()),
            Content::Map(_) => Err(ObservableError::NotASeq),
        }
    }

    fn map_set_impl(&self, key: String, value: Value, emit_remote: bool) -> Result<()> {
        if let Value::Collection(c) = &value {
            if c.parent().is_some() {
                return Err(ObservableError::AlreadyAttached);
            }
        }
        let replaced;
        {
            let mut content = self.inner.content.write();
            let entries = match &mut *content {
                Content::Map(entries) => entries,
                Content::Seq(_) => return Err(ObservableError::NotAMap),
            };
            if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                // Writing an equal scalar is not an effective mutation.
                if scalar_eq(&slot.1, &value) {
                    return Ok(());
                }
                replaced = Some(std::mem::replace(&mut slot.1, value.clone()));
            } else {
                entries.push((key.clone(), value.clone()));
                replaced = None;
            }
        }
        self.finish_set(Key::Field(key), value, replaced, emit_remote);
        Ok(())
    }

    fn map_remove_impl(&self, key: &str, emit_remote: bool) -> Result<Option<Value>> {
        let removed;
        {
            let mut content = self.inner.content.write();
            let entries = match &mut *content {
                Content::Map(entries) => entries,
                Content::Seq(_) => return Err(ObservableError::NotAMap),
            };
            match entries.iter().position(|(k, _)| k == key) {
                Some(position) => removed = entries.remove(position).1,
                None => return Ok(None),
            }
        }
        self.finish_delete(Key::Field(key.to_string()), &removed, emit_remote);
        Ok(Some(removed))
    }

    fn seq_set_impl(&self, index: usize, value: Value, emit_remote: bool) -> Result<()> {
        if let Value::Collection(c) = &value {
            if c.parent().is_some() {
                return Err(ObservableError::AlreadyAttached);
            }
        }
        let replaced;
        {
            let mut content = self.inner.content.write();
            let items = match &mut *content {
                Content::Seq(items) => items,
                Content::Map(_) => return Err(ObservableError::NotASeq),
            };
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(ObservableError::IndexOutOfBounds { index, len })?;
            if scalar_eq(slot, &value) {
                return Ok(());
            }
            replaced = Some(std::mem::replace(slot, value.clone()));
        }
        self.finish_set(Key::Index(index), value, replaced, emit_remote);
        Ok(())
    }

    fn seq_insert_impl(&self, index: usize, value: Value, emit_remote: bool) -> Result<()> {
        if let Value::Collection(c) = &value {
            if c.parent().is_some() {
                return Err(ObservableError::AlreadyAttached);
            }
        }
        let index = {
            let mut content = self.inner.content.write();
            let items = match &mut *content {
                Content::Seq(items) => items,
                Content::Map(_) => return Err(ObservableError::NotASeq),
            };
            let index = index.min(items.len());
            items.insert(index, value.clone());
            index
        };
        self.finish_set(Key::Index(index), value, None, emit_remote);
        Ok(())
    }

    fn seq_remove_impl(&self, index: usize, emit_remote: bool) -> Result<Value> {
        let removed;
        {
            let mut content = self.inner.content.write();
            let items = match &mut *content {
                Content::Seq(items) => items,
                Content::Map(_) => return Err(ObservableError::NotASeq),
            };
            let len = items.len();
            if index >= len {
                return Err(ObservableError::IndexOutOfBounds { index, len });
            }
            removed = items.remove(index);
        }
        self.finish_delete(Key::Index(index), &removed, emit_remote);
        Ok(removed)
    }

    fn finish_set(&self, key: Key, value: Value, replaced: Option<Value>, emit_remote: bool) {
        if let Some(Value::Collection(old)) = &replaced {
            old.detach();
        }
        if let Value::Collection(c) = &value {
            c.attach_to(self);
        }
        if emit_remote {
            self.emit_remote(Action::Set, &key, &value);
        }
        self.notify(self, Action::Set, &key, &value);
    }

    fn finish_delete(&self, key: Key, removed: &Value, emit_remote: bool) {
        if let Value::Collection(old) = removed {
            old.detach();
        }
        if emit_remote {
            self.emit_remote(Action::Delete, &key, removed);
        }
        self.notify(self, Action::Delete, &key, removed);
    }

    fn attach_to(&self, parent: &ObservableCollection) {
        *self.inner.parent.write() = Some(Arc::downgrade(&parent.inner));
        let writer = parent.inner.remote.read().clone();
        self.propagate_remote(writer);
    }

    fn detach(&self) {
        *self.inner.parent.write() = None;
        self.propagate_remote(None);
    }

    // ========================================================================
    // Merge / assign
    // ========================================================================

    /// Deep structural union: map keys merge recursively, sequences on the
    /// right replace wholesale, scalars on the right win. Observers fire for
    /// each effective mutation, leaves inward.
    pub fn merge(&self, other: &serde_json::Value) -> Result<()> {
        self.merge_impl(other, true)
    }

    fn merge_impl(&self, other: &serde_json::Value, emit_remote: bool) -> Result<()> {
        match other {
            serde_json::Value::Object(entries) => {
                if !self.is_map() {
                    return Err(ObservableError::NotAMap);
                }
                for (key, value) in entries {
                    self.merge_entry(Key::Field(key.clone()), value, emit_remote)?;
                }
                Ok(())
            }
            serde_json::Value::Array(items) => {
                if !self.is_seq() {
                    return Err(ObservableError::NotASeq);
                }
                for (index, value) in items.iter().enumerate() {
                    self.merge_entry(Key::Index(index), value, emit_remote)?;
                }
                Ok(())
            }
            _ => Err(ObservableError::Shape {
                expected: "object or array",
                found: json_kind(other),
            }),
        }
    }

    fn merge_entry(&self, key: Key, value: &serde_json::Value, emit_remote: bool) -> Result<()> {
        match value {
            serde_json::Value::Object(_) => {
                if let Some(Value::Collection(existing)) = self.get_key(&key) {
                    if existing.is_map() {
                        return existing.merge_impl(value, emit_remote);
                    }
                }
                let fresh = ObservableCollection::map();
                self.set_key_impl(key, Value::Collection(fresh.clone()), emit_remote)?;
                fresh.merge_impl(value, emit_remote)
            }
            serde_json::Value::Array(_) => {
                let fresh = ObservableCollection::seq();
                self.set_key_impl(key, Value::Collection(fresh.clone()), emit_remote)?;
                fresh.merge_impl(value, emit_remote)
            }
            scalar => self.set_key_impl(key, Value::from_json(scalar), emit_remote),
        }
    }

    /// Merge, then delete entries absent on the right
    pub fn assign(&self, other: &serde_json::Value) -> Result<()> {
        self.merge(other)?;
        match other {
            serde_json::Value::Object(entries) => {
                for key in self.keys() {
                    if !entries.contains_key(&key) {
                        self.remove(&key)?;
                    }
                }
            }
            serde_json::Value::Array(items) => {
                let len = self.len();
                for index in (items.len()..len).rev() {
                    self.remove_index(index)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn set_key_impl(&self, key: Key, value: Value, emit_remote: bool) -> Result<()> {
        match key {
            Key::Field(name) => self.map_set_impl(name, value, emit_remote),
            Key::Index(index) => {
                let len = self.seq_len()?;
                if index >= len {
                    self.seq_insert_impl(index, value, emit_remote)
                } else {
                    self.seq_set_impl(index, value, emit_remote)
                }
            }
        }
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Register an observer that fires on mutations of this collection
    pub fn add_observer<F>(&self, observer: F)
    where
        F: Fn(Action, &Key, &Value) + Send + Sync + 'static,
    {
        self.add_entry(Box::new(observer), None);
    }

    /// Register an observer removed once `is_alive` returns false
    pub fn add_observer_while<F, A>(&self, observer: F, is_alive: A)
    where
        F: Fn(Action, &Key, &Value) + Send + Sync + 'static,
        A: Fn() -> bool + Send + Sync + 'static,
    {
        self.add_entry(Box::new(observer), Some(Box::new(is_alive)));
    }

    fn add_entry(&self, callback: Box<ObserverFn>, is_alive: Option<Box<LivenessFn>>) {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.inner.observers.lock().direct.push(Arc::new(DirectEntry {
            id,
            callback,
            is_alive,
        }));
    }

    /// Register an observer that also receives bubbled notifications from
    /// descendants; the originating collection is the first argument
    pub fn add_recursive_observer<F>(&self, observer: F, deliver_on_self: bool)
    where
        F: Fn(&ObservableCollection, Action, &Key, &Value) + Send + Sync + 'static,
    {
        self.add_recursive_entry(Box::new(observer), None, deliver_on_self);
    }

    /// Recursive observer removed once `is_alive` returns false
    pub fn add_recursive_observer_while<F, A>(&self, observer: F, is_alive: A, deliver_on_self: bool)
    where
        F: Fn(&ObservableCollection, Action, &Key, &Value) + Send + Sync + 'static,
        A: Fn() -> bool + Send + Sync + 'static,
    {
        self.add_recursive_entry(Box::new(observer), Some(Box::new(is_alive)), deliver_on_self);
    }

    fn add_recursive_entry(
        &self,
        callback: Box<RecursiveObserverFn>,
        is_alive: Option<Box<LivenessFn>>,
        deliver_on_self: bool,
    ) {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .observers
            .lock()
            .recursive
            .push(Arc::new(RecursiveEntry {
                id,
                callback,
                is_alive,
                deliver_on_self,
            }));
    }

    fn notify(&self, origin: &ObservableCollection, action: Action, key: &Key, value: &Value) {
        let on_origin = self.ptr_eq(origin);

        if on_origin {
            let snapshot: Vec<Arc<DirectEntry>> = self.inner.observers.lock().direct.clone();
            let mut dead = Vec::new();
            for entry in snapshot {
                if let Some(alive) = &entry.is_alive {
                    if !alive() {
                        dead.push(entry.id);
                        continue;
                    }
                }
                let result =
                    catch_unwind(AssertUnwindSafe(|| (entry.callback)(action, key, value)));
                if result.is_err() {
                    error!(?action, "config observer panicked");
                }
            }
            if !dead.is_empty() {
                self.inner
                    .observers
                    .lock()
                    .direct
                    .retain(|e| !dead.contains(&e.id));
            }
        }

        let snapshot: Vec<Arc<RecursiveEntry>> = self.inner.observers.lock().recursive.clone();
        let mut dead = Vec::new();
        for entry in snapshot {
            if on_origin && !entry.deliver_on_self {
                continue;
            }
            if let Some(alive) = &entry.is_alive {
                if !alive() {
                    dead.push(entry.id);
                    continue;
                }
            }
            let result = catch_unwind(AssertUnwindSafe(|| {
                (entry.callback)(origin, action, key, value)
            }));
            if result.is_err() {
                error!(?action, "recursive config observer panicked");
            }
        }
        if !dead.is_empty() {
            self.inner
                .observers
                .lock()
                .recursive
                .retain(|e| !dead.contains(&e.id));
        }

        if let Some(parent) = self.parent() {
            parent.notify(origin, action, key, value);
        }
    }

    // ========================================================================
    // Replication
    // ========================================================================

    /// Mark this subtree remote: every local SET/DELETE is also handed to
    /// `writer` as an `(address, action, value)` change record
    pub fn set_remote_writer(&self, writer: Arc<RemoteWriter>) {
        self.propagate_remote(Some(writer));
    }

    /// Remove the replication writer from this subtree
    pub fn clear_remote_writer(&self) {
        self.propagate_remote(None);
    }

    fn propagate_remote(&self, writer: Option<Arc<RemoteWriter>>) {
        *self.inner.remote.write() = writer.clone();
        for (_, value) in self.entries() {
            if let Value::Collection(child) = value {
                child.propagate_remote(writer.clone());
            }
        }
    }

    fn emit_remote(&self, action: Action, key: &Key, value: &Value) {
        let writer = self.inner.remote.read().clone();
        if let Some(writer) = writer {
            let address = format!("{}{}", self.address(), key);
            writer(action, &address, &value.to_json());
        }
    }

    /// Apply an inbound change record without re-emitting it to the
    /// replication writer; local observers still fire
    pub fn apply_remote_set(&self, key: &Key, value: &serde_json::Value) -> Result<()> {
        let kinds_match = match (self.get_key(key), value) {
            (Some(Value::Collection(c)), serde_json::Value::Object(_)) => c.is_map(),
            (Some(Value::Collection(c)), serde_json::Value::Array(_)) => c.is_seq(),
            _ => false,
        };
        match value {
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                if kinds_match {
                    if let Some(Value::Collection(existing)) = self.get_key(key) {
                        return existing.assign_remote(value);
                    }
                }
                self.merge_entry(key.clone(), value, false)
            }
            scalar => self.set_key_impl(key.clone(), Value::from_json(scalar), false),
        }
    }

    /// Apply an inbound delete record without re-emitting it
    pub fn apply_remote_delete(&self, key: &Key) -> Result<()> {
        match key {
            Key::Field(name) => self.map_remove_impl(name, false).map(|_| ()),
            Key::Index(index) => self.seq_remove_impl(*index, false).map(|_| ()),
        }
    }

    fn assign_remote(&self, other: &serde_json::Value) -> Result<()> {
        self.merge_impl(other, false)?;
        match other {
            serde_json::Value::Object(entries) => {
                for key in self.keys() {
                    if !entries.contains_key(&key) {
                        self.map_remove_impl(&key, false)?;
                    }
                }
            }
            serde_json::Value::Array(items) => {
                let len = self.len();
                for index in (items.len()..len).rev() {
                    self.seq_remove_impl(index, false)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl std::fmt::Debug for ObservableCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unwrap())
    }
}

/// True when both values are equal scalars; collections never compare equal
/// here so replacing one always notifies
fn scalar_eq(a: &Value, b: &Value) -> bool {
    !matches!(a, Value::Collection(_)) && !matches!(b, Value::Collection(_)) && a == b
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Apply one change record at `address` under `root`
///
/// An empty address with a SET object assigns the whole document. A SET on a
/// sequence index equal to the current length appends, matching the bridge
/// peer's append convention.
pub fn apply_change(
    root: &ObservableCollection,
    address: &Address,
    action: Action,
    value: &serde_json::Value,
) -> Result<()> {
    if address.is_root() {
        return match action {
            Action::Set => root.assign_remote(value),
            Action::Delete => Err(ObservableError::AddressResolve(address.to_string())),
        };
    }

    let mut current = root.clone();
    for key in &address.0[..address.0.len() - 1] {
        match current.get_key(key) {
            Some(Value::Collection(child)) => current = child,
            _ => return Err(ObservableError::AddressResolve(address.to_string())),
        }
    }
    let last = &address.0[address.0.len() - 1];
    match action {
        Action::Set => current.apply_remote_set(last, value),
        Action::Delete => current.apply_remote_delete(last),
    }
}
