//! Mock backing store for loader and engine tests
//!
//! Provides a [`MockBackingStore`] that serves keyed collections from memory
//! and records every `fetch_many` call, so tests can assert how keys were
//! batched.
//!
//! # Lock Poisoning Recovery
//!
//! Locks are acquired with `unwrap_or_else(|e| e.into_inner())`. If a test
//! panics while holding a lock, later assertions still see the store instead
//! of failing with a `PoisonError`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use graph_engine::{BackingStore, Key, StoreError};
use serde_json::Value;

/// One recorded `fetch_many` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub collection: String,
    pub keys: Vec<Key>,
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<String, HashMap<Key, Value>>,
    calls: Vec<FetchCall>,
    failing: HashSet<String>,
    latency: Option<Duration>,
}

/// In-memory [`BackingStore`] with call recording and failure injection
///
/// Clones share the same data and call log.
///
/// # Example
///
/// ```rust,ignore
/// use repohero_test_utils::MockBackingStore;
/// use serde_json::json;
///
/// let store = MockBackingStore::new()
///     .with("users", 1, json!({ "id": 1, "name": "ada" }))
///     .with("users", 2, json!({ "id": 2, "name": "grace" }));
///
/// // ... run a query ...
/// assert_eq!(store.fetch_count("users"), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockBackingStore {
    state: Arc<RwLock<StoreState>>,
}

impl MockBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record
    pub fn insert(&self, collection: &str, key: impl Into<Key>, value: Value) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.into(), value);
    }

    /// Builder form of [`MockBackingStore::insert`]
    pub fn with(self, collection: &str, key: impl Into<Key>, value: Value) -> Self {
        self.insert(collection, key, value);
        self
    }

    /// Store records keyed by their `id` property
    pub fn insert_records(&self, collection: &str, records: impl IntoIterator<Item = Value>) {
        for record in records {
            if let Some(key) = record.get("id").and_then(Key::from_value) {
                self.insert(collection, key, record);
            }
        }
    }

    /// Make every fetch from `collection` fail
    pub fn fail_collection(&self, collection: &str) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.failing.insert(collection.to_string());
    }

    /// Delay every fetch by `latency`
    pub fn set_latency(&self, latency: Duration) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.latency = Some(latency);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<FetchCall> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.calls.clone()
    }

    /// Calls made against one collection
    pub fn calls_for(&self, collection: &str) -> Vec<FetchCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.collection == collection)
            .collect()
    }

    /// Number of `fetch_many` calls against one collection
    pub fn fetch_count(&self, collection: &str) -> usize {
        self.calls_for(collection).len()
    }

    /// Number of `fetch_many` calls across every collection
    pub fn total_fetches(&self) -> usize {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.calls.len()
    }
}

#[async_trait(?Send)]
impl BackingStore for MockBackingStore {
    async fn fetch_many(
        &self,
        collection: &str,
        keys: &[Key],
    ) -> Result<HashMap<Key, Value>, StoreError> {
        let latency = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.calls.push(FetchCall {
                collection: collection.to_string(),
                keys: keys.to_vec(),
            });
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if state.failing.contains(collection) {
            return Err(StoreError::Unavailable(format!("{} is offline", collection)));
        }

        let records = state.collections.get(collection);
        Ok(keys
            .iter()
            .filter_map(|key| {
                records
                    .and_then(|r| r.get(key))
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect())
    }
}
