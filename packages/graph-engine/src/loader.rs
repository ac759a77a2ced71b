//! Per-collection batch loader
//!
//! This loader collects every key requested during one resolution wave and
//! fetches them with a single call to the backing store, solving the N+1
//! problem for relationship resolvers. Results (including not-found and
//! errors) are cached for the lifetime of the owning
//! [`ResolutionContext`](crate::ResolutionContext).
//!
//! The loader never flushes on its own. The context's scheduler calls
//! [`BatchLoader::dispatch`] once all resolvers of the wave are suspended.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures_util::future::join_all;
use serde_json::Value;

use crate::error::{FieldError, FieldResult};
use crate::store::BackingStore;
use crate::value::{CollectionId, Key};

/// Outcome of one key: `Ok(None)` means the store had no record
pub type LoadOutcome = FieldResult<Option<Value>>;

enum SlotState {
    Pending(Vec<Waker>),
    Ready(LoadOutcome),
}

/// Shared cell behind every handle for one key
struct Slot {
    state: RefCell<SlotState>,
}

impl Slot {
    fn pending() -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(SlotState::Pending(Vec::new())),
        })
    }

    fn ready(outcome: LoadOutcome) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(SlotState::Ready(outcome)),
        })
    }

    /// Resolve a pending slot; resolved slots keep their first outcome
    fn resolve(&self, outcome: LoadOutcome) {
        let wakers = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                SlotState::Pending(wakers) => {
                    let wakers = std::mem::take(wakers);
                    *state = SlotState::Ready(outcome);
                    wakers
                }
                SlotState::Ready(_) => return,
            }
        };
        for waker in wakers {
            waker.wake();
        }
    }
}

/// Future returned by [`BatchLoader::load`]
///
/// Completes once the batch holding its key has been dispatched.
#[must_use = "a load handle does nothing unless awaited"]
pub struct LoadHandle {
    slot: Rc<Slot>,
}

impl LoadHandle {
    /// A handle that is already resolved
    pub(crate) fn ready(outcome: LoadOutcome) -> Self {
        Self {
            slot: Slot::ready(outcome),
        }
    }
}

impl Future for LoadHandle {
    type Output = LoadOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.slot.state.borrow_mut();
        match &mut *state {
            SlotState::Ready(outcome) => Poll::Ready(outcome.clone()),
            SlotState::Pending(wakers) => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

/// Counters kept by each loader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Calls made to `fetch_many`
    pub batches: usize,
    /// Keys sent to the store across all batches
    pub keys_fetched: usize,
    /// Loads answered from the cache or merged into an already queued key
    pub cache_hits: usize,
}

impl std::ops::AddAssign for LoaderStats {
    fn add_assign(&mut self, other: Self) {
        self.batches += other.batches;
        self.keys_fetched += other.keys_fetched;
        self.cache_hits += other.cache_hits;
    }
}

#[derive(Default)]
struct LoaderState {
    /// Keys queued since the last dispatch, in request order
    pending: Vec<Key>,
    slots: HashMap<Key, Rc<Slot>>,
    cancelled: bool,
    stats: LoaderStats,
}

/// Batching cache for one backing collection
pub struct BatchLoader {
    collection: CollectionId,
    store: Arc<dyn BackingStore>,
    max_batch_size: Option<usize>,
    state: RefCell<LoaderState>,
}

impl BatchLoader {
    pub fn new(
        collection: impl Into<CollectionId>,
        store: Arc<dyn BackingStore>,
        max_batch_size: Option<usize>,
    ) -> Self {
        Self {
            collection: collection.into(),
            store,
            max_batch_size,
            state: RefCell::new(LoaderState::default()),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Request one key
    ///
    /// A key already cached or queued shares the existing slot, so it is
    /// fetched at most once per context.
    pub fn load(&self, key: Key) -> LoadHandle {
        let mut state = self.state.borrow_mut();
        if let Some(slot) = state.slots.get(&key) {
            let slot = Rc::clone(slot);
            state.stats.cache_hits += 1;
            return LoadHandle { slot };
        }
        if state.cancelled {
            return LoadHandle::ready(Err(FieldError::Cancelled));
        }

        let slot = Slot::pending();
        state.slots.insert(key.clone(), Rc::clone(&slot));
        state.pending.push(key);
        LoadHandle { slot }
    }

    /// Request several keys; the output follows the input order
    pub fn load_many(
        &self,
        keys: impl IntoIterator<Item = Key>,
    ) -> impl Future<Output = FieldResult<Vec<Option<Value>>>> {
        let handles: Vec<LoadHandle> = keys.into_iter().map(|key| self.load(key)).collect();
        async move {
            let mut values = Vec::with_capacity(handles.len());
            for handle in handles {
                values.push(handle.await?);
            }
            Ok(values)
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.state.borrow().pending.is_empty()
    }

    pub fn stats(&self) -> LoaderStats {
        self.state.borrow().stats
    }

    /// Fetch every queued key and resolve the waiting handles
    pub async fn dispatch(&self) {
        let keys = {
            let mut state = self.state.borrow_mut();
            if state.cancelled {
                state.pending.clear();
                return;
            }
            std::mem::take(&mut state.pending)
        };
        if keys.is_empty() {
            return;
        }

        match self.max_batch_size {
            Some(size) => {
                join_all(keys.chunks(size).map(|chunk| self.fetch_batch(chunk))).await;
            }
            None => self.fetch_batch(&keys).await,
        }
    }

    async fn fetch_batch(&self, keys: &[Key]) {
        {
            let mut state = self.state.borrow_mut();
            state.stats.batches += 1;
            state.stats.keys_fetched += keys.len();
        }
        tracing::debug!(
            collection = %self.collection,
            keys = keys.len(),
            "Dispatching batch"
        );

        let result = self.store.fetch_many(&self.collection, keys).await;

        let slots: Vec<(&Key, Rc<Slot>)> = {
            let state = self.state.borrow();
            let slots = keys
                .iter()
                .filter_map(|key| state.slots.get(key).map(|slot| (key, Rc::clone(slot))))
                .collect();
            slots
        };

        match result {
            Ok(mut found) => {
                for (key, slot) in slots {
                    slot.resolve(Ok(found.remove(key)));
                }
            }
            Err(err) => {
                let error = FieldError::BatchFetchFailed {
                    collection: self.collection.clone(),
                    message: err.to_string(),
                };
                tracing::warn!(
                    collection = %self.collection,
                    keys = keys.len(),
                    error = %err,
                    "Batch failed, failing every handle in it"
                );
                for (_, slot) in slots {
                    slot.resolve(Err(error.clone()));
                }
            }
        }
    }

    /// Resolve every unresolved handle to `Cancelled` and refuse new keys
    pub(crate) fn cancel(&self) {
        let slots: Vec<Rc<Slot>> = {
            let mut state = self.state.borrow_mut();
            state.cancelled = true;
            state.pending.clear();
            let slots = state.slots.values().cloned().collect();
            slots
        };
        for slot in slots {
            slot.resolve(Err(FieldError::Cancelled));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Store that records each batch and serves `{"id": key}` for even keys
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<Vec<Key>>>,
        fail: bool,
    }

    #[async_trait(?Send)]
    impl BackingStore for RecordingStore {
        async fn fetch_many(
            &self,
            _collection: &str,
            keys: &[Key],
        ) -> Result<HashMap<Key, Value>, StoreError> {
            self.calls.lock().unwrap().push(keys.to_vec());
            if self.fail {
                return Err(StoreError::Unavailable("offline".to_string()));
            }
            Ok(keys
                .iter()
                .filter(|k| matches!(k, Key::Int(i) if i % 2 == 0))
                .map(|k| (k.clone(), json!({ "id": k.to_value() })))
                .collect())
        }
    }

    fn loader(store: Arc<RecordingStore>, max_batch_size: Option<usize>) -> BatchLoader {
        BatchLoader::new("users", store, max_batch_size)
    }

    #[tokio::test]
    async fn test_duplicate_keys_queue_once() {
        let store = Arc::new(RecordingStore::default());
        let loader = loader(store.clone(), None);

        let a = loader.load(Key::Int(2));
        let b = loader.load(Key::Int(2));
        let c = loader.load(Key::Int(4));
        loader.dispatch().await;

        assert_eq!(a.await.unwrap(), Some(json!({"id": 2})));
        assert_eq!(b.await.unwrap(), Some(json!({"id": 2})));
        assert_eq!(c.await.unwrap(), Some(json!({"id": 4})));
        assert_eq!(*store.calls.lock().unwrap(), vec![vec![Key::Int(2), Key::Int(4)]]);
        assert_eq!(loader.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let store = Arc::new(RecordingStore::default());
        let loader = loader(store.clone(), None);

        let missing = loader.load(Key::Int(3));
        loader.dispatch().await;
        assert_eq!(missing.await, Ok(None));

        assert_eq!(loader.load(Key::Int(3)).await, Ok(None));
        assert!(!loader.has_pending());
        assert_eq!(store.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cached_key_not_refetched() {
        let store = Arc::new(RecordingStore::default());
        let loader = loader(store.clone(), None);

        let first = loader.load(Key::Int(2));
        loader.dispatch().await;
        first.await.unwrap();

        let again = loader.load(Key::Int(2));
        assert!(!loader.has_pending());
        loader.dispatch().await;
        assert_eq!(again.await.unwrap(), Some(json!({"id": 2})));
        assert_eq!(store.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_batch_fails_every_handle() {
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let loader = loader(store, None);

        let handles: Vec<_> = [2, 4, 6].into_iter().map(|i| loader.load(Key::Int(i))).collect();
        loader.dispatch().await;
        for handle in handles {
            assert!(matches!(
                handle.await,
                Err(FieldError::BatchFetchFailed { collection, .. }) if collection == "users"
            ));
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_batch_is_logged() {
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let loader = loader(store, None);

        let handle = loader.load(Key::Int(2));
        loader.dispatch().await;
        assert!(handle.await.is_err());
        assert!(logs_contain("Batch failed"));
        assert!(logs_contain("offline"));
    }

    #[tokio::test]
    async fn test_max_batch_size_splits_keys() {
        let store = Arc::new(RecordingStore::default());
        let loader = loader(store.clone(), Some(2));

        let all = loader.load_many((1..=5).map(Key::Int));
        loader.dispatch().await;
        let values = all.await.unwrap();

        assert_eq!(values.len(), 5);
        assert_eq!(values[1], Some(json!({"id": 2})));
        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(loader.stats().keys_fetched, 5);
    }

    #[tokio::test]
    async fn test_cancel_keeps_resolved_values() {
        let store = Arc::new(RecordingStore::default());
        let loader = loader(store.clone(), None);

        let resolved = loader.load(Key::Int(2));
        loader.dispatch().await;
        let pending = loader.load(Key::Int(4));
        loader.cancel();

        assert_eq!(resolved.await.unwrap(), Some(json!({"id": 2})));
        assert_eq!(pending.await, Err(FieldError::Cancelled));
        assert_eq!(loader.load(Key::Int(8)).await, Err(FieldError::Cancelled));

        loader.dispatch().await;
        assert_eq!(store.calls.lock().unwrap().len(), 1);
    }
}
