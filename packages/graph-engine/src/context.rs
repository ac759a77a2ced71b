//! Per-request resolution context and its wave scheduler
//!
//! A [`ResolutionContext`] lives for exactly one execution. It owns one
//! [`BatchLoader`] per backing collection and drives the resolver tree with
//! an explicit collect-then-execute loop:
//!
//! 1. poll the tree until every branch is suspended (the wave);
//! 2. if any loader has queued keys, dispatch each such loader once;
//! 3. repeat until the tree completes.
//!
//! Keys requested by one wave therefore always share a batch. Children of a
//! freshly loaded parent are requested in the next wave.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::{poll_fn, Future};
use std::pin::{pin, Pin};
use std::rc::Rc;
use std::sync::Arc;
use std::task::Poll;

use futures_util::future::join_all;
use repohero_shared_config::EngineConfig;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::envelope::{Envelope, ErrorSet};
use crate::error::{FieldError, FieldResult};
use crate::loader::{BatchLoader, LoadHandle, LoaderStats};
use crate::store::{BackingStore, MutationOp, MutationStore};
use crate::value::{CollectionId, Key};

/// Counters for one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Waves that ended with at least one dispatch
    pub waves: usize,
    /// Loaders created
    pub loaders: usize,
    /// Totals across every loader
    pub loads: LoaderStats,
}

/// Scope of one query execution
pub struct ResolutionContext {
    request_id: Uuid,
    store: Arc<dyn BackingStore>,
    mutations: Option<Arc<dyn MutationStore>>,
    config: EngineConfig,
    loaders: RefCell<BTreeMap<CollectionId, Rc<BatchLoader>>>,
    token: CancellationToken,
    cancelled: Cell<bool>,
    waves: Cell<usize>,
}

impl ResolutionContext {
    pub fn new(store: Arc<dyn BackingStore>, config: EngineConfig) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            store,
            mutations: None,
            config,
            loaders: RefCell::new(BTreeMap::new()),
            token: CancellationToken::new(),
            cancelled: Cell::new(false),
            waves: Cell::new(0),
        }
    }

    /// Attach the store mutations write through
    pub fn with_mutation_store(mut self, mutations: Arc<dyn MutationStore>) -> Self {
        self.mutations = Some(mutations);
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Loader for a collection, created on first use
    pub fn loader_for(&self, collection: &str) -> Rc<BatchLoader> {
        if let Some(loader) = self.loaders.borrow().get(collection) {
            return Rc::clone(loader);
        }

        let loader = Rc::new(BatchLoader::new(
            collection,
            Arc::clone(&self.store),
            self.config.max_batch_size,
        ));
        if self.is_cancelled() {
            loader.cancel();
        }
        self.loaders
            .borrow_mut()
            .insert(collection.to_string(), Rc::clone(&loader));
        loader
    }

    /// Shorthand for `loader_for(collection).load(key)`
    pub fn load(&self, collection: &str, key: impl Into<Key>) -> LoadHandle {
        self.loader_for(collection).load(key.into())
    }

    /// Run a mutation and fold its outcome into an envelope
    pub async fn apply(&self, op: MutationOp) -> Envelope<Value> {
        if self.is_cancelled() {
            return Envelope::Failure(ErrorSet::base("request was cancelled"));
        }
        match &self.mutations {
            Some(mutations) => {
                tracing::debug!(collection = %op.collection, action = ?op.action, "Applying mutation");
                Envelope::from_apply(mutations.apply(op).await)
            }
            None => {
                tracing::error!(collection = %op.collection, "No mutation store configured");
                Envelope::Failure(ErrorSet::base("mutations are not supported"))
            }
        }
    }

    /// Whether any loader holds keys waiting for dispatch
    pub fn has_pending(&self) -> bool {
        self.loaders.borrow().values().any(|l| l.has_pending())
    }

    /// Dispatch every loader with queued keys, each exactly once
    ///
    /// Returns the number of loaders dispatched.
    pub async fn dispatch_wave(&self) -> usize {
        let ready: Vec<Rc<BatchLoader>> = self
            .loaders
            .borrow()
            .values()
            .filter(|l| l.has_pending())
            .cloned()
            .collect();
        if ready.is_empty() {
            return 0;
        }

        self.waves.set(self.waves.get() + 1);
        tracing::trace!(wave = self.waves.get(), loaders = ready.len(), "Wave complete");
        join_all(ready.iter().map(|loader| loader.dispatch())).await;
        ready.len()
    }

    /// Cancel the execution
    ///
    /// Every unresolved handle resolves to `Cancelled`; resolved handles keep
    /// their values; no further batch is dispatched.
    pub fn cancel(&self) {
        if self.cancelled.replace(true) {
            return;
        }
        self.token.cancel();
        let loaders: Vec<Rc<BatchLoader>> = self.loaders.borrow().values().cloned().collect();
        for loader in loaders {
            loader.cancel();
        }
        tracing::warn!(request_id = %self.request_id, "Resolution context cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Token that cancels this context when triggered from outside
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn stats(&self) -> ContextStats {
        let loaders = self.loaders.borrow();
        let mut loads = LoaderStats::default();
        for loader in loaders.values() {
            loads += loader.stats();
        }
        ContextStats {
            waves: self.waves.get(),
            loaders: loaders.len(),
            loads,
        }
    }

    /// Drive a future to completion, flushing loaders between waves
    ///
    /// Fails with `Cancelled` only when the future cannot finish after the
    /// context was cancelled or timed out; otherwise cancelled loads surface
    /// inside the future's own output.
    pub async fn drive<F: Future>(&self, future: F) -> FieldResult<F::Output> {
        let mut future = pin!(future);
        let budget = self.config.request_timeout;
        let mut timeout = pin!(async move {
            match budget {
                Some(budget) => tokio::time::sleep(budget).await,
                None => std::future::pending::<()>().await,
            }
        });

        loop {
            if self.token.is_cancelled() {
                self.cancel();
            }
            if self.is_cancelled() {
                return self.drain(future.as_mut()).await;
            }

            let wave = poll_fn(|cx| match future.as_mut().poll(cx) {
                Poll::Ready(output) => Poll::Ready(Some(output)),
                Poll::Pending if self.has_pending() => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            });

            tokio::select! {
                biased;
                _ = self.token.cancelled() => self.cancel(),
                _ = &mut timeout => self.time_out(),
                step = wave => match step {
                    Some(output) => return Ok(output),
                    None => {
                        tokio::select! {
                            biased;
                            _ = self.token.cancelled() => self.cancel(),
                            _ = &mut timeout => self.time_out(),
                            _ = self.dispatch_wave() => {}
                        }
                    }
                },
            }
        }
    }

    /// Finish a cancelled execution without dispatching anything
    async fn drain<F: Future>(&self, mut future: Pin<&mut F>) -> FieldResult<F::Output> {
        match poll_fn(|cx| Poll::Ready(future.as_mut().poll(cx))).await {
            Poll::Ready(output) => Ok(output),
            Poll::Pending => {
                tracing::warn!(
                    request_id = %self.request_id,
                    "Execution abandoned after cancellation"
                );
                Err(FieldError::Cancelled)
            }
        }
    }

    fn time_out(&self) {
        tracing::warn!(
            request_id = %self.request_id,
            timeout_ms = self.config.request_timeout.map(|t| t.as_millis() as u64),
            "Execution timed out"
        );
        self.cancel();
    }
}
