//! Mock mutation store
//!
//! [`MockMutationStore`] answers `apply` from a queue of scripted outcomes.
//! With an empty queue it echoes the attributes back with a fresh `id`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use graph_engine::{Action, ApplyError, ErrorSet, MutationOp, MutationStore, StoreError};
use serde_json::Value;

#[derive(Default)]
struct MutationState {
    scripted: VecDeque<Result<Value, ApplyError>>,
    applied: Vec<MutationOp>,
    next_id: i64,
}

/// Scripted [`MutationStore`] that records every operation
#[derive(Clone, Default)]
pub struct MockMutationStore {
    state: Arc<Mutex<MutationState>>,
}

impl MockMutationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next `apply`
    pub fn respond_with(&self, outcome: Result<Value, ApplyError>) -> &Self {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.scripted.push_back(outcome);
        self
    }

    pub fn succeed(&self, entity: Value) -> &Self {
        self.respond_with(Ok(entity))
    }

    pub fn reject(&self, errors: ErrorSet) -> &Self {
        self.respond_with(Err(ApplyError::Invalid(errors)))
    }

    pub fn fail(&self, error: StoreError) -> &Self {
        self.respond_with(Err(ApplyError::Store(error)))
    }

    /// Operations applied so far, in order
    pub fn applied(&self) -> Vec<MutationOp> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.applied.clone()
    }
}

#[async_trait(?Send)]
impl MutationStore for MockMutationStore {
    async fn apply(&self, op: MutationOp) -> Result<Value, ApplyError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.applied.push(op.clone());
        if let Some(outcome) = state.scripted.pop_front() {
            return outcome;
        }

        let mut entity = op.attributes;
        let id = match op.action {
            Action::Create => {
                state.next_id += 1;
                Value::from(state.next_id)
            }
            Action::Update(key) | Action::Delete(key) => key.to_value(),
        };
        entity.insert("id".to_string(), id);
        Ok(Value::Object(entity))
    }
}
