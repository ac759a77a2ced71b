//! Backing store collaborator interfaces
//!
//! The engine reads through [`BackingStore::fetch_many`] and writes through
//! [`MutationStore::apply`]. Both are implemented outside the engine.
//! Futures are not required to be `Send`: an execution runs on one thread.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::envelope::ErrorSet;
use crate::value::Key;

/// Failures reported by a backing store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed the operation
    #[error("backing store error: {0}")]
    Backend(String),
}

/// Batched read access to keyed collections
///
/// Implementations must be idempotent and free of side effects. Keys absent
/// from the returned map are treated as not found. A collection may map a
/// parent key to an array, e.g. `reviews_by_repo`.
#[async_trait(?Send)]
pub trait BackingStore: Send + Sync {
    async fn fetch_many(
        &self,
        collection: &str,
        keys: &[Key],
    ) -> Result<HashMap<Key, Value>, StoreError>;
}

/// What a mutation does to its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "key")]
pub enum Action {
    Create,
    Update(Key),
    Delete(Key),
}

/// A write against one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationOp {
    pub collection: String,
    pub action: Action,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl MutationOp {
    pub fn create(collection: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            collection: collection.into(),
            action: Action::Create,
            attributes,
        }
    }

    pub fn update(
        collection: impl Into<String>,
        key: impl Into<Key>,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            collection: collection.into(),
            action: Action::Update(key.into()),
            attributes,
        }
    }

    pub fn delete(collection: impl Into<String>, key: impl Into<Key>) -> Self {
        Self {
            collection: collection.into(),
            action: Action::Delete(key.into()),
            attributes: Map::new(),
        }
    }
}

/// Why a mutation did not produce an entity
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    /// The input failed validation; carried to the client as data
    #[error("validation failed with {} error(s)", .0.len())]
    Invalid(ErrorSet),

    /// The store failed; logged and replaced by a generic message
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Write access used by mutation resolvers
#[async_trait(?Send)]
pub trait MutationStore: Send + Sync {
    async fn apply(&self, op: MutationOp) -> Result<Value, ApplyError>;
}
