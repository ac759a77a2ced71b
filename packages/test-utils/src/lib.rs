//! Shared test utilities for the Repohero workspace
//!
//! This crate provides in-memory implementations of the graph engine's
//! collaborator interfaces, so engine and API tests run without a real
//! database.
//!
//! # Mock Services
//!
//! - [`MockBackingStore`] - Keyed collections with fetch recording and failure injection
//! - [`MockMutationStore`] - Scripted mutation outcomes
//!
//! # Example
//!
//! ```rust,ignore
//! use repohero_test_utils::MockBackingStore;
//!
//! #[tokio::test]
//! async fn test_with_mocks() {
//!     let store = MockBackingStore::new().with("users", 1, json!({ "id": 1 }));
//!     // Build an engine over Arc::new(store.clone()) and assert on store.calls()
//! }
//! ```

mod mutations;
mod store;

pub use mutations::MockMutationStore;
pub use store::{FetchCall, MockBackingStore};
