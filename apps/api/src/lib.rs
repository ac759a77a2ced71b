//! Repohero API library
//!
//! The Repohero schema, its resolvers and an in-memory catalog, wired into
//! a graph engine. Exposed as a library for the binary and for
//! integration tests.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod resolvers;
pub mod schema;
pub mod store;

use std::sync::Arc;

use graph_engine::{Engine, EngineConfig};

// Re-export commonly used types
pub use auth::{Claims, TokenIssuer};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use store::{InMemoryStore, Seed};

/// Assemble an engine serving the Repohero schema from `store`
///
/// The store answers both batched reads and mutations.
pub fn build_engine(
    store: Arc<InMemoryStore>,
    issuer: Arc<TokenIssuer>,
    config: EngineConfig,
) -> ApiResult<Engine> {
    let schema = schema::build_schema()?;
    let resolvers = resolvers::resolvers(Arc::clone(&store), issuer);
    let engine = Engine::builder(schema, store.clone())
        .mutation_store(store)
        .resolvers(resolvers)
        .config(config)
        .build()?;
    Ok(engine)
}
