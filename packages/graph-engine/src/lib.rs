//! Repohero graph engine
//!
//! Executes parsed query plans against a registered schema. Each field is
//! computed by a resolver registered per `(type, field)`; relationship
//! resolvers go through per-request [`BatchLoader`]s, so every key asked
//! for in the same resolution wave is fetched from the backing store in
//! one call. Mutations return [`Envelope`]s that the schema maps onto a
//! success type or `ValidationError`.
//!
//! # Example
//!
//! ```ignore
//! use graph_engine::{Engine, FieldType, QueryPlan, ResolverMap, Schema, Selection};
//!
//! let schema = Schema::builder()
//!     .object("Query", |t| t.field("testField", FieldType::string()))
//!     .build()?;
//! let resolvers = ResolverMap::new().with("Query", "testField", |_| {
//!     async { Ok("Hello World".into()) }.boxed_local()
//! });
//! let engine = Engine::builder(schema, store).resolvers(resolvers).build()?;
//! let result = engine.execute(&QueryPlan::query(vec![Selection::new("Query", "testField")])).await?;
//! ```

pub mod connection;
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod loader;
pub mod plan;
pub mod response;
pub mod schema;
pub mod store;
pub mod value;

mod engine;

pub use connection::Page;
pub use context::{ContextStats, ResolutionContext};
pub use dispatch::{Arguments, FieldContext, ResolverFuture, ResolverMap};
pub use engine::{Engine, EngineBuilder};
pub use envelope::{Envelope, ErrorSet};
pub use error::{ErrorKind, FieldError, FieldResult, SchemaError};
pub use loader::{BatchLoader, LoadHandle, LoadOutcome, LoaderStats};
pub use plan::{OperationKind, QueryPlan, Selection};
pub use response::{GraphError, Path, PathSegment, QueryResult};
pub use schema::{FieldDecl, FieldType, ScalarKind, Schema, SchemaBuilder, Shape, TypeDescriptor, TypeKind};
pub use store::{Action, ApplyError, BackingStore, MutationOp, MutationStore, StoreError};
pub use value::{CollectionId, Key, Resolved};

pub use futures_util::FutureExt;
pub use repohero_shared_config::EngineConfig;
