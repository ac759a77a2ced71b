//! Engine entry point

use std::sync::Arc;
use std::time::Instant;

use repohero_shared_config::EngineConfig;
use serde_json::Value;
use tracing::Instrument;

use crate::context::ResolutionContext;
use crate::dispatch::{Executor, ResolverMap};
use crate::error::SchemaError;
use crate::plan::QueryPlan;
use crate::response::{GraphError, Path, QueryResult};
use crate::schema::Schema;
use crate::store::{BackingStore, MutationStore};

/// A schema, its resolvers and the stores they read from
///
/// Shared across requests. Every execution gets its own
/// [`ResolutionContext`], so nothing loaded by one request is visible to
/// another.
pub struct Engine {
    schema: Arc<Schema>,
    resolvers: Arc<ResolverMap>,
    store: Arc<dyn BackingStore>,
    mutations: Option<Arc<dyn MutationStore>>,
    config: EngineConfig,
}

pub struct EngineBuilder {
    schema: Schema,
    store: Arc<dyn BackingStore>,
    resolvers: ResolverMap,
    mutations: Option<Arc<dyn MutationStore>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn resolvers(mut self, resolvers: ResolverMap) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn mutation_store(mut self, mutations: Arc<dyn MutationStore>) -> Self {
        self.mutations = Some(mutations);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Check the resolvers against the schema and assemble the engine
    pub fn build(self) -> Result<Engine, SchemaError> {
        self.resolvers.validate(&self.schema)?;
        tracing::info!(
            types = self.schema.types().count(),
            resolvers = self.resolvers.len(),
            max_batch_size = ?self.config.max_batch_size,
            "Graph engine ready"
        );
        Ok(Engine {
            schema: Arc::new(self.schema),
            resolvers: Arc::new(self.resolvers),
            store: self.store,
            mutations: self.mutations,
            config: self.config,
        })
    }
}

impl Engine {
    pub fn builder(schema: Schema, store: Arc<dyn BackingStore>) -> EngineBuilder {
        EngineBuilder {
            schema,
            store,
            resolvers: ResolverMap::new(),
            mutations: None,
            config: EngineConfig::default(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh context for one execution
    pub fn context(&self) -> ResolutionContext {
        let ctx = ResolutionContext::new(Arc::clone(&self.store), self.config.clone());
        match &self.mutations {
            Some(mutations) => ctx.with_mutation_store(Arc::clone(mutations)),
            None => ctx,
        }
    }

    /// Execute a plan in a context of its own
    pub async fn execute(&self, plan: &QueryPlan) -> Result<QueryResult, SchemaError> {
        let ctx = self.context();
        self.execute_in(&ctx, plan).await
    }

    /// Execute a plan in a caller-provided context
    ///
    /// Lets the caller hold the context's cancellation token. Field errors
    /// are part of the result; only a schema error fails the call.
    pub async fn execute_in(
        &self,
        ctx: &ResolutionContext,
        plan: &QueryPlan,
    ) -> Result<QueryResult, SchemaError> {
        let span = tracing::info_span!(
            "graph_execution",
            request_id = %ctx.request_id(),
            operation = ?plan.operation,
            name = plan.name.as_deref().unwrap_or("anonymous"),
        );

        async move {
            let started = Instant::now();
            let executor = Executor::new(&self.schema, &self.resolvers, ctx);
            let outcome = ctx.drive(executor.execute_operation(plan)).await;

            let (data, errors) = match outcome {
                Ok(Ok(data)) => (data, executor.into_errors()),
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "Execution aborted by schema error");
                    return Err(err);
                }
                Err(err) => {
                    let mut errors = executor.into_errors();
                    errors.push(GraphError::new(&err, Path::root()));
                    (Value::Null, errors)
                }
            };

            let stats = ctx.stats();
            tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                waves = stats.waves,
                batches = stats.loads.batches,
                keys_fetched = stats.loads.keys_fetched,
                cache_hits = stats.loads.cache_hits,
                errors = errors.len(),
                "Execution complete"
            );
            Ok(QueryResult { data, errors })
        }
        .instrument(span)
        .await
    }
}
