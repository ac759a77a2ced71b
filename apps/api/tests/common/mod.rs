//! Shared fixtures for Repohero API integration tests

#![allow(dead_code)]

use std::sync::Arc;

use graph_engine::{Engine, EngineConfig, QueryPlan, QueryResult, Selection};
use repohero_api::{build_engine, InMemoryStore, Seed, TokenIssuer};
use serde_json::Value;

pub const SECRET: &str = "integration-test-secret-of-32-chars!";

pub struct TestApp {
    pub engine: Engine,
    pub store: Arc<InMemoryStore>,
    pub issuer: Arc<TokenIssuer>,
}

impl TestApp {
    /// App over the demo catalog
    pub fn new() -> Self {
        Self::with_seed(Seed::demo())
    }

    pub fn with_seed(seed: Seed) -> Self {
        let store = Arc::new(InMemoryStore::from_seed(seed).unwrap());
        let issuer = Arc::new(TokenIssuer::new(SECRET, 24));
        let engine = build_engine(
            Arc::clone(&store),
            Arc::clone(&issuer),
            EngineConfig::unbounded(),
        )
        .unwrap();
        Self {
            engine,
            store,
            issuer,
        }
    }

    /// Execute a plan, failing the test on schema errors
    pub async fn run(&self, plan: &QueryPlan) -> QueryResult {
        self.engine.execute(plan).await.unwrap()
    }

    /// Execute a plan and require it to succeed without field errors
    pub async fn data(&self, plan: &QueryPlan) -> Value {
        let result = self.run(plan).await;
        assert!(result.is_ok(), "unexpected errors: {:?}", result.errors);
        result.data
    }
}

pub fn sel(type_name: &str, field: &str) -> Selection {
    Selection::new(type_name, field)
}

pub fn query(selections: Vec<Selection>) -> QueryPlan {
    QueryPlan::query(selections)
}

pub fn mutation(selections: Vec<Selection>) -> QueryPlan {
    QueryPlan::mutation(selections)
}

/// `... on ValidationError { errors { fullMessages attributeErrors { attribute errors } } }`
pub fn validation_errors() -> Selection {
    sel("ValidationError", "errors").select([
        sel("ValidationErrorDetails", "fullMessages"),
        sel("ValidationErrorDetails", "attributeErrors").select([
            sel("AttributeError", "attribute"),
            sel("AttributeError", "errors"),
        ]),
    ])
}
