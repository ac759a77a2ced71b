//! Integration tests for partial results
//!
//! Covers null propagation, failed batches, cancellation and timeouts.

mod common;

use std::time::Duration;

use common::*;
use graph_engine::{ErrorKind, EngineConfig, FieldType, FutureExt, Resolved, ResolverMap, Schema, SchemaError};
use serde_json::{json, Value};

#[tokio::test]
async fn test_non_null_violation_bubbles_to_nullable_parent() {
    let store = store();
    let engine = engine(&store);

    let plan = query(vec![
        sel("Query", "repo").alias("broken").arg("id", 3).select(repo_with_owner()),
        sel("Query", "repo").alias("ok").arg("id", 1).select([sel("Repo", "name")]),
    ]);
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(result.data, json!({ "broken": null, "ok": { "name": "tokio" } }));
    assert_eq!(result.errors.len(), 1);
    let error = result.error_at("broken.owner").unwrap();
    assert_eq!(error.kind, ErrorKind::NonNullViolation);
    assert_eq!(error.message, "cannot return null for non-null field Repo.owner");
}

#[tokio::test]
async fn test_non_null_root_failure_nulls_data() {
    let store = store();
    store.insert("repo_index", "all", json!([1, 3]));
    let engine = engine(&store);

    let plan = query(vec![sel("Query", "repos").select(repo_with_owner())]);
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(result.data, Value::Null);
    assert!(result.error_at("repos.1.owner").is_some());
}

#[tokio::test]
async fn test_failed_batch_fails_every_waiting_field() {
    let store = store();
    store.fail_collection("users");
    let engine = engine(&store);

    let plan = query(vec![
        sel("Query", "repos").select([
            sel("Repo", "name"),
            sel("Repo", "maintainer").select([sel("User", "name")]),
        ]),
        sel("Query", "repo")
            .alias("first")
            .arg("id", 1)
            .select([sel("Repo", "maintainer").select([sel("User", "name")])]),
    ]);
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(
        result.data,
        json!({
            "repos": [
                { "name": "tokio", "maintainer": null },
                { "name": "serde", "maintainer": null }
            ],
            "first": { "maintainer": null }
        })
    );
    assert_eq!(result.errors_of_kind(ErrorKind::BatchFetchFailed).count(), 2);
    assert!(result.error_at("first.maintainer").is_some());
    assert!(result.error_at("repos.0.maintainer").is_some());
    assert_eq!(store.fetch_count("users"), 1);
}

#[tokio::test]
async fn test_resolver_error_leaves_siblings_intact() {
    let store = store();
    let engine = engine(&store);

    let plan = query(vec![
        sel("Query", "repo").select([sel("Repo", "name")]),
        sel("Query", "repos").select([sel("Repo", "name")]),
    ]);
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(result.data["repo"], Value::Null);
    assert_eq!(result.data["repos"], json!([{ "name": "tokio" }, { "name": "serde" }]));
    assert_eq!(result.errors[0].kind, ErrorKind::InvalidArgument);
    assert_eq!(result.errors[0].message, "invalid argument id: is required");
}

#[tokio::test]
async fn test_timeout_reports_cancelled() {
    let store = store();
    let config = EngineConfig::unbounded().with_request_timeout(Duration::from_millis(50));
    let engine = engine_with(&store, None, config);

    let plan = query(vec![
        sel("Query", "slow"),
        sel("Query", "repo").arg("id", 1).select([sel("Repo", "name")]),
    ]);
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(result.data, Value::Null);
    let cancelled: Vec<_> = result.errors_of_kind(ErrorKind::Cancelled).collect();
    assert_eq!(cancelled.len(), 1);
    assert!(cancelled[0].path.is_root());
}

#[tokio::test]
async fn test_timeout_during_batch_keeps_partial_data() {
    let store = store();
    store.set_latency(Duration::from_millis(100));
    let config = EngineConfig::unbounded().with_request_timeout(Duration::from_millis(150));
    let engine = engine_with(&store, None, config);

    let plan = query(vec![sel("Query", "repo").arg("id", 1).select([
        sel("Repo", "name"),
        sel("Repo", "maintainer").select([sel("User", "name")]),
    ])]);
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(result.data, json!({ "repo": { "name": "tokio", "maintainer": null } }));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::Cancelled);
    assert_eq!(result.errors[0].path.to_string(), "repo.maintainer");
}

#[tokio::test]
async fn test_cancel_keeps_resolved_fields() {
    let store = store();
    store.set_latency(Duration::from_millis(100));
    let engine = engine(&store);
    let ctx = engine.context();

    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        token.cancel();
    });

    let plan = query(vec![sel("Query", "repo").arg("id", 1).select([
        sel("Repo", "name"),
        sel("Repo", "maintainer").select([sel("User", "name")]),
    ])]);
    let result = engine.execute_in(&ctx, &plan).await.unwrap();

    assert_eq!(result.data, json!({ "repo": { "name": "tokio", "maintainer": null } }));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::Cancelled);
    assert_eq!(result.errors[0].path.to_string(), "repo.maintainer");
    assert!(ctx.is_cancelled());
}

#[tokio::test]
async fn test_cancelled_before_start_dispatches_nothing() {
    let store = store();
    let engine = engine(&store);
    let ctx = engine.context();
    ctx.cancellation_token().cancel();

    let plan = query(vec![sel("Query", "repo").arg("id", 1).select([sel("Repo", "name")])]);
    let result = engine.execute_in(&ctx, &plan).await.unwrap();

    assert_eq!(result.data, json!({ "repo": null }));
    assert_eq!(result.errors[0].kind, ErrorKind::Cancelled);
    assert_eq!(store.total_fetches(), 0);
}

#[tokio::test]
async fn test_unknown_field_aborts_execution() {
    let store = store();
    let engine = engine(&store);

    let plan = query(vec![sel("Query", "stars")]);
    assert_eq!(
        engine.execute(&plan).await,
        Err(SchemaError::UnknownField {
            type_name: "Query".to_string(),
            field: "stars".to_string(),
        })
    );
}

#[tokio::test]
async fn test_unknown_field_stops_sibling_loads() {
    let store = store();
    let engine = engine(&store);

    let plan = query(vec![
        sel("Query", "stars"),
        sel("Query", "repos").select(repo_with_owner()),
    ]);
    let outcome = engine.execute(&plan).await;

    assert!(matches!(outcome, Err(SchemaError::UnknownField { field, .. }) if field == "stars"));
    assert_eq!(store.total_fetches(), 0);
}

#[tokio::test]
async fn test_nested_unknown_field_stops_later_waves() {
    let store = store();
    let engine = engine(&store);

    let plan = query(vec![sel("Query", "repo").arg("id", 1).select([
        sel("Repo", "maintainer").select([sel("User", "name")]),
        sel("Repo", "stars"),
    ])]);
    let outcome = engine.execute(&plan).await;

    assert!(matches!(outcome, Err(SchemaError::UnknownField { field, .. }) if field == "stars"));
    assert_eq!(store.fetch_count("repos"), 1);
    assert_eq!(store.fetch_count("users"), 0);
}

#[tokio::test]
async fn test_untagged_union_value_is_fatal() {
    let schema = Schema::builder()
        .object("Query", |t| t.field("event", FieldType::object("Event").nullable()))
        .object("Review", |t| t.field("rating", FieldType::int()))
        .object("Star", |t| t.field("id", FieldType::id()))
        .union("Event", [("review", "Review"), ("star", "Star")])
        .build()
        .unwrap();
    let resolvers = ResolverMap::new().with("Query", "event", |_| {
        async { Ok(Resolved::from(json!({ "rating": 5 }))) }.boxed_local()
    });
    let engine = graph_engine::Engine::builder(schema, std::sync::Arc::new(store()))
        .resolvers(resolvers)
        .build()
        .unwrap();

    let plan = query(vec![sel("Query", "event").select([sel("Review", "rating")])]);
    assert!(matches!(
        engine.execute(&plan).await,
        Err(SchemaError::AmbiguousOrUnmatchedType { abstract_type, .. }) if abstract_type == "Event"
    ));
}

#[test]
fn test_build_rejects_resolver_for_undeclared_field() {
    let resolvers = resolvers().with("Repo", "stars", |_| async { Ok(Resolved::Null) }.boxed_local());
    let built = graph_engine::Engine::builder(schema(), std::sync::Arc::new(store()))
        .resolvers(resolvers)
        .build();
    assert!(matches!(
        built,
        Err(SchemaError::UnknownField { type_name, field }) if type_name == "Repo" && field == "stars"
    ));
}
