//! Common fixtures for graph engine integration tests
//!
//! A small repository catalogue: repos with owners and optional
//! maintainers, reviews pointing at repos, an `Event` union over reviews
//! and stars, and a `Named` interface over repos and users.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use graph_engine::{
    Engine, EngineConfig, Envelope, FieldError, FieldType, FutureExt, MutationOp, Page, QueryPlan,
    Resolved, ResolverMap, Schema, Selection,
};
use repohero_test_utils::{MockBackingStore, MockMutationStore};
use serde_json::{json, Value};

pub fn schema() -> Schema {
    Schema::builder()
        .object("Query", |t| {
            t.field("repos", FieldType::list_of(FieldType::object("Repo")))
                .field("repo", FieldType::object("Repo").nullable())
                .field("reviews", FieldType::list_of(FieldType::object("Review")))
                .field("events", FieldType::list_of(FieldType::object("Event")))
                .field("slow", FieldType::string().nullable())
                .field("search", FieldType::list_of(FieldType::object("Named")))
        })
        .object("Mutation", |t| {
            t.field("addReview", FieldType::object("ReviewResult"))
        })
        .object("Repo", |t| {
            t.field("id", FieldType::id())
                .field("name", FieldType::string())
                .field("owner", FieldType::object("User"))
                .field("maintainer", FieldType::object("User").nullable())
                .field("reviews", FieldType::connection("Review"))
        })
        .object("User", |t| {
            t.field("id", FieldType::id())
                .field("name", FieldType::string())
        })
        .object("Review", |t| {
            t.field("id", FieldType::id())
                .field("rating", FieldType::int())
                .field("repo", FieldType::object("Repo"))
        })
        .object("Star", |t| {
            t.field("id", FieldType::id())
                .field("user", FieldType::object("User"))
        })
        .union("Event", [("review", "Review"), ("star", "Star")])
        .interface(
            "Named",
            |t| {
                t.field("id", FieldType::id())
                    .field("name", FieldType::string())
            },
            [("repo", "Repo"), ("user", "User")],
        )
        .result_union("ReviewResult", "Review")
        .build()
        .unwrap()
}

pub fn resolvers() -> ResolverMap {
    ResolverMap::new()
        .with("Query", "repos", |f| {
            async move {
                let ids = f.load("repo_index", "all").await?.unwrap_or_default();
                let keys = ids
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(graph_engine::Key::from_value);
                let repos = f.load_many("repos", keys).await?;
                Ok(repos.into())
            }
            .boxed_local()
        })
        .with("Query", "repo", |f| {
            async move {
                let id = f.args().key("id")?;
                Ok(f.load("repos", id).await?.into())
            }
            .boxed_local()
        })
        .with("Query", "reviews", |f| {
            async move {
                let reviews = f.load("review_index", "all").await?.unwrap_or_default();
                Ok(reviews.into())
            }
            .boxed_local()
        })
        .with("Query", "events", |f| {
            async move {
                let events = f.load("event_index", "all").await?.unwrap_or_default();
                let tagged: Vec<Resolved> = events
                    .as_array()
                    .into_iter()
                    .flatten()
                    .map(|event| {
                        let tag = if event.get("rating").is_some() { "review" } else { "star" };
                        Resolved::tagged(tag, event.clone())
                    })
                    .collect();
                Ok(Resolved::List(tagged))
            }
            .boxed_local()
        })
        .with("Query", "search", |f| {
            async move {
                let repo = f.load("repos", 1);
                let user = f.load("users", 2);
                Ok(Resolved::List(vec![
                    Resolved::tagged("repo", repo.await?.unwrap_or_default()),
                    Resolved::tagged("user", user.await?.unwrap_or_default()),
                ]))
            }
            .boxed_local()
        })
        .with("Query", "slow", |_| {
            async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok("done".into())
            }
            .boxed_local()
        })
        .with("Repo", "owner", |f| {
            async move { Ok(f.load("users", f.parent_key("owner_id")?).await?.into()) }.boxed_local()
        })
        .with("Repo", "maintainer", |f| {
            async move {
                match f.parent_field("maintainer_id") {
                    Value::Null => Ok(Resolved::Null),
                    _ => Ok(f.load("users", f.parent_key("maintainer_id")?).await?.into()),
                }
            }
            .boxed_local()
        })
        .with("Repo", "reviews", |f| {
            async move {
                let all = f
                    .load("reviews_by_repo", f.parent_key("id")?)
                    .await?
                    .unwrap_or_else(|| json!([]));
                let limit = f.args().get::<i64>("limit")?.unwrap_or(10);
                let offset = f.args().get::<i64>("offset")?.unwrap_or(0);
                let nodes = all.as_array().cloned().unwrap_or_default();
                Ok(Page::from_slice(&nodes, offset, limit).into_value().into())
            }
            .boxed_local()
        })
        .with("Review", "repo", |f| {
            async move { Ok(f.load("repos", f.parent_key("repo_id")?).await?.into()) }.boxed_local()
        })
        .with("Star", "user", |f| {
            async move { Ok(f.load("users", f.parent_key("user_id")?).await?.into()) }.boxed_local()
        })
        .with("Mutation", "addReview", |f| {
            async move {
                let input = f.args().required::<serde_json::Map<String, Value>>("input")?;
                let envelope: Envelope<Value> = f.apply(MutationOp::create("reviews", input)).await;
                Ok(envelope.into())
            }
            .boxed_local()
        })
}

/// Three repos, two owners, one maintainer; repo 3 points at a missing owner
pub fn store() -> MockBackingStore {
    let store = MockBackingStore::new()
        .with("repo_index", "all", json!([1, 2]))
        .with("users", 1, json!({ "id": 1, "name": "ada" }))
        .with("users", 2, json!({ "id": 2, "name": "grace" }))
        .with(
            "reviews_by_repo",
            1,
            json!([
                { "id": 10, "rating": 5, "repo_id": 1 },
                { "id": 11, "rating": 4, "repo_id": 1 },
                { "id": 12, "rating": 3, "repo_id": 1 }
            ]),
        )
        .with(
            "review_index",
            "all",
            json!([
                { "id": 10, "rating": 5, "repo_id": 1 },
                { "id": 13, "rating": 2, "repo_id": 2 },
                { "id": 14, "rating": 4, "repo_id": 2 }
            ]),
        )
        .with(
            "event_index",
            "all",
            json!([
                { "id": 10, "rating": 5, "repo_id": 1 },
                { "id": 20, "user_id": 2 }
            ]),
        );
    store.insert_records(
        "repos",
        vec![
            json!({ "id": 1, "name": "tokio", "owner_id": 1, "maintainer_id": 2 }),
            json!({ "id": 2, "name": "serde", "owner_id": 2 }),
            json!({ "id": 3, "name": "orphan", "owner_id": 99 }),
        ],
    );
    store
}

pub fn engine(store: &MockBackingStore) -> Engine {
    engine_with(store, None, EngineConfig::unbounded())
}

pub fn engine_with(
    store: &MockBackingStore,
    mutations: Option<&MockMutationStore>,
    config: EngineConfig,
) -> Engine {
    let builder = Engine::builder(schema(), Arc::new(store.clone()))
        .resolvers(resolvers())
        .config(config);
    let builder = match mutations {
        Some(mutations) => builder.mutation_store(Arc::new(mutations.clone())),
        None => builder,
    };
    builder.build().unwrap()
}

pub fn sel(type_name: &str, field: &str) -> Selection {
    Selection::new(type_name, field)
}

pub fn query(selections: Vec<Selection>) -> QueryPlan {
    QueryPlan::query(selections)
}

/// `Repo { name owner { name } }`
pub fn repo_with_owner() -> Vec<Selection> {
    vec![
        sel("Repo", "name"),
        sel("Repo", "owner").select([sel("User", "name")]),
    ]
}

pub fn is_cancelled(err: &FieldError) -> bool {
    matches!(err, FieldError::Cancelled)
}
