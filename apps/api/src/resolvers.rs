//! Field resolvers for the Repohero schema
//!
//! Relationship fields go through the request's batch loaders, so a page
//! of reviews costs one `users` fetch however many authors it shows.
//! Plain record properties fall back to the engine's default resolver.

use std::sync::Arc;

use graph_engine::connection::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_NESTED_LIMIT};
use graph_engine::{
    Envelope, ErrorSet, FieldContext, FieldResult, FutureExt, Key, MutationOp, Page, Resolved,
    ResolverMap,
};
use serde_json::{json, Map, Value};

use crate::auth::TokenIssuer;
use crate::models::LoginInput;
use crate::store::collections::*;
use crate::store::InMemoryStore;

/// Keys listed in an array property of the parent
fn keys_in(value: &Value) -> Vec<Key> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Key::from_value)
        .collect()
}

/// Load the record named by a foreign key of the parent
async fn belongs_to(f: FieldContext<'_>, collection: &str, foreign_key: &str) -> FieldResult<Resolved> {
    Ok(f.load(collection, f.parent_key(foreign_key)?).await?.into())
}

/// Load every record listed by an index entry
async fn index_of(f: FieldContext<'_>, collection: &str) -> FieldResult<Resolved> {
    let ids = f.load(INDEX, collection).await?.unwrap_or_default();
    Ok(f.load_many(collection, keys_in(&ids)).await?.into())
}

/// Turn a created or authenticated user into an `AuthenticatedUser`
fn authenticated(issuer: &TokenIssuer, user: Envelope<Value>) -> Resolved {
    let envelope = match user {
        Envelope::Success(user) => {
            let email = user["email"].as_str().unwrap_or_default().to_string();
            match issuer.issue(&email) {
                Ok(token) => Envelope::Success(json!({ "email": email, "token": token })),
                Err(e) => {
                    e.log();
                    Envelope::Failure(ErrorSet::base("could not sign in, please try again"))
                }
            }
        }
        Envelope::Failure(errors) => Envelope::Failure(errors),
    };
    envelope.into()
}

fn input(f: &FieldContext<'_>) -> FieldResult<Map<String, Value>> {
    f.args().required::<Map<String, Value>>("input")
}

/// Resolvers for every computed field of [`crate::schema::build_schema`]
pub fn resolvers(store: Arc<InMemoryStore>, issuer: Arc<TokenIssuer>) -> ResolverMap {
    let mut map = ResolverMap::new();

    // ========== Query ==========
    map.register("Query", "testField", |_| async { Ok("Hello World".into()) }.boxed_local())
        .register("Query", "repos", |f| index_of(f, REPOS).boxed_local())
        .register("Query", "categories", |f| index_of(f, CATEGORIES).boxed_local())
        .register("Query", "repo", |f| {
            async move {
                let id = f.args().key("id")?;
                Ok(f.load(REPOS, id).await?.into())
            }
            .boxed_local()
        })
        .register("Query", "events", |f| {
            async move {
                let repo_id = f.args().key("repoId")?;
                let reviews = f.load(REVIEWS_BY_REPO, repo_id.clone());
                let likes = f.load(LIKES_BY_REPO, repo_id);

                let tagged = |tag: &'static str, records: Option<Value>| {
                    records
                        .and_then(|r| r.as_array().cloned())
                        .unwrap_or_default()
                        .into_iter()
                        .map(move |record| Resolved::tagged(tag, record))
                };
                let mut events: Vec<Resolved> = tagged("review", reviews.await?).collect();
                events.extend(tagged("like", likes.await?));
                Ok(Resolved::List(events))
            }
            .boxed_local()
        });

    // ========== Objects ==========
    map.register("Repo", "nameReversed", |f| {
        async move {
            let name = f.parent_field("name").as_str().unwrap_or_default();
            Ok(name.chars().rev().collect::<String>().into())
        }
        .boxed_local()
    })
    .register("Repo", "categories", |f| {
        async move {
            let keys = keys_in(f.parent_field("category_ids"));
            Ok(f.load_many(CATEGORIES, keys).await?.into())
        }
        .boxed_local()
    })
    .register("Repo", "reviews", |f| {
        async move {
            let all = f
                .load(REVIEWS_BY_REPO, f.parent_key("id")?)
                .await?
                .unwrap_or_else(|| json!([]));
            let limit = clamp_limit(
                f.args().get::<i64>("limit")?.unwrap_or(DEFAULT_LIMIT),
                MAX_NESTED_LIMIT,
            );
            let offset = clamp_offset(f.args().get::<i64>("offset")?.unwrap_or(0));
            let nodes = all.as_array().cloned().unwrap_or_default();
            Ok(Page::from_slice(&nodes, offset, limit).into_value().into())
        }
        .boxed_local()
    })
    .register("Category", "repos", |f| {
        async move {
            let repos = f.load(REPOS_BY_CATEGORY, f.parent_key("id")?).await?;
            Ok(repos.unwrap_or_else(|| json!([])).into())
        }
        .boxed_local()
    })
    .register("Review", "user", |f| belongs_to(f, USERS, "user_id").boxed_local())
    .register("Review", "repo", |f| belongs_to(f, REPOS, "repo_id").boxed_local())
    .register("Like", "user", |f| belongs_to(f, USERS, "user_id").boxed_local())
    .register("Like", "repo", |f| belongs_to(f, REPOS, "repo_id").boxed_local());

    // ========== Mutation ==========
    let signup_issuer = Arc::clone(&issuer);
    map.register("Mutation", "testField", |_| async { Ok("Hello World".into()) }.boxed_local())
        .register("Mutation", "signup", move |f| {
            let issuer = Arc::clone(&signup_issuer);
            async move {
                let created = f.apply(MutationOp::create(USERS, input(&f)?)).await;
                Ok(authenticated(&issuer, created))
            }
            .boxed_local()
        })
        .register("Mutation", "login", move |f| {
            let store = Arc::clone(&store);
            let issuer = Arc::clone(&issuer);
            async move {
                let login = LoginInput {
                    email: f.args().get::<String>("email")?.unwrap_or_default(),
                    password: f.args().get::<String>("password")?.unwrap_or_default(),
                };
                let user = Envelope::from(store.authenticate(&login))
                    .map(|user| json!({ "id": user.id, "email": user.email }));
                Ok(authenticated(&issuer, user))
            }
            .boxed_local()
        })
        .register("Mutation", "addReview", |f| {
            async move {
                let envelope = f.apply(MutationOp::create(REVIEWS, input(&f)?)).await;
                Ok(envelope.into())
            }
            .boxed_local()
        })
        .register("Mutation", "updateReview", |f| {
            async move {
                let id = f.args().key("id")?;
                let envelope = f.apply(MutationOp::update(REVIEWS, id, input(&f)?)).await;
                Ok(envelope.into())
            }
            .boxed_local()
        })
        .register("Mutation", "deleteReview", |f| {
            async move {
                let id = f.args().key("id")?;
                Ok(f.apply(MutationOp::delete(REVIEWS, id)).await.into())
            }
            .boxed_local()
        });

    map
}
