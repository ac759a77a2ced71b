//! In-memory catalog backing the Repohero graph
//!
//! [`InMemoryStore`] answers batched fetches for every collection the
//! resolvers load from and applies the mutations they issue. Passwords
//! are hashed with Argon2id; sign-in compares against a dummy hash when
//! the email is unknown so both paths do the same work.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use graph_engine::{
    Action, ApplyError, BackingStore, ErrorSet, Key, MutationOp, MutationStore, StoreError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ApiError, ApiResult};
use crate::models::{
    record_id, Category, Like, LoginInput, Repo, Review, ReviewInput, ReviewPatch, SignupInput,
    User,
};

/// Collection names understood by [`InMemoryStore`]
pub mod collections {
    pub const USERS: &str = "users";
    pub const REPOS: &str = "repos";
    pub const CATEGORIES: &str = "categories";
    pub const REVIEWS: &str = "reviews";
    pub const LIKES: &str = "likes";
    /// Reviews of the repo named by the key, as one array
    pub const REVIEWS_BY_REPO: &str = "reviews_by_repo";
    /// Likes of the repo named by the key, as one array
    pub const LIKES_BY_REPO: &str = "likes_by_repo";
    /// Repos tagged with the category named by the key, as one array
    pub const REPOS_BY_CATEGORY: &str = "repos_by_category";
    /// Ids of every record of the collection named by the key
    pub const INDEX: &str = "index";
}

use collections::*;

#[derive(Debug, Default)]
struct Catalog {
    users: BTreeMap<i64, User>,
    repos: BTreeMap<i64, Repo>,
    categories: BTreeMap<i64, Category>,
    reviews: BTreeMap<i64, Review>,
    likes: BTreeMap<i64, Like>,
}

fn next_id<T>(records: &BTreeMap<i64, T>) -> i64 {
    records.last_key_value().map_or(1, |(id, _)| id + 1)
}

fn record<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn records<'a, T: Serialize + 'a>(
    values: impl Iterator<Item = &'a T>,
) -> Result<Value, StoreError> {
    values
        .map(record)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn ids<'a>(keys: impl Iterator<Item = &'a i64>) -> Value {
    Value::Array(keys.map(|id| Value::from(*id)).collect())
}

impl Catalog {
    fn lookup(&self, collection: &str, key: &Key) -> Result<Option<Value>, StoreError> {
        let id = record_id(key);
        match collection {
            USERS => id.and_then(|id| self.users.get(&id)).map(record).transpose(),
            REPOS => id.and_then(|id| self.repos.get(&id)).map(record).transpose(),
            CATEGORIES => id.and_then(|id| self.categories.get(&id)).map(record).transpose(),
            REVIEWS => id.and_then(|id| self.reviews.get(&id)).map(record).transpose(),
            LIKES => id.and_then(|id| self.likes.get(&id)).map(record).transpose(),
            REVIEWS_BY_REPO => id
                .map(|id| records(self.reviews.values().filter(|r| r.repo_id == id)))
                .transpose(),
            LIKES_BY_REPO => id
                .map(|id| records(self.likes.values().filter(|l| l.repo_id == id)))
                .transpose(),
            REPOS_BY_CATEGORY => id
                .map(|id| records(self.repos.values().filter(|r| r.in_category(id))))
                .transpose(),
            INDEX => Ok(match key {
                Key::Str(name) if name == REPOS => Some(ids(self.repos.keys())),
                Key::Str(name) if name == CATEGORIES => Some(ids(self.categories.keys())),
                Key::Str(name) if name == REVIEWS => Some(ids(self.reviews.keys())),
                _ => None,
            }),
            other => Err(StoreError::Backend(format!("unknown collection: {}", other))),
        }
    }

    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email == email)
    }

    /// `belongs_to` checks for a review's repo and author
    fn check_references(&self, input: &ReviewInput, errors: &mut ErrorSet) {
        if !input.repo_id().is_some_and(|id| self.repos.contains_key(&id)) {
            errors.add("repo", "must exist");
        }
        if !input.user_id().is_some_and(|id| self.users.contains_key(&id)) {
            errors.add("user", "must exist");
        }
    }
}

/// Seed user; the password is hashed when the store is built
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Initial catalog contents
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub users: Vec<SeedUser>,
    pub categories: Vec<Category>,
    pub repos: Vec<Repo>,
    pub reviews: Vec<Review>,
    pub likes: Vec<Like>,
}

impl Seed {
    /// Parse a seed from its JSON form
    pub fn from_json(json: &str) -> ApiResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Small catalog used by the binary when no seed file is given
    pub fn demo() -> Self {
        let user = |id: i64, name: &str, email: &str, password: &str| SeedUser {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let repo = |id: i64, name: &str, url: &str, category_ids: Vec<i64>| Repo {
            id,
            name: name.to_string(),
            url: url.to_string(),
            category_ids,
        };
        let review = |id: i64, rating: i64, comment: &str, user_id: i64, repo_id: i64| Review {
            id,
            rating,
            comment: comment.to_string(),
            user_id,
            repo_id,
        };

        Self {
            users: vec![
                user(1, "Ada", "ada@example.com", "Password123"),
                user(2, "Grace", "grace@example.com", "Password456"),
            ],
            categories: vec![
                Category { id: 1, name: "async".to_string() },
                Category { id: 2, name: "serialization".to_string() },
            ],
            repos: vec![
                repo(1, "tokio", "https://github.com/tokio-rs/tokio", vec![1]),
                repo(2, "serde", "https://github.com/serde-rs/serde", vec![2]),
                repo(3, "axum", "https://github.com/tokio-rs/axum", vec![1]),
            ],
            reviews: vec![
                review(1, 5, "Fearless async", 1, 1),
                review(2, 4, "Solid runtime", 2, 1),
                review(3, 5, "Indispensable", 1, 2),
            ],
            likes: vec![
                Like { id: 1, user_id: 2, repo_id: 1 },
                Like { id: 2, user_id: 1, repo_id: 2 },
            ],
        }
    }
}

/// Catalog shared by all requests
pub struct InMemoryStore {
    catalog: RwLock<Catalog>,
    argon2: Argon2<'static>,
    dummy_password_hash: String,
}

impl InMemoryStore {
    /// Empty catalog
    pub fn new() -> ApiResult<Self> {
        Self::from_seed(Seed::default())
    }

    /// Build a catalog, rejecting records that point at missing parents
    pub fn from_seed(seed: Seed) -> ApiResult<Self> {
        let argon2 = Argon2::default();
        let dummy_password_hash = hash_password(&argon2, "dummy_password_for_timing_parity")?;
        let mut catalog = Catalog::default();

        for category in seed.categories {
            catalog.categories.insert(category.id, category);
        }
        for repo in seed.repos {
            if let Some(missing) = repo
                .category_ids
                .iter()
                .find(|id| !catalog.categories.contains_key(id))
            {
                return Err(ApiError::InvalidSeed(format!(
                    "repo {} references unknown category {}",
                    repo.id, missing
                )));
            }
            catalog.repos.insert(repo.id, repo);
        }
        for user in seed.users {
            let password_digest = hash_password(&argon2, &user.password)?;
            catalog.users.insert(
                user.id,
                User {
                    id: user.id,
                    name: user.name,
                    email: user.email.trim().to_lowercase(),
                    password_digest,
                },
            );
        }
        for review in seed.reviews {
            check_seed_reference(&catalog, "review", review.id, review.user_id, review.repo_id)?;
            catalog.reviews.insert(review.id, review);
        }
        for like in seed.likes {
            check_seed_reference(&catalog, "like", like.id, like.user_id, like.repo_id)?;
            catalog.likes.insert(like.id, like);
        }

        tracing::info!(
            users = catalog.users.len(),
            repos = catalog.repos.len(),
            reviews = catalog.reviews.len(),
            "Catalog loaded"
        );

        Ok(Self {
            catalog: RwLock::new(catalog),
            argon2,
            dummy_password_hash,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Check credentials for the `login` mutation
    pub fn authenticate(&self, input: &LoginInput) -> Result<User, ErrorSet> {
        let email = input.email.trim().to_lowercase();
        let user = self.read().users.values().find(|u| u.email == email).cloned();

        let digest = user
            .as_ref()
            .map_or(self.dummy_password_hash.as_str(), |u| u.password_digest.as_str());
        let password_valid = self.verify_password(&input.password, digest);

        match user {
            Some(user) if password_valid => Ok(user),
            _ => {
                tracing::debug!(email = %email, "Sign-in rejected");
                Err(ErrorSet::base("Invalid email or password"))
            }
        }
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                false
            }
        }
    }

    fn create_user(&self, input: SignupInput) -> Result<Value, ApplyError> {
        let mut errors = input.validate();
        let email = input.normalized_email();
        if !email.is_empty() && self.read().email_taken(&email) {
            errors.add("email", "has already been taken");
        }
        if !errors.is_empty() {
            return Err(ApplyError::Invalid(errors));
        }

        let password_digest = hash_password(&self.argon2, input.password.as_deref().unwrap_or_default())
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut catalog = self.write();
        if catalog.email_taken(&email) {
            return Err(ApplyError::Invalid(ErrorSet::new().with("email", "has already been taken")));
        }
        let user = User {
            id: next_id(&catalog.users),
            name: input.name.unwrap_or_default().trim().to_string(),
            email,
            password_digest,
        };
        tracing::info!(user_id = user.id, "User signed up");
        let value = record(&user)?;
        catalog.users.insert(user.id, user);
        Ok(value)
    }

    fn create_review(&self, input: ReviewInput) -> Result<Value, ApplyError> {
        let mut errors = input.validate();
        let mut catalog = self.write();
        catalog.check_references(&input, &mut errors);

        let (Some(rating), Some(comment), Some(user_id), Some(repo_id)) =
            (input.rating, input.comment.clone(), input.user_id(), input.repo_id())
        else {
            return Err(ApplyError::Invalid(errors));
        };
        if !errors.is_empty() {
            return Err(ApplyError::Invalid(errors));
        }

        let review = Review {
            id: next_id(&catalog.reviews),
            rating,
            comment: comment.trim().to_string(),
            user_id,
            repo_id,
        };
        let value = record(&review)?;
        catalog.reviews.insert(review.id, review);
        Ok(value)
    }

    fn update_review(&self, key: &Key, patch: ReviewPatch) -> Result<Value, ApplyError> {
        let mut catalog = self.write();
        let found = match record_id(key) {
            Some(id) => catalog.reviews.get_mut(&id),
            None => None,
        };
        let Some(review) = found else {
            return Err(ApplyError::Invalid(ErrorSet::base("Review not found")));
        };

        let edited = review.patched(&patch);
        let errors = edited.validate();
        if !errors.is_empty() {
            return Err(ApplyError::Invalid(errors));
        }
        if let Some(rating) = edited.rating {
            review.rating = rating;
        }
        if let Some(comment) = edited.comment {
            review.comment = comment.trim().to_string();
        }
        Ok(record(review)?)
    }

    fn delete_review(&self, key: &Key) -> Result<Value, ApplyError> {
        let mut catalog = self.write();
        match record_id(key).and_then(|id| catalog.reviews.remove(&id)) {
            Some(review) => Ok(json!({ "id": review.id })),
            None => Err(ApplyError::Invalid(ErrorSet::base("Review not found"))),
        }
    }
}

fn hash_password(argon2: &Argon2<'_>, password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

fn check_seed_reference(
    catalog: &Catalog,
    kind: &str,
    id: i64,
    user_id: i64,
    repo_id: i64,
) -> ApiResult<()> {
    if !catalog.users.contains_key(&user_id) {
        return Err(ApiError::InvalidSeed(format!(
            "{} {} references unknown user {}",
            kind, id, user_id
        )));
    }
    if !catalog.repos.contains_key(&repo_id) {
        return Err(ApiError::InvalidSeed(format!(
            "{} {} references unknown repo {}",
            kind, id, repo_id
        )));
    }
    Ok(())
}

fn parse_attributes<T: DeserializeOwned>(attributes: Map<String, Value>) -> Result<T, ApplyError> {
    serde_json::from_value(Value::Object(attributes))
        .map_err(|e| ApplyError::Invalid(ErrorSet::base(format!("input is malformed: {}", e))))
}

#[async_trait(?Send)]
impl BackingStore for InMemoryStore {
    async fn fetch_many(
        &self,
        collection: &str,
        keys: &[Key],
    ) -> Result<HashMap<Key, Value>, StoreError> {
        tracing::debug!(collection, keys = keys.len(), "Serving batch from catalog");
        let catalog = self.read();
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = catalog.lookup(collection, key)? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }
}

#[async_trait(?Send)]
impl MutationStore for InMemoryStore {
    async fn apply(&self, op: MutationOp) -> Result<Value, ApplyError> {
        let MutationOp {
            collection,
            action,
            attributes,
        } = op;
        tracing::debug!(collection = %collection, action = ?action, "Applying mutation");

        match (collection.as_str(), action) {
            (USERS, Action::Create) => self.create_user(parse_attributes(attributes)?),
            (REVIEWS, Action::Create) => self.create_review(parse_attributes(attributes)?),
            (REVIEWS, Action::Update(key)) => {
                self.update_review(&key, parse_attributes(attributes)?)
            }
            (REVIEWS, Action::Delete(key)) => self.delete_review(&key),
            (collection, action) => Err(StoreError::Backend(format!(
                "unsupported mutation {:?} on {}",
                action, collection
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tracing_test::traced_test;

    fn store() -> InMemoryStore {
        InMemoryStore::from_seed(Seed::demo()).unwrap()
    }

    fn attributes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_fetch_many_skips_missing_keys() {
        let store = store();
        let found = store
            .fetch_many(USERS, &[Key::Int(1), Key::Int(42), Key::from("2")])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[&Key::Int(1)]["name"], "Ada");
        assert!(found[&Key::Int(2)].get("password_digest").is_none());
    }

    #[tokio::test]
    async fn test_grouped_collections() {
        let store = store();
        let found = store
            .fetch_many(REVIEWS_BY_REPO, &[Key::Int(1), Key::Int(3)])
            .await
            .unwrap();
        assert_eq!(found[&Key::Int(1)].as_array().unwrap().len(), 2);
        assert_eq!(found[&Key::Int(3)], json!([]));

        let by_category = store.fetch_many(REPOS_BY_CATEGORY, &[Key::Int(1)]).await.unwrap();
        let names: Vec<_> = by_category[&Key::Int(1)]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("tokio"), json!("axum")]);

        let index = store.fetch_many(INDEX, &[Key::from(REPOS)]).await.unwrap();
        assert_eq!(index[&Key::from(REPOS)], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_unknown_collection_fails() {
        let store = store();
        let err = store.fetch_many("stars", &[Key::Int(1)]).await.unwrap_err();
        assert_matches!(err, StoreError::Backend(message) if message.contains("stars"));
    }

    #[tokio::test]
    async fn test_signup_rejects_taken_email() {
        let store = store();
        let op = MutationOp::create(
            USERS,
            attributes(json!({
                "name": "Ada again",
                "email": "ADA@example.com",
                "password": "Password123",
                "password_confirmation": "Password123"
            })),
        );
        let err = store.apply(op).await.unwrap_err();
        assert_matches!(err, ApplyError::Invalid(errors) => {
            assert_eq!(errors.full_messages(), vec!["Email has already been taken"]);
        });
    }

    #[tokio::test]
    async fn test_signup_then_authenticate() {
        let store = store();
        let op = MutationOp::create(
            USERS,
            attributes(json!({
                "name": "Linus",
                "email": "linus@example.com",
                "password": "Password789",
                "password_confirmation": "Password789"
            })),
        );
        let created = store.apply(op).await.unwrap();
        assert_eq!(created["id"], 3);

        let login = LoginInput {
            email: "linus@example.com".to_string(),
            password: "Password789".to_string(),
        };
        assert_eq!(store.authenticate(&login).unwrap().name, "Linus");
    }

    #[test]
    fn test_authenticate_rejects_bad_credentials() {
        let store = store();
        for (email, password) in [("ada@example.com", "wrong-password"), ("nobody@example.com", "Password123")] {
            let login = LoginInput {
                email: email.to_string(),
                password: password.to_string(),
            };
            let errors = store.authenticate(&login).unwrap_err();
            assert_eq!(errors.full_messages(), vec!["Invalid email or password"]);
        }
    }

    #[tokio::test]
    async fn test_review_requires_existing_repo_and_user() {
        let store = store();
        let op = MutationOp::create(
            REVIEWS,
            attributes(json!({ "rating": 4, "comment": "nice", "repo_id": 99 })),
        );
        let err = store.apply(op).await.unwrap_err();
        assert_matches!(err, ApplyError::Invalid(errors) => {
            assert_eq!(errors.full_messages(), vec!["Repo must exist", "User must exist"]);
        });
    }

    #[tokio::test]
    async fn test_review_lifecycle() {
        let store = store();
        let created = store
            .apply(MutationOp::create(
                REVIEWS,
                attributes(json!({ "rating": 3, "comment": "ok", "repo_id": "3", "user_id": 2 })),
            ))
            .await
            .unwrap();
        assert_eq!(created["id"], 4);
        assert_eq!(created["repo_id"], 3);

        let updated = store
            .apply(MutationOp::update(REVIEWS, 4, attributes(json!({ "rating": 5 }))))
            .await
            .unwrap();
        assert_eq!(updated["rating"], 5);
        assert_eq!(updated["comment"], "ok");

        let deleted = store.apply(MutationOp::delete(REVIEWS, 4)).await.unwrap();
        assert_eq!(deleted, json!({ "id": 4 }));

        let err = store.apply(MutationOp::delete(REVIEWS, 4)).await.unwrap_err();
        assert_matches!(err, ApplyError::Invalid(errors) => {
            assert_eq!(errors.full_messages(), vec!["Review not found"]);
        });
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_review_unchanged() {
        let store = store();
        let err = store
            .apply(MutationOp::update(REVIEWS, 1, attributes(json!({ "rating": 9 }))))
            .await
            .unwrap_err();
        assert_matches!(err, ApplyError::Invalid(_));

        let found = store.fetch_many(REVIEWS, &[Key::Int(1)]).await.unwrap();
        assert_eq!(found[&Key::Int(1)]["rating"], 5);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unsupported_mutation_is_a_store_error() {
        let store = store();
        let err = store.apply(MutationOp::delete(USERS, 1)).await.unwrap_err();
        assert_matches!(err, ApplyError::Store(StoreError::Backend(_)));
        assert!(logs_contain("Applying mutation"));
    }

    #[test]
    fn test_seed_rejects_dangling_references() {
        let mut seed = Seed::demo();
        seed.likes.push(Like { id: 9, user_id: 1, repo_id: 42 });
        let err = InMemoryStore::from_seed(seed).err().unwrap();
        assert_matches!(err, ApiError::InvalidSeed(message) if message.contains("unknown repo 42"));
    }

    #[test]
    fn test_seed_from_json() {
        let seed = Seed::from_json(r#"{ "categories": [{ "id": 1, "name": "cli" }] }"#).unwrap();
        assert_eq!(seed.categories.len(), 1);
        assert!(seed.repos.is_empty());
        assert!(InMemoryStore::from_seed(seed).is_ok());
    }
}
