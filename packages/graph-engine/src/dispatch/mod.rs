//! Field resolver registration and dispatch
//!
//! Resolvers are registered per `(type, field)`. A field without a resolver
//! reads the property of the same name from its parent value. Resolvers
//! receive a [`FieldContext`] and return a boxed local future:
//!
//! ```ignore
//! resolvers.register("Review", "user", |f| {
//!     async move {
//!         let user = f.load("users", f.parent_key("user_id")?).await?;
//!         Ok(user.into())
//!     }
//!     .boxed_local()
//! });
//! ```

mod executor;
mod join;

pub(crate) use executor::Executor;

use std::collections::BTreeMap;
use std::future::Future;

use futures_util::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::ResolutionContext;
use crate::envelope::Envelope;
use crate::error::{FieldError, FieldResult, SchemaError};
use crate::loader::LoadHandle;
use crate::response::Path;
use crate::schema::Schema;
use crate::store::MutationOp;
use crate::value::{Key, Resolved};

/// Future produced by a resolver
pub type ResolverFuture<'a> = LocalBoxFuture<'a, FieldResult<Resolved>>;

static NULL: Value = Value::Null;

type Resolver = Box<dyn for<'a> Fn(FieldContext<'a>) -> ResolverFuture<'a> + Send + Sync>;

/// Arguments passed to a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Raw argument value
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// Deserialize an optional argument
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> FieldResult<Option<T>> {
        self.raw(name)
            .map(|value| {
                T::deserialize(value).map_err(|e| FieldError::invalid_argument(name, e.to_string()))
            })
            .transpose()
    }

    /// Deserialize a required argument
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> FieldResult<T> {
        self.get(name)?
            .ok_or_else(|| FieldError::invalid_argument(name, "is required"))
    }

    /// Read a required argument as a collection key
    pub fn key(&self, name: &str) -> FieldResult<Key> {
        let value = self
            .raw(name)
            .ok_or_else(|| FieldError::invalid_argument(name, "is required"))?;
        Key::from_value(value)
            .ok_or_else(|| FieldError::invalid_argument(name, "must be an integer or a string"))
    }
}

/// Everything a resolver can see about the field it resolves
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
    parent: &'a Value,
    args: &'a Arguments,
    field: &'a str,
    parent_type: &'a str,
    ctx: &'a ResolutionContext,
    path: &'a Path,
}

impl<'a> FieldContext<'a> {
    /// Value of the enclosing object
    pub fn parent(&self) -> &'a Value {
        self.parent
    }

    pub fn args(&self) -> &'a Arguments {
        self.args
    }

    pub fn field_name(&self) -> &'a str {
        self.field
    }

    pub fn parent_type(&self) -> &'a str {
        self.parent_type
    }

    pub fn context(&self) -> &'a ResolutionContext {
        self.ctx
    }

    pub fn path(&self) -> &'a Path {
        self.path
    }

    /// Property of the parent value, `Null` when absent
    pub fn parent_field(&self, name: &str) -> &'a Value {
        self.parent.get(name).unwrap_or(&NULL)
    }

    /// Property of the parent value read as a key
    pub fn parent_key(&self, name: &str) -> FieldResult<Key> {
        Key::from_value(self.parent_field(name)).ok_or_else(|| FieldError::InvalidValue {
            expected: format!("key in {}.{}", self.parent_type, name),
            found: self.parent_field(name).to_string(),
        })
    }

    /// Load one key through the context's batch loader
    pub fn load(&self, collection: &str, key: impl Into<Key>) -> LoadHandle {
        self.ctx.load(collection, key)
    }

    /// Load several keys; output follows the input order
    pub fn load_many(
        &self,
        collection: &str,
        keys: impl IntoIterator<Item = Key>,
    ) -> impl Future<Output = FieldResult<Vec<Option<Value>>>> {
        self.ctx.loader_for(collection).load_many(keys)
    }

    /// Run a mutation and fold its outcome into an envelope
    pub async fn apply(&self, op: MutationOp) -> Envelope<Value> {
        self.ctx.apply(op).await
    }
}

/// Resolvers keyed by type then field
#[derive(Default)]
pub struct ResolverMap {
    resolvers: BTreeMap<String, BTreeMap<String, Resolver>>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver, replacing any previous one for the same field
    pub fn register<F>(&mut self, type_name: &str, field: &str, resolver: F) -> &mut Self
    where
        F: for<'a> Fn(FieldContext<'a>) -> ResolverFuture<'a> + Send + Sync + 'static,
    {
        self.resolvers
            .entry(type_name.to_string())
            .or_default()
            .insert(field.to_string(), Box::new(resolver));
        self
    }

    /// Builder form of [`ResolverMap::register`]
    pub fn with<F>(mut self, type_name: &str, field: &str, resolver: F) -> Self
    where
        F: for<'a> Fn(FieldContext<'a>) -> ResolverFuture<'a> + Send + Sync + 'static,
    {
        self.register(type_name, field, resolver);
        self
    }

    pub(crate) fn get(&self, type_name: &str, field: &str) -> Option<&Resolver> {
        self.resolvers.get(type_name)?.get(field)
    }

    pub fn contains(&self, type_name: &str, field: &str) -> bool {
        self.get(type_name, field).is_some()
    }

    pub fn len(&self) -> usize {
        self.resolvers.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check every registration against the schema
    ///
    /// Registrations are visited in type then field order, so the error
    /// reported for several bad registrations is always the first of them.
    pub fn validate(&self, schema: &Schema) -> Result<(), SchemaError> {
        for (type_name, fields) in &self.resolvers {
            let desc = schema.describe(type_name)?;
            for field in fields.keys() {
                if desc.field(field).is_none() {
                    return Err(SchemaError::UnknownField {
                        type_name: type_name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ResolverMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<String> = self
            .resolvers
            .iter()
            .flat_map(|(t, fields)| fields.keys().map(move |field| format!("{}.{}", t, field)))
            .collect();
        f.debug_struct("ResolverMap").field("fields", &fields).finish()
    }
}
