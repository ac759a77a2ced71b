//! Selection set execution
//!
//! Completion follows the field's declared type. A failed or null non-null
//! field aborts its parent object, which then becomes null if its own field
//! is nullable; the null keeps travelling up until a nullable field absorbs
//! it. Every error is recorded once, at the field where it originated.

use std::cell::RefCell;

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use serde_json::{Map, Value};

use super::join::join_wave;
use super::{FieldContext, ResolverMap};
use crate::context::ResolutionContext;
use crate::error::{FieldError, FieldResult, SchemaError};
use crate::plan::{OperationKind, QueryPlan, Selection};
use crate::response::{GraphError, Path};
use crate::schema::{connection_type_name, FieldType, ScalarKind, Schema, Shape, TypeDescriptor};
use crate::value::Resolved;

/// Meta field answered by every object type
const TYPENAME_FIELD: &str = "__typename";

/// Why a value could not be produced
pub(crate) enum Abort {
    /// The error was recorded; the nearest nullable ancestor becomes null
    Null,
    /// The schema and the resolvers disagree; the execution stops
    Fatal(SchemaError),
}

impl From<SchemaError> for Abort {
    fn from(err: SchemaError) -> Self {
        Self::Fatal(err)
    }
}

type Completion = Result<Value, Abort>;

fn is_fatal(completion: &Completion) -> bool {
    matches!(completion, Err(Abort::Fatal(_)))
}

pub(crate) struct Executor<'e> {
    schema: &'e Schema,
    resolvers: &'e ResolverMap,
    ctx: &'e ResolutionContext,
    errors: RefCell<Vec<GraphError>>,
}

impl<'e> Executor<'e> {
    pub(crate) fn new(
        schema: &'e Schema,
        resolvers: &'e ResolverMap,
        ctx: &'e ResolutionContext,
    ) -> Self {
        Self {
            schema,
            resolvers,
            ctx,
            errors: RefCell::new(Vec::new()),
        }
    }

    /// Run a plan against its root type
    ///
    /// `Ok(Value::Null)` means a non-null root field failed.
    pub(crate) async fn execute_operation(&self, plan: &QueryPlan) -> Result<Value, SchemaError> {
        let root = match plan.operation {
            OperationKind::Query => self.schema.query_root()?,
            OperationKind::Mutation => self.schema.mutation_root()?,
        };
        let root_value = Value::Object(Map::new());

        let completed = match plan.operation {
            OperationKind::Query => {
                self.select(root, &root_value, &plan.selections, Path::root())
                    .await
            }
            OperationKind::Mutation => {
                self.select_serial(root, &root_value, &plan.selections)
                    .await
            }
        };

        match completed {
            Ok(data) => Ok(data),
            Err(Abort::Null) => Ok(Value::Null),
            Err(Abort::Fatal(err)) => Err(err),
        }
    }

    pub(crate) fn into_errors(self) -> Vec<GraphError> {
        self.errors.into_inner()
    }

    fn record(&self, err: FieldError, path: &Path) {
        err.log(&path.to_string());
        self.errors.borrow_mut().push(GraphError::new(&err, path.clone()));
    }

    /// Record `err` and null the field, aborting the parent when non-null
    fn fail(&self, err: FieldError, ty: &FieldType, path: &Path) -> Completion {
        self.record(err, path);
        if ty.nullable {
            Ok(Value::Null)
        } else {
            Err(Abort::Null)
        }
    }

    /// Resolve the selections that apply to `ty`, all in the same wave
    fn select<'f>(
        &'f self,
        ty: &'f TypeDescriptor,
        parent: &'f Value,
        selections: &'f [Selection],
        path: Path,
    ) -> LocalBoxFuture<'f, Completion> {
        async move {
            let applicable: Vec<&Selection> = selections
                .iter()
                .filter(|sel| self.schema.selection_applies(&sel.type_name, ty))
                .collect();

            let fields = applicable
                .iter()
                .map(|sel| self.field(ty, parent, sel, path.child(sel.response_key())))
                .collect();
            let outputs = match join_wave(fields, is_fatal).await {
                Ok(outputs) => outputs,
                Err(fatal) => return fatal,
            };

            let mut object = Map::new();
            let mut aborted = false;
            for (sel, output) in applicable.iter().zip(outputs) {
                match output {
                    Ok(value) => {
                        object.insert(sel.response_key().to_string(), value);
                    }
                    Err(Abort::Null) => aborted = true,
                    Err(fatal) => return Err(fatal),
                }
            }
            if aborted {
                return Err(Abort::Null);
            }
            Ok(Value::Object(object))
        }
        .boxed_local()
    }

    /// Resolve root mutation fields one at a time, in plan order
    async fn select_serial(
        &self,
        ty: &TypeDescriptor,
        parent: &Value,
        selections: &[Selection],
    ) -> Completion {
        let mut object = Map::new();
        let mut aborted = false;
        for sel in selections
            .iter()
            .filter(|sel| self.schema.selection_applies(&sel.type_name, ty))
        {
            let path = Path::root().child(sel.response_key());
            match self.field(ty, parent, sel, path).await {
                Ok(value) => {
                    object.insert(sel.response_key().to_string(), value);
                }
                Err(Abort::Null) => aborted = true,
                Err(fatal) => return Err(fatal),
            }
        }
        if aborted {
            return Err(Abort::Null);
        }
        Ok(Value::Object(object))
    }

    fn field<'f>(
        &'f self,
        owner: &'f TypeDescriptor,
        parent: &'f Value,
        sel: &'f Selection,
        path: Path,
    ) -> LocalBoxFuture<'f, Completion> {
        async move {
            if sel.field == TYPENAME_FIELD {
                return Ok(Value::String(owner.name().to_string()));
            }
            let decl = owner
                .field(&sel.field)
                .ok_or_else(|| SchemaError::UnknownField {
                    type_name: owner.name().to_string(),
                    field: sel.field.clone(),
                })?;

            let resolved = match self.resolvers.get(owner.name(), &sel.field) {
                Some(resolver) => {
                    let field_ctx = FieldContext {
                        parent,
                        args: &sel.arguments,
                        field: &sel.field,
                        parent_type: owner.name(),
                        ctx: self.ctx,
                        path: &path,
                    };
                    resolver(field_ctx).await
                }
                None => Ok(default_resolve(parent, &sel.field)),
            };

            match resolved {
                Ok(resolved) => self.complete(&decl.ty, resolved, owner, sel, path).await,
                Err(err) => self.fail(err, &decl.ty, &path),
            }
        }
        .boxed_local()
    }

    /// Complete a resolved value against its declared type
    fn complete<'f>(
        &'f self,
        ty: &'f FieldType,
        resolved: Resolved,
        owner: &'f TypeDescriptor,
        sel: &'f Selection,
        path: Path,
    ) -> LocalBoxFuture<'f, Completion> {
        async move {
            if resolved.is_null() {
                if ty.nullable {
                    return Ok(Value::Null);
                }
                let err = FieldError::NonNullViolation {
                    type_name: owner.name().to_string(),
                    field: sel.field.clone(),
                };
                return self.fail(err, ty, &path);
            }

            let completed = match &ty.shape {
                Shape::Scalar(kind) => match coerce_scalar(*kind, resolved) {
                    Ok(value) => Ok(value),
                    Err(err) => return self.fail(err, ty, &path),
                },
                Shape::List(item) => self.complete_list(ty, item, resolved, owner, sel, path).await,
                Shape::Object(type_name) => {
                    let desc = self.schema.describe(type_name)?;
                    self.complete_object(ty, desc, resolved, sel, path).await
                }
                Shape::Connection(node) => {
                    let desc = self.schema.describe(&connection_type_name(node))?;
                    self.complete_object(ty, desc, resolved, sel, path).await
                }
            };

            match completed {
                Err(Abort::Null) if ty.nullable => Ok(Value::Null),
                other => other,
            }
        }
        .boxed_local()
    }

    async fn complete_list(
        &self,
        ty: &FieldType,
        item: &FieldType,
        resolved: Resolved,
        owner: &TypeDescriptor,
        sel: &Selection,
        path: Path,
    ) -> Completion {
        let items = match resolved {
            Resolved::List(items) => items,
            Resolved::Value(Value::Array(values)) => values.into_iter().map(Resolved::from).collect(),
            other => {
                let err = FieldError::InvalidValue {
                    expected: ty.to_string(),
                    found: describe_resolved(&other),
                };
                return self.fail(err, ty, &path);
            }
        };

        let futures = items
            .into_iter()
            .enumerate()
            .map(|(i, value)| self.complete(item, value, owner, sel, path.index(i)))
            .collect();
        let outputs = match join_wave(futures, is_fatal).await {
            Ok(outputs) => outputs,
            Err(fatal) => return fatal,
        };

        let mut values = Vec::with_capacity(outputs.len());
        let mut aborted = false;
        for output in outputs {
            match output {
                Ok(value) => values.push(value),
                Err(Abort::Null) => aborted = true,
                Err(fatal) => return Err(fatal),
            }
        }
        if aborted {
            return Err(Abort::Null);
        }
        Ok(Value::Array(values))
    }

    async fn complete_object(
        &self,
        ty: &FieldType,
        declared: &TypeDescriptor,
        resolved: Resolved,
        sel: &Selection,
        path: Path,
    ) -> Completion {
        let concrete = if declared.is_abstract() {
            self.schema.resolve_union_member(declared.name(), &resolved)?
        } else {
            declared
        };

        let value = match resolved {
            Resolved::Value(value @ Value::Object(_)) => value,
            Resolved::Tagged {
                value: value @ Value::Object(_),
                ..
            } => value,
            other => {
                let err = FieldError::InvalidValue {
                    expected: concrete.name().to_string(),
                    found: describe_resolved(&other),
                };
                return self.fail(err, ty, &path);
            }
        };

        self.select(concrete, &value, &sel.selections, path).await
    }
}

fn default_resolve(parent: &Value, field: &str) -> Resolved {
    parent
        .get(field)
        .cloned()
        .map(Resolved::from)
        .unwrap_or(Resolved::Null)
}

fn coerce_scalar(kind: ScalarKind, resolved: Resolved) -> FieldResult<Value> {
    let value = match resolved {
        Resolved::Value(value) | Resolved::Tagged { value, .. } => value,
        Resolved::List(items) if kind == ScalarKind::Json => {
            return items
                .into_iter()
                .map(|item| coerce_scalar(kind, item))
                .collect::<FieldResult<Vec<Value>>>()
                .map(Value::Array);
        }
        Resolved::List(_) => {
            return Err(FieldError::InvalidValue {
                expected: kind.to_string(),
                found: "list".to_string(),
            })
        }
        Resolved::Null => return Ok(Value::Null),
    };

    let coerced = match (kind, &value) {
        (ScalarKind::Json, _) => Some(value.clone()),
        (ScalarKind::Int, Value::Number(n)) => n.as_i64().map(Value::from),
        (ScalarKind::Float, Value::Number(n)) => n.as_f64().map(Value::from),
        (ScalarKind::String, Value::String(_)) => Some(value.clone()),
        (ScalarKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ScalarKind::Id, Value::String(_)) => Some(value.clone()),
        (ScalarKind::Id, Value::Number(n)) => Some(Value::String(n.to_string())),
        _ => None,
    };
    coerced.ok_or_else(|| FieldError::InvalidValue {
        expected: kind.to_string(),
        found: describe_value(&value),
    })
}

fn describe_resolved(resolved: &Resolved) -> String {
    match resolved {
        Resolved::Null => "null".to_string(),
        Resolved::List(_) => "list".to_string(),
        Resolved::Value(value) | Resolved::Tagged { value, .. } => describe_value(value),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "list".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
