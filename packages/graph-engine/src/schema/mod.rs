//! Schema registry
//!
//! A [`Schema`] is assembled once with [`SchemaBuilder`] and is immutable
//! afterwards. Building checks the whole type graph: references resolve,
//! every union and interface carries a closed tag mapping that covers each
//! member exactly once, and implementors agree with their interfaces.
//! Because of that, [`Schema::resolve_union_member`] is total over every
//! tag the schema knows about.

mod types;

pub use types::{FieldDecl, FieldType, ScalarKind, Shape, TypeDescriptor, TypeKind};

pub(crate) use crate::connection::connection_type_name;

use std::collections::{HashMap, HashSet};

use crate::connection::PAGE_INFO_TYPE;
use crate::envelope::{
    ATTRIBUTE_ERROR_TYPE, FAILURE_TAG, SUCCESS_TAG, VALIDATION_ERROR_DETAILS_TYPE,
    VALIDATION_ERROR_TYPE,
};
use crate::error::SchemaError;
use crate::value::Resolved;

const DEFAULT_QUERY_TYPE: &str = "Query";
const DEFAULT_MUTATION_TYPE: &str = "Mutation";

/// Collects the fields of one type
pub struct TypeBuilder {
    desc: TypeDescriptor,
    errors: Vec<SchemaError>,
}

impl TypeBuilder {
    fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            desc: TypeDescriptor::new(name.to_string(), kind),
            errors: Vec::new(),
        }
    }

    /// Declare a field
    pub fn field(self, name: &str, ty: FieldType) -> Self {
        self.push_field(name, ty, None)
    }

    /// Declare a field with a description
    pub fn field_with_description(self, name: &str, ty: FieldType, description: &str) -> Self {
        self.push_field(name, ty, Some(description.to_string()))
    }

    fn push_field(mut self, name: &str, ty: FieldType, description: Option<String>) -> Self {
        if self.desc.field_index.contains_key(name) {
            self.errors.push(SchemaError::DuplicateField {
                type_name: self.desc.name.clone(),
                field: name.to_string(),
            });
            return self;
        }
        self.desc
            .field_index
            .insert(name.to_string(), self.desc.fields.len());
        self.desc.fields.push(FieldDecl {
            name: name.to_string(),
            ty,
            description,
        });
        self
    }
}

/// Builder for [`Schema`]
pub struct SchemaBuilder {
    types: Vec<TypeDescriptor>,
    errors: Vec<SchemaError>,
    query_type: String,
    mutation_type: Option<String>,
    needs_error_types: bool,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            errors: Vec::new(),
            query_type: DEFAULT_QUERY_TYPE.to_string(),
            mutation_type: None,
            needs_error_types: false,
        }
    }

    /// Register an object type
    pub fn object(self, name: &str, fields: impl FnOnce(TypeBuilder) -> TypeBuilder) -> Self {
        let builder = fields(TypeBuilder::new(name, TypeKind::Object));
        self.push_type(builder)
    }

    /// Register an interface with its fields and its `(tag, implementor)` mapping
    pub fn interface<'a>(
        self,
        name: &str,
        fields: impl FnOnce(TypeBuilder) -> TypeBuilder,
        members: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut builder = fields(TypeBuilder::new(name, TypeKind::Interface));
        builder.desc.possible_types = collect_members(members);
        self.push_type(builder)
    }

    /// Register a union with its `(tag, member)` mapping
    pub fn union<'a>(self, name: &str, members: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut builder = TypeBuilder::new(name, TypeKind::Union);
        builder.desc.possible_types = collect_members(members);
        self.push_type(builder)
    }

    /// Register the output union of a mutation
    ///
    /// `Success` envelopes resolve to `success_type`, `Failure` envelopes to
    /// the built-in `ValidationError` type, which is installed on demand.
    pub fn result_union(mut self, name: &str, success_type: &str) -> Self {
        self.needs_error_types = true;
        self.union(
            name,
            [(SUCCESS_TAG, success_type), (FAILURE_TAG, VALIDATION_ERROR_TYPE)],
        )
    }

    /// Override the query root type name
    pub fn query_type(mut self, name: &str) -> Self {
        self.query_type = name.to_string();
        self
    }

    /// Override the mutation root type name
    pub fn mutation_type(mut self, name: &str) -> Self {
        self.mutation_type = Some(name.to_string());
        self
    }

    fn push_type(mut self, builder: TypeBuilder) -> Self {
        self.errors.extend(builder.errors);
        self.types.push(builder.desc);
        self
    }

    /// Validate and freeze the schema
    pub fn build(mut self) -> Result<Schema, SchemaError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        if self.needs_error_types {
            self.types.extend(validation_error_types());
        }
        let connections = synthesize_connections(&self.types);
        self.types.extend(connections);

        let mut index = HashMap::with_capacity(self.types.len());
        for (i, desc) in self.types.iter().enumerate() {
            if index.insert(desc.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateType(desc.name.clone()));
            }
        }

        let mutation_type = match self.mutation_type {
            Some(name) => Some(name),
            None => index
                .contains_key(DEFAULT_MUTATION_TYPE)
                .then(|| DEFAULT_MUTATION_TYPE.to_string()),
        };

        let schema = Schema {
            types: self.types,
            index,
            query_type: self.query_type,
            mutation_type,
        };
        schema.validate()?;

        tracing::debug!(types = schema.types.len(), "Schema registered");
        Ok(schema)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_members<'a>(members: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<(String, String)> {
    members
        .into_iter()
        .map(|(tag, member)| (tag.to_string(), member.to_string()))
        .collect()
}

fn validation_error_types() -> Vec<TypeDescriptor> {
    let string_list = || FieldType::list_of(FieldType::string());
    [
        TypeBuilder::new(VALIDATION_ERROR_TYPE, TypeKind::Object)
            .field("errors", FieldType::object(VALIDATION_ERROR_DETAILS_TYPE)),
        TypeBuilder::new(VALIDATION_ERROR_DETAILS_TYPE, TypeKind::Object)
            .field("fullMessages", string_list())
            .field(
                "attributeErrors",
                FieldType::list_of(FieldType::object(ATTRIBUTE_ERROR_TYPE)),
            ),
        TypeBuilder::new(ATTRIBUTE_ERROR_TYPE, TypeKind::Object)
            .field("attribute", FieldType::string())
            .field("errors", string_list()),
    ]
    .into_iter()
    .map(|b| b.desc)
    .collect()
}

/// Page types for every `Connection(node)` shape in use
fn synthesize_connections(types: &[TypeDescriptor]) -> Vec<TypeDescriptor> {
    fn visit<'a>(ty: &'a FieldType, nodes: &mut Vec<&'a str>) {
        match &ty.shape {
            Shape::Connection(node) if !nodes.contains(&node.as_str()) => nodes.push(node),
            Shape::List(item) => visit(item, nodes),
            _ => {}
        }
    }

    let mut nodes = Vec::new();
    for field in types.iter().flat_map(|t| t.fields.iter()) {
        visit(&field.ty, &mut nodes);
    }
    if nodes.is_empty() {
        return Vec::new();
    }

    let mut synthesized: Vec<TypeDescriptor> = nodes
        .into_iter()
        .map(|node| {
            TypeBuilder::new(&connection_type_name(node), TypeKind::Object)
                .field("nodes", FieldType::list_of(FieldType::object(node)))
                .field("totalCount", FieldType::int())
                .field("pageInfo", FieldType::object(PAGE_INFO_TYPE))
                .desc
        })
        .collect();
    synthesized.push(
        TypeBuilder::new(PAGE_INFO_TYPE, TypeKind::Object)
            .field("hasNextPage", FieldType::boolean())
            .field("hasPreviousPage", FieldType::boolean())
            .field("offset", FieldType::int())
            .field("limit", FieldType::int())
            .desc,
    );
    synthesized
}

/// Immutable registry of types
#[derive(Debug)]
pub struct Schema {
    types: Vec<TypeDescriptor>,
    index: HashMap<String, usize>,
    query_type: String,
    mutation_type: Option<String>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Look up a registered type
    pub fn describe(&self, type_name: &str) -> Result<&TypeDescriptor, SchemaError> {
        self.index
            .get(type_name)
            .map(|&i| &self.types[i])
            .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))
    }

    /// Map an instance of a union or interface to its concrete member
    pub fn resolve_union_member(
        &self,
        abstract_type: &str,
        instance: &Resolved,
    ) -> Result<&TypeDescriptor, SchemaError> {
        let desc = self.describe(abstract_type)?;
        let unmatched = |detail: String| SchemaError::AmbiguousOrUnmatchedType {
            abstract_type: abstract_type.to_string(),
            detail,
        };

        if !desc.is_abstract() {
            return Err(unmatched("type is not a union or interface".to_string()));
        }
        let tag = instance
            .tag()
            .ok_or_else(|| unmatched("value carries no type tag".to_string()))?;

        let mut candidates = desc
            .possible_types
            .iter()
            .filter(|(candidate, _)| candidate == tag);
        match (candidates.next(), candidates.next()) {
            (Some((_, member)), None) => self.describe(member),
            (None, _) => Err(unmatched(format!("no member is tagged {}", tag))),
            (Some(_), Some(_)) => Err(unmatched(format!("several members are tagged {}", tag))),
        }
    }

    pub fn query_root(&self) -> Result<&TypeDescriptor, SchemaError> {
        self.describe(&self.query_type)
    }

    pub fn mutation_root(&self) -> Result<&TypeDescriptor, SchemaError> {
        let name = self
            .mutation_type
            .as_deref()
            .ok_or(SchemaError::UnknownRootType("mutation"))?;
        self.describe(name)
    }

    /// Whether a selection written against `selection_type` applies to `concrete`
    pub fn selection_applies(&self, selection_type: &str, concrete: &TypeDescriptor) -> bool {
        if selection_type == concrete.name {
            return true;
        }
        self.describe(selection_type)
            .map(|t| t.is_abstract() && t.has_member(&concrete.name))
            .unwrap_or(false)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let query_root = self.query_root().map_err(|_| SchemaError::UnknownRootType("query"))?;
        if query_root.kind != TypeKind::Object {
            return Err(SchemaError::UnknownRootType("query"));
        }
        if let Some(name) = &self.mutation_type {
            if self.describe(name)?.kind != TypeKind::Object {
                return Err(SchemaError::UnknownRootType("mutation"));
            }
        }

        for desc in &self.types {
            for field in &desc.fields {
                if let Some(referenced) = field.ty.named_type() {
                    self.describe(referenced)?;
                }
            }
            if desc.is_abstract() {
                self.validate_possible_types(desc)?;
            }
        }
        Ok(())
    }

    fn validate_possible_types(&self, desc: &TypeDescriptor) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidPossibleTypes {
            abstract_type: desc.name.clone(),
            reason,
        };

        if desc.possible_types.is_empty() {
            return Err(invalid("no members declared".to_string()));
        }

        let mut tags = HashSet::new();
        let mut members = HashSet::new();
        for (tag, member) in &desc.possible_types {
            if !tags.insert(tag.as_str()) {
                return Err(invalid(format!("tag {} maps to more than one member", tag)));
            }
            if !members.insert(member.as_str()) {
                return Err(invalid(format!("member {} has more than one tag", member)));
            }
            let member_desc = self.describe(member)?;
            if member_desc.kind != TypeKind::Object {
                return Err(invalid(format!("member {} is not an object type", member)));
            }
            if desc.kind == TypeKind::Interface {
                for field in &desc.fields {
                    let matches = member_desc
                        .field(&field.name)
                        .map(|f| f.ty == field.ty)
                        .unwrap_or(false);
                    if !matches {
                        return Err(SchemaError::InterfaceMismatch {
                            type_name: member.clone(),
                            interface: desc.name.clone(),
                            field: field.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
