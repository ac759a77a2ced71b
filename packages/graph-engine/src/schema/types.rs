//! Type and field declarations

use std::collections::HashMap;
use std::fmt;

/// Built-in leaf types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Float,
    String,
    Boolean,
    /// Identifier; numbers are serialized as strings
    Id,
    /// Arbitrary JSON, passed through untouched
    Json,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Id => "ID",
            Self::Json => "JSON",
        };
        f.write_str(name)
    }
}

/// Declared result shape of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Scalar(ScalarKind),
    /// Reference to an object, union or interface type by name
    Object(String),
    List(Box<FieldType>),
    /// Offset page of the named node type, see [`crate::connection`]
    Connection(String),
}

/// Shape plus nullability
///
/// Constructors produce non-null types; call [`FieldType::nullable`] to relax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
    pub shape: Shape,
    pub nullable: bool,
}

impl FieldType {
    fn non_null(shape: Shape) -> Self {
        Self {
            shape,
            nullable: false,
        }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self::non_null(Shape::Scalar(kind))
    }

    pub fn int() -> Self {
        Self::scalar(ScalarKind::Int)
    }

    pub fn float() -> Self {
        Self::scalar(ScalarKind::Float)
    }

    pub fn string() -> Self {
        Self::scalar(ScalarKind::String)
    }

    pub fn boolean() -> Self {
        Self::scalar(ScalarKind::Boolean)
    }

    pub fn id() -> Self {
        Self::scalar(ScalarKind::Id)
    }

    pub fn json() -> Self {
        Self::scalar(ScalarKind::Json)
    }

    pub fn object(type_name: impl Into<String>) -> Self {
        Self::non_null(Shape::Object(type_name.into()))
    }

    pub fn list_of(item: FieldType) -> Self {
        Self::non_null(Shape::List(Box::new(item)))
    }

    pub fn connection(node_type: impl Into<String>) -> Self {
        Self::non_null(Shape::Connection(node_type.into()))
    }

    /// Allow this field to resolve to null
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Innermost referenced type name, if the shape is not a scalar
    pub fn named_type(&self) -> Option<&str> {
        match &self.shape {
            Shape::Scalar(_) => None,
            Shape::Object(name) | Shape::Connection(name) => Some(name),
            Shape::List(item) => item.named_type(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            Shape::Scalar(kind) => write!(f, "{}", kind)?,
            Shape::Object(name) => f.write_str(name)?,
            Shape::List(item) => write!(f, "[{}]", item)?,
            Shape::Connection(node) => write!(f, "{}", super::connection_type_name(node))?,
        }
        if !self.nullable {
            f.write_str("!")?;
        }
        Ok(())
    }
}

/// One field of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: FieldType,
    pub description: Option<String>,
}

/// Kind of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Union,
    Interface,
}

/// Registered type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) fields: Vec<FieldDecl>,
    pub(crate) field_index: HashMap<String, usize>,
    /// `(tag, member)` pairs of an abstract type
    pub(crate) possible_types: Vec<(String, String)>,
}

impl TypeDescriptor {
    pub(crate) fn new(name: String, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            fields: Vec::new(),
            field_index: HashMap::new(),
            possible_types: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Union | TypeKind::Interface)
    }

    /// Tag-to-member mapping of a union or interface
    pub fn possible_types(&self) -> &[(String, String)] {
        &self.possible_types
    }

    /// Whether `type_name` is a member of this abstract type
    pub fn has_member(&self, type_name: &str) -> bool {
        self.possible_types
            .iter()
            .any(|(_, member)| member == type_name)
    }
}
