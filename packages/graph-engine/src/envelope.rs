//! Success/failure envelopes for mutation results
//!
//! A mutation resolver never raises a validation problem. It returns an
//! [`Envelope`], which converts into a tagged [`Resolved`] value; the
//! output union registered with
//! [`SchemaBuilder::result_union`](crate::SchemaBuilder::result_union) then
//! maps `Success` to the payload type and `Failure` to `ValidationError`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::ApplyError;
use crate::value::Resolved;

/// Tag carried by successful envelopes
pub const SUCCESS_TAG: &str = "success";

/// Tag carried by failed envelopes
pub const FAILURE_TAG: &str = "failure";

/// Output type of a `Failure`
pub const VALIDATION_ERROR_TYPE: &str = "ValidationError";

pub const VALIDATION_ERROR_DETAILS_TYPE: &str = "ValidationErrorDetails";

pub const ATTRIBUTE_ERROR_TYPE: &str = "AttributeError";

/// Attribute used for errors that concern the record as a whole
pub const BASE_ATTRIBUTE: &str = "base";

/// A single `{attribute, message}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMessage {
    pub attribute: String,
    pub message: String,
}

/// Messages of one attribute, grouped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeErrors {
    pub attribute: String,
    pub errors: Vec<String>,
}

/// Ordered validation errors
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorSet {
    entries: Vec<AttributeMessage>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding one error about the record as a whole
    pub fn base(message: impl Into<String>) -> Self {
        Self::new().with(BASE_ATTRIBUTE, message)
    }

    /// Append an error, builder style
    pub fn with(mut self, attribute: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(attribute, message);
        self
    }

    /// Append an error
    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.entries.push(AttributeMessage {
            attribute: attribute.into(),
            message: message.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeMessage> {
        self.entries.iter()
    }

    /// Every message prefixed with its humanized attribute
    pub fn full_messages(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| full_message(&e.attribute, &e.message))
            .collect()
    }

    /// Messages grouped per attribute, in order of first appearance
    pub fn attribute_errors(&self) -> Vec<AttributeErrors> {
        let mut grouped: Vec<AttributeErrors> = Vec::new();
        for entry in &self.entries {
            match grouped.iter_mut().find(|g| g.attribute == entry.attribute) {
                Some(group) => group.errors.push(entry.message.clone()),
                None => grouped.push(AttributeErrors {
                    attribute: entry.attribute.clone(),
                    errors: vec![entry.message.clone()],
                }),
            }
        }
        grouped
    }

    /// Messages recorded for one attribute
    pub fn messages_for(&self, attribute: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.attribute == attribute)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// The object the `ValidationError` type reads its fields from
    pub fn to_value(&self) -> Value {
        json!({
            "errors": {
                "fullMessages": self.full_messages(),
                "attributeErrors": self.attribute_errors(),
            }
        })
    }
}

impl FromIterator<(String, String)> for ErrorSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (attribute, message) in iter {
            set.add(attribute, message);
        }
        set
    }
}

/// `("password_confirmation", "doesn't match Password")` becomes
/// `"Password confirmation doesn't match Password"`
pub fn full_message(attribute: &str, message: &str) -> String {
    if attribute == BASE_ATTRIBUTE {
        return message.to_string();
    }
    format!("{} {}", humanize(attribute), message)
}

fn humanize(attribute: &str) -> String {
    let attribute = attribute.strip_suffix("_id").unwrap_or(attribute);
    let spaced: String = attribute
        .chars()
        .map(|c| if c == '_' || c == '.' { ' ' } else { c })
        .collect();
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Outcome of a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Failure(ErrorSet),
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Tag used by union resolution
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Success(_) => SUCCESS_TAG,
            Self::Failure(_) => FAILURE_TAG,
        }
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ErrorSet> {
        match self {
            Self::Success(_) => None,
            Self::Failure(errors) => Some(errors),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Self::Success(payload) => Envelope::Success(f(payload)),
            Self::Failure(errors) => Envelope::Failure(errors),
        }
    }

    /// Fold the result of [`MutationStore::apply`](crate::MutationStore::apply)
    ///
    /// Backend failures become a `base` error; the cause is logged, not exposed.
    pub fn from_apply(result: Result<T, ApplyError>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(ApplyError::Invalid(errors)) => Self::Failure(errors),
            Err(ApplyError::Store(err)) => {
                tracing::error!(error = %err, "Mutation failed in backing store");
                Self::Failure(ErrorSet::base("could not be saved, please try again"))
            }
        }
    }
}

impl<T> From<Result<T, ErrorSet>> for Envelope<T> {
    fn from(result: Result<T, ErrorSet>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(errors) => Self::Failure(errors),
        }
    }
}

impl From<Envelope<Value>> for Resolved {
    fn from(envelope: Envelope<Value>) -> Self {
        let tag = envelope.tag();
        match envelope {
            Envelope::Success(payload) => Resolved::tagged(tag, payload),
            Envelope::Failure(errors) => Resolved::tagged(tag, errors.to_value()),
        }
    }
}
