//! Parsed query plans
//!
//! The engine takes an already parsed and validated selection tree. Plans
//! deserialize from JSON:
//!
//! ```json
//! {
//!   "operation": "query",
//!   "selections": [
//!     { "type": "Query", "field": "repos", "selections": [
//!       { "type": "Repo", "field": "name" }
//!     ]}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::Arguments;

/// Root a plan runs against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Query,
    /// Root fields run one after another
    Mutation,
}

/// An operation: the root selection set plus its kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    #[serde(default)]
    pub operation: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub selections: Vec<Selection>,
}

impl QueryPlan {
    pub fn query(selections: Vec<Selection>) -> Self {
        Self {
            operation: OperationKind::Query,
            name: None,
            selections,
        }
    }

    pub fn mutation(selections: Vec<Selection>) -> Self {
        Self {
            operation: OperationKind::Mutation,
            name: None,
            selections,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One requested field
///
/// `type_name` is the type the selection was written against. On an
/// abstract field it acts as a type condition: the selection only applies
/// to members of that type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(rename = "type")]
    pub type_name: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Arguments::is_empty")]
    pub arguments: Arguments,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<Selection>,
}

impl Selection {
    pub fn new(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field: field.into(),
            alias: None,
            arguments: Arguments::default(),
            selections: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name, value);
        self
    }

    /// Append child selections
    pub fn select(mut self, children: impl IntoIterator<Item = Selection>) -> Self {
        self.selections.extend(children);
        self
    }

    /// Key the field's value is written under in the response
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_from_json() {
        let plan: QueryPlan = serde_json::from_value(json!({
            "selections": [{
                "type": "Query",
                "field": "repo",
                "alias": "first",
                "arguments": { "id": 1 },
                "selections": [{ "type": "Repo", "field": "name" }]
            }]
        }))
        .unwrap();

        assert_eq!(plan.operation, OperationKind::Query);
        let root = &plan.selections[0];
        assert_eq!(root.response_key(), "first");
        assert_eq!(root.arguments.get::<i64>("id").unwrap(), Some(1));
        assert_eq!(root.selections[0].response_key(), "name");
    }

    #[test]
    fn test_builder_matches_json() {
        let built = QueryPlan::mutation(vec![Selection::new("Mutation", "deleteReview")
            .arg("id", 3)
            .select([Selection::new("DeletedReview", "id")])]);

        let parsed: QueryPlan = serde_json::from_value(json!({
            "operation": "mutation",
            "selections": [{
                "type": "Mutation",
                "field": "deleteReview",
                "arguments": { "id": 3 },
                "selections": [{ "type": "DeletedReview", "field": "id" }]
            }]
        }))
        .unwrap();

        assert_eq!(built, parsed);
    }
}
