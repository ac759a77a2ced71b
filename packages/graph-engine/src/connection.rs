//! Offset pagination for connection fields
//!
//! A field declared with [`FieldType::connection`](crate::FieldType::connection)
//! resolves to a page object. Resolvers build it with [`Page`]; the schema
//! registers the matching `{Node}Connection` and `PageInfo` types.

use serde_json::{json, Value};

/// Name of the shared page info type
pub const PAGE_INFO_TYPE: &str = "PageInfo";

/// Default page size when the caller passes no limit
pub const DEFAULT_LIMIT: i64 = 20;

/// Maximum items for nested relationship resolvers
pub const MAX_NESTED_LIMIT: i64 = 50;

/// Name of the page type generated for `node_type`
pub fn connection_type_name(node_type: &str) -> String {
    format!("{}Connection", node_type)
}

/// Clamp pagination limit to valid range
#[inline]
pub fn clamp_limit(limit: i64, max: i64) -> i64 {
    limit.clamp(1, max)
}

/// Clamp offset to non-negative
#[inline]
pub fn clamp_offset(offset: i64) -> i64 {
    offset.max(0)
}

/// One page of nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub nodes: Vec<Value>,
    pub offset: i64,
    pub limit: i64,
    pub total_count: i64,
}

impl Page {
    /// Slice a full result set into the requested page
    pub fn from_slice(all: &[Value], offset: i64, limit: i64) -> Self {
        let offset = clamp_offset(offset);
        let start = (offset as usize).min(all.len());
        let end = start.saturating_add(limit.max(0) as usize).min(all.len());
        Self {
            nodes: all[start..end].to_vec(),
            offset,
            limit,
            total_count: all.len() as i64,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.offset + (self.nodes.len() as i64) < self.total_count
    }

    pub fn has_previous_page(&self) -> bool {
        self.offset > 0
    }

    /// The value the generated connection type reads its fields from
    pub fn into_value(self) -> Value {
        json!({
            "totalCount": self.total_count,
            "pageInfo": {
                "hasNextPage": self.has_next_page(),
                "hasPreviousPage": self.has_previous_page(),
                "offset": self.offset,
                "limit": self.limit,
            },
            "nodes": self.nodes,
        })
    }
}
