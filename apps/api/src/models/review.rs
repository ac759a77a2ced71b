//! Reviews and likes

use graph_engine::{ErrorSet, Key};
use serde::{Deserialize, Serialize};

use super::{is_blank, record_id};

/// Accepted rating range
pub const RATING_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub rating: i64,
    pub comment: String,
    pub user_id: i64,
    pub repo_id: i64,
}

impl Review {
    /// Apply a partial update, returning the edited copy
    pub fn patched(&self, patch: &ReviewPatch) -> ReviewInput {
        ReviewInput {
            rating: patch.rating.or(Some(self.rating)),
            comment: patch.comment.clone().or_else(|| Some(self.comment.clone())),
            user_id: Some(Key::Int(self.user_id)),
            repo_id: Some(Key::Int(self.repo_id)),
        }
    }
}

/// A user liking a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub repo_id: i64,
}

/// Input of the `addReview` mutation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewInput {
    pub rating: Option<i64>,
    pub comment: Option<String>,
    #[serde(alias = "userId")]
    pub user_id: Option<Key>,
    #[serde(alias = "repoId")]
    pub repo_id: Option<Key>,
}

impl ReviewInput {
    /// Rating and comment validations
    ///
    /// Whether the referenced repo and user exist is checked by the store.
    pub fn validate(&self) -> ErrorSet {
        let mut errors = ErrorSet::new();

        match self.rating {
            None => {
                errors.add("rating", "can't be blank");
            }
            Some(rating) if !RATING_RANGE.contains(&rating) => {
                errors.add(
                    "rating",
                    format!("must be in {}..{}", RATING_RANGE.start(), RATING_RANGE.end()),
                );
            }
            Some(_) => {}
        }

        if is_blank(self.comment.as_deref()) {
            errors.add("comment", "can't be blank");
        }

        errors
    }

    pub fn repo_id(&self) -> Option<i64> {
        self.repo_id.as_ref().and_then(record_id)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id.as_ref().and_then(record_id)
    }
}

/// Input of the `updateReview` mutation; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewPatch {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}
