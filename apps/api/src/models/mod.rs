//! Domain models for Repohero
//!
//! This module contains the records served by the in-memory store:
//! - Users and sign-up input
//! - Repositories and categories
//! - Reviews and likes
//!
//! Each model serializes to the JSON record shape resolvers read from, and
//! input types carry their own validations returning an [`ErrorSet`].
//!
//! [`ErrorSet`]: graph_engine::ErrorSet

pub mod repo;
pub mod review;
pub mod user;

pub use repo::{Category, Repo};
pub use review::{Like, Review, ReviewInput, ReviewPatch};
pub use user::{LoginInput, SignupInput, User};

use graph_engine::Key;

/// Presence check shared by validations
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Numeric record id behind a key, if it has one
pub(crate) fn record_id(key: &Key) -> Option<i64> {
    match key {
        Key::Int(id) => Some(*id),
        Key::Str(s) => match Key::from(s.as_str()) {
            Key::Int(id) => Some(id),
            Key::Str(_) => None,
        },
    }
}
