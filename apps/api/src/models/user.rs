//! User accounts and sign-in input

use graph_engine::ErrorSet;
use serde::{Deserialize, Serialize};

use super::is_blank;

/// Minimum password length accepted at sign up
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,

    /// Argon2id hash of the password (never serialized to clients)
    #[serde(skip_serializing, default)]
    pub password_digest: String,
}

/// Arguments of the `signup` mutation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "passwordConfirmation")]
    pub password_confirmation: Option<String>,
}

impl SignupInput {
    /// Field validations that need no store access
    ///
    /// Email uniqueness is checked by the store when the user is created.
    pub fn validate(&self) -> ErrorSet {
        let mut errors = ErrorSet::new();

        if is_blank(self.name.as_deref()) {
            errors.add("name", "can't be blank");
        }

        match self.email.as_deref() {
            email if is_blank(email) => {
                errors.add("email", "can't be blank");
            }
            Some(email) if !is_valid_email(email) => {
                errors.add("email", "is invalid");
            }
            _ => {}
        }

        let password = self.password.as_deref().unwrap_or_default();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("is too short (minimum is {} characters)", MIN_PASSWORD_LENGTH),
            );
        }

        if let Some(confirmation) = self.password_confirmation.as_deref() {
            if confirmation != password {
                errors.add("password_confirmation", "doesn't match Password");
            }
        }

        errors
    }

    /// Email as stored: trimmed and lowercased
    pub fn normalized_email(&self) -> String {
        self.email
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }
}

/// Arguments of the `login` mutation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Validate email format
///
/// Checks one `@`, a local part of at most 64 characters and a domain made
/// of non-empty dot-separated labels.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.len() > 254 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if domain.contains('@') {
        return false;
    }

    if local.is_empty() || local.len() > 64 {
        return false;
    }

    if domain.is_empty() || !domain.contains('.') {
        return false;
    }

    domain.split('.').all(|part| !part.is_empty())
}
