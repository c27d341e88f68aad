//! User domain model.
//!
//! Identities are owned by the auth provider; this is the subset the
//! membership and invitation flows need.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LayrbaseError, LayrbaseResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

impl User {
    /// Name shown to other users, falling back to the email address.
    pub fn display_label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }

    /// Case-insensitive comparison against another address.
    pub fn has_email(&self, email: &str) -> bool {
        normalize_email(&self.email) == normalize_email(email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub display_name: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize and validate an email address.
///
/// Accepts `local@domain.tld` shapes only: one `@`, a non-empty local part,
/// a domain with an inner dot and no whitespace anywhere.
pub fn validate_email(email: &str) -> LayrbaseResult<String> {
    let normalized = normalize_email(email);
    let invalid = || LayrbaseError::validation(format!("invalid email address: {email:?}"));

    if normalized.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let dot = domain.find('.').ok_or_else(invalid)?;
    if dot == 0 || domain.ends_with('.') || domain.contains("..") {
        return Err(invalid());
    }

    Ok(normalized)
}
