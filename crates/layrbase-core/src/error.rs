//! Error types for Layrbase.
//!
//! Every collaborator failure is translated into one of these kinds before
//! it reaches client state.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum LayrbaseError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Invitation has expired")]
    InvitationExpired,

    #[error("Invitation has already been accepted")]
    InvitationAlreadyAccepted,

    #[error("Invitation was sent to {invited}, but you are signed in as {actual}")]
    EmailMismatch { invited: String, actual: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// The organization row exists but its owner membership does not.
    #[error("Organization {organization_id} was created without an owner: {reason}")]
    PartialFailure { organization_id: Uuid, reason: String },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl LayrbaseError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Kinds whose only remedy is a brand-new invitation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InvitationExpired | Self::InvitationAlreadyAccepted
        )
    }
}

pub type LayrbaseResult<T> = Result<T, LayrbaseError>;
