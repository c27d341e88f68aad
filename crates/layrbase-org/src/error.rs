//! Organization service error types.

use layrbase_core::error::LayrbaseError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrgError {
    #[error("organization name must not be empty")]
    EmptyName,

    #[error("organization name must contain at least one letter or digit")]
    UnsluggableName,

    #[error("you must be an owner or admin of organization {0}")]
    NotManager(Uuid),

    #[error("you are not a member of organization {0}")]
    NotMember(Uuid),

    #[error("only owners may invite other owners")]
    OwnerInviteRequiresOwner,

    #[error("{0} is already a member of this organization")]
    AlreadyMember(String),
}

impl From<OrgError> for LayrbaseError {
    fn from(err: OrgError) -> Self {
        match err {
            OrgError::EmptyName | OrgError::UnsluggableName => {
                LayrbaseError::Validation {
                    message: err.to_string(),
                }
            }
            OrgError::NotManager(_)
            | OrgError::NotMember(_)
            | OrgError::OwnerInviteRequiresOwner => LayrbaseError::AuthorizationDenied {
                reason: err.to_string(),
            },
            OrgError::AlreadyMember(_) => LayrbaseError::AlreadyExists {
                entity: "membership".into(),
            },
        }
    }
}
