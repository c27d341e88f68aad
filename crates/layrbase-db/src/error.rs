//! Database-specific error types and conversions.

use layrbase_core::error::LayrbaseError;
use uuid::Uuid;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unique constraint violated on {entity}: {constraint}")]
    UniqueViolation {
        entity: &'static str,
        constraint: &'static str,
    },

    #[error("organization {organization_id} must keep at least one owner")]
    LastOwner { organization_id: Uuid },
}

impl DbError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn decode(what: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode(format!("{what}: {err}"))
    }
}

impl From<DbError> for LayrbaseError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LayrbaseError::NotFound {
                entity: entity.into(),
                id,
            },
            DbError::UniqueViolation { entity, .. } => LayrbaseError::AlreadyExists {
                entity: entity.into(),
            },
            DbError::LastOwner { .. } => LayrbaseError::Validation {
                message: err.to_string(),
            },
            other => LayrbaseError::Backend(other.to_string()),
        }
    }
}

/// Parse a UUID stored as a string column.
pub(crate) fn parse_uuid(column: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::decode(column, e))
}
