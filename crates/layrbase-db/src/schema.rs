//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings and roles as
//! strings with an ASSERT constraint. Uniqueness (user email, organization
//! slug, one membership per user and organization, invitation token hash)
//! is enforced by UNIQUE indexes, not by the repositories.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "organizations_and_invitations",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD display_name ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Organizations
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD slug ON TABLE organization TYPE string;
DEFINE FIELD description ON TABLE organization TYPE option<string>;
DEFINE FIELD industry ON TABLE organization TYPE option<string>;
DEFINE FIELD website ON TABLE organization TYPE option<string>;
DEFINE FIELD created_by ON TABLE organization TYPE string;
DEFINE FIELD owner_revision ON TABLE organization TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_slug ON TABLE organization \
    COLUMNS slug UNIQUE;

-- =======================================================================
-- Memberships
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE membership TYPE string;
DEFINE FIELD user_id ON TABLE membership TYPE string;
DEFINE FIELD role ON TABLE membership TYPE string \
    ASSERT $value IN ['owner', 'admin', 'member', 'viewer'];
DEFINE FIELD created_at ON TABLE membership TYPE datetime;
DEFINE INDEX idx_membership_org_user ON TABLE membership \
    COLUMNS organization_id, user_id UNIQUE;
DEFINE INDEX idx_membership_user ON TABLE membership COLUMNS user_id;

-- =======================================================================
-- Invitations
-- =======================================================================
DEFINE TABLE invitation SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE invitation TYPE string;
DEFINE FIELD email ON TABLE invitation TYPE string;
DEFINE FIELD role ON TABLE invitation TYPE string \
    ASSERT $value IN ['owner', 'admin', 'member', 'viewer'];
DEFINE FIELD token_hash ON TABLE invitation TYPE string;
DEFINE FIELD invited_by ON TABLE invitation TYPE string;
DEFINE FIELD created_at ON TABLE invitation TYPE datetime;
DEFINE FIELD expires_at ON TABLE invitation TYPE datetime;
DEFINE FIELD accepted_at ON TABLE invitation TYPE option<datetime>;
DEFINE INDEX idx_invitation_token_hash ON TABLE invitation \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_invitation_org ON TABLE invitation \
    COLUMNS organization_id;
";

/// Apply every migration newer than the recorded schema version.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "could not record v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn every_uniqueness_rule_has_an_index() {
        for index in [
            "idx_user_email",
            "idx_organization_slug",
            "idx_membership_org_user",
            "idx_invitation_token_hash",
        ] {
            let line = SCHEMA_V1
                .lines()
                .skip_while(|l| !l.contains(index))
                .take(2)
                .collect::<String>();
            assert!(line.contains("UNIQUE"), "{index} must be UNIQUE");
        }
    }
}
