//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Configuration for the embedded SurrealDB instance.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            namespace: "layrbase".into(),
            database: "main".into(),
        }
    }
}

/// Owns the embedded SurrealDB instance.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Db>,
}

impl DbManager {
    /// Start an in-memory SurrealDB, select the configured namespace and
    /// database, and bring the schema up to date.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            namespace = %config.namespace,
            database = %config.database,
            "Starting in-memory SurrealDB"
        );

        let db = Surreal::new::<Mem>(()).await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        run_migrations(&db).await?;

        info!("SurrealDB ready");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Db> {
        &self.db
    }
}
