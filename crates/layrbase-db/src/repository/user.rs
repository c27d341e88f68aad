//! SurrealDB implementation of [`UserRepository`].

use layrbase_core::error::LayrbaseResult;
use layrbase_core::models::user::{CreateUser, User, normalize_email};
use layrbase_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    display_name: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    display_name: Option<String>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid("user.id", &self.record_id)?,
            email: self.email,
            display_name: self.display_name,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM user WHERE email = $email",
            )
            .bind(("email", email.to_string()))
            .await?;

        let rows: Vec<UserRowWithId> = result.take(0)?;
        rows.into_iter().next().map(UserRowWithId::try_into_user).transpose()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> LayrbaseResult<User> {
        let id = Uuid::new_v4();
        let email = normalize_email(&input.email);

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, display_name = $display_name",
            )
            .bind(("id", id.to_string()))
            .bind(("email", email.clone()))
            .bind(("display_name", input.display_name))
            .await
            .map_err(DbError::from)?;

        let mut result = match result.check() {
            Ok(result) => result,
            Err(err) => {
                if self.find_by_email(&email).await?.is_some() {
                    return Err(DbError::UniqueViolation {
                        entity: "user",
                        constraint: "email",
                    }
                    .into());
                }
                return Err(DbError::from(err).into());
            }
        };

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id))?;

        Ok(User {
            id,
            email: row.email,
            display_name: row.display_name,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> LayrbaseResult<User> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id))?;

        Ok(User {
            id,
            email: row.email,
            display_name: row.display_name,
        })
    }

    async fn get_by_email(&self, email: &str) -> LayrbaseResult<User> {
        let email = normalize_email(email);
        let user = self
            .find_by_email(&email)
            .await?
            .ok_or_else(|| DbError::not_found("user", format!("email={email}")))?;
        Ok(user)
    }
}
