//! SurrealDB implementation of [`MembershipRepository`].

use chrono::{DateTime, Utc};
use layrbase_core::error::LayrbaseResult;
use layrbase_core::models::membership::{CreateMembership, Membership, Role};
use layrbase_core::models::organization::OrganizationMembership;
use layrbase_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::organization::fetch_organization;
use crate::error::{DbError, parse_uuid};

/// Remove a membership unless it is the organization's only owner.
///
/// Bumping `owner_revision` makes every removal in the same organization
/// write one shared record, so two concurrent removals conflict instead of
/// both passing the owner count.
const REMOVE_MEMBERSHIP: &str = "\
BEGIN TRANSACTION;
LET $target = (SELECT role FROM membership \
    WHERE organization_id = $organization_id AND user_id = $user_id);
IF array::len($target) = 0 { THROW 'membership not found'; };
LET $owners = (SELECT VALUE id FROM membership \
    WHERE organization_id = $organization_id AND role = 'owner');
IF $target[0].role = 'owner' AND array::len($owners) <= 1 { \
    THROW 'organization must keep an owner'; \
};
UPDATE type::record('organization', $organization_id) \
    SET owner_revision += 1;
DELETE membership \
    WHERE organization_id = $organization_id AND user_id = $user_id;
COMMIT TRANSACTION;
";

#[derive(Debug, SurrealValue)]
struct MembershipRowWithId {
    record_id: String,
    organization_id: String,
    user_id: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl MembershipRowWithId {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        Ok(Membership {
            id: parse_uuid("membership.id", &self.record_id)?,
            organization_id: parse_uuid("membership.organization_id", &self.organization_id)?,
            user_id: parse_uuid("membership.user_id", &self.user_id)?,
            role: self
                .role
                .parse::<Role>()
                .map_err(|e| DbError::decode("membership.role", e))?,
            created_at: self.created_at,
        })
    }
}

pub(crate) async fn fetch_membership<C: Connection>(
    db: &Surreal<C>,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Membership>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM membership \
             WHERE organization_id = $organization_id AND user_id = $user_id",
        )
        .bind(("organization_id", organization_id.to_string()))
        .bind(("user_id", user_id.to_string()))
        .await?;

    let rows: Vec<MembershipRowWithId> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(MembershipRowWithId::try_into_membership)
        .transpose()
}

async fn list_memberships<C: Connection>(
    db: &Surreal<C>,
    column: &'static str,
    value: Uuid,
) -> Result<Vec<Membership>, DbError> {
    let query = format!(
        "SELECT meta::id(id) AS record_id, * FROM membership \
         WHERE {column} = $value ORDER BY created_at ASC"
    );
    let mut result = db.query(&query).bind(("value", value.to_string())).await?;

    let rows: Vec<MembershipRowWithId> = result.take(0)?;
    rows.into_iter()
        .map(MembershipRowWithId::try_into_membership)
        .collect()
}

fn membership_key(organization_id: Uuid, user_id: Uuid) -> String {
    format!("organization={organization_id}, user={user_id}")
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Work out why the removal transaction was rolled back.
    async fn classify_remove_failure(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        err: surrealdb::Error,
    ) -> DbError {
        let target = match fetch_membership(&self.db, organization_id, user_id).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                return DbError::not_found("membership", membership_key(organization_id, user_id));
            }
            Err(lookup) => return lookup,
        };
        if target.role != Role::Owner {
            return err.into();
        }
        match list_memberships(&self.db, "organization_id", organization_id).await {
            Ok(members) if members.iter().filter(|m| m.role == Role::Owner).count() <= 1 => {
                DbError::LastOwner { organization_id }
            }
            Ok(_) => err.into(),
            Err(lookup) => lookup,
        }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn create(&self, input: CreateMembership) -> LayrbaseResult<Membership> {
        if fetch_organization(&self.db, input.organization_id)
            .await?
            .is_none()
        {
            return Err(DbError::not_found("organization", input.organization_id).into());
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let result = self
            .db
            .query(
                "CREATE type::record('membership', $id) SET \
                 organization_id = $organization_id, user_id = $user_id, \
                 role = $role, created_at = $now",
            )
            .bind(("id", id.to_string()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("role", input.role.as_str()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        if let Err(err) = result.check() {
            if fetch_membership(&self.db, input.organization_id, input.user_id)
                .await?
                .is_some()
            {
                return Err(DbError::UniqueViolation {
                    entity: "membership",
                    constraint: "organization_id, user_id",
                }
                .into());
            }
            return Err(DbError::from(err).into());
        }

        Ok(Membership {
            id,
            organization_id: input.organization_id,
            user_id: input.user_id,
            role: input.role,
            created_at: now,
        })
    }

    async fn get(&self, organization_id: Uuid, user_id: Uuid) -> LayrbaseResult<Membership> {
        let membership = fetch_membership(&self.db, organization_id, user_id)
            .await?
            .ok_or_else(|| {
                DbError::not_found("membership", membership_key(organization_id, user_id))
            })?;
        Ok(membership)
    }

    async fn remove(&self, organization_id: Uuid, user_id: Uuid) -> LayrbaseResult<()> {
        let result = self
            .db
            .query(REMOVE_MEMBERSHIP)
            .bind(("organization_id", organization_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        if let Err(err) = result.check() {
            let err = self
                .classify_remove_failure(organization_id, user_id, err)
                .await;
            debug!(%organization_id, %user_id, error = %err, "Membership removal refused");
            return Err(err.into());
        }
        Ok(())
    }

    async fn list_by_organization(&self, organization_id: Uuid) -> LayrbaseResult<Vec<Membership>> {
        Ok(list_memberships(&self.db, "organization_id", organization_id).await?)
    }

    async fn list_for_user(&self, user_id: Uuid) -> LayrbaseResult<Vec<OrganizationMembership>> {
        let memberships = list_memberships(&self.db, "user_id", user_id).await?;

        let mut joined = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if let Some(organization) =
                fetch_organization(&self.db, membership.organization_id).await?
            {
                joined.push(OrganizationMembership {
                    organization,
                    role: membership.role,
                });
            }
        }
        Ok(joined)
    }
}
