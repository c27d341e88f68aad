//! SurrealDB implementation of [`InvitationRepository`].

use chrono::{DateTime, Utc};
use layrbase_core::error::{LayrbaseError, LayrbaseResult};
use layrbase_core::models::invitation::{
    AcceptedInvitation, CreateInvitation, Invitation, InvitationStatus,
};
use layrbase_core::models::membership::Role;
use layrbase_core::repository::InvitationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::membership::fetch_membership;
use super::organization::fetch_organization;
use crate::error::{DbError, parse_uuid};

/// Mark a still-valid invitation accepted and create the membership.
///
/// The UPDATE only matches an unaccepted, unexpired row, so of several
/// concurrent acceptances at most one commits. A failed membership insert
/// rolls the acceptance back.
const ACCEPT_INVITATION: &str = "\
BEGIN TRANSACTION;
LET $accepted = (UPDATE invitation SET accepted_at = $now \
    WHERE token_hash = $token_hash AND accepted_at = NONE \
    AND expires_at > $now);
IF array::len($accepted) = 0 { THROW 'invitation is not pending'; };
CREATE type::record('membership', $membership_id) SET \
    organization_id = $accepted[0].organization_id, user_id = $user_id, \
    role = $accepted[0].role, created_at = $now;
COMMIT TRANSACTION;
";

const BY_ID: &str = "type::record('invitation', $value)";
const BY_TOKEN_HASH: &str = "invitation WHERE token_hash = $value";

#[derive(Debug, SurrealValue)]
struct InvitationRowWithId {
    record_id: String,
    organization_id: String,
    email: String,
    role: String,
    token_hash: String,
    invited_by: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
}

impl InvitationRowWithId {
    fn try_into_invitation(self) -> Result<Invitation, DbError> {
        Ok(Invitation {
            id: parse_uuid("invitation.id", &self.record_id)?,
            organization_id: parse_uuid("invitation.organization_id", &self.organization_id)?,
            email: self.email,
            role: self
                .role
                .parse::<Role>()
                .map_err(|e| DbError::decode("invitation.role", e))?,
            token_hash: self.token_hash,
            invited_by: parse_uuid("invitation.invited_by", &self.invited_by)?,
            created_at: self.created_at,
            expires_at: self.expires_at,
            accepted_at: self.accepted_at,
        })
    }
}

/// Row returned by a delete; only used to tell whether anything matched.
#[derive(Debug, SurrealValue)]
struct DeletedRow {
    #[allow(dead_code)]
    token_hash: String,
}

/// SurrealDB implementation of the Invitation repository.
#[derive(Clone)]
pub struct SurrealInvitationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInvitationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(
        &self,
        source: &'static str,
        value: String,
    ) -> Result<Option<Invitation>, DbError> {
        let query = format!("SELECT meta::id(id) AS record_id, * FROM {source}");
        let mut result = self.db.query(&query).bind(("value", value)).await?;

        let rows: Vec<InvitationRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(InvitationRowWithId::try_into_invitation)
            .transpose()
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Invitation, DbError> {
        self.find_one(BY_TOKEN_HASH, token_hash.to_string())
            .await?
            .ok_or_else(|| DbError::not_found("invitation", "token"))
    }

    /// Work out why the accept transaction was rolled back.
    async fn classify_accept_failure(
        &self,
        token_hash: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
        err: surrealdb::Error,
    ) -> LayrbaseError {
        let invitation = match self.find_by_token_hash(token_hash).await {
            Ok(invitation) => invitation,
            Err(lookup) => return lookup.into(),
        };
        match invitation.status_at(now) {
            InvitationStatus::Accepted => {
                debug!(invitation_id = %invitation.id, "Rejecting repeat acceptance");
                LayrbaseError::InvitationAlreadyAccepted
            }
            InvitationStatus::Expired => LayrbaseError::InvitationExpired,
            InvitationStatus::Pending => {
                match fetch_membership(&self.db, invitation.organization_id, user_id).await {
                    Ok(Some(_)) => DbError::UniqueViolation {
                        entity: "membership",
                        constraint: "organization_id, user_id",
                    }
                    .into(),
                    Ok(None) => DbError::from(err).into(),
                    Err(lookup) => lookup.into(),
                }
            }
        }
    }
}

impl<C: Connection> InvitationRepository for SurrealInvitationRepository<C> {
    async fn create(&self, input: CreateInvitation) -> LayrbaseResult<Invitation> {
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
                "CREATE type::record('invitation', $id) SET \
                 organization_id = $organization_id, email = $email, role = $role, \
                 token_hash = $token_hash, invited_by = $invited_by, \
                 created_at = $now, expires_at = $expires_at",
            )
            .bind(("id", id.to_string()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("email", input.email.clone()))
            .bind(("role", input.role.as_str()))
            .bind(("token_hash", input.token_hash.clone()))
            .bind(("invited_by", input.invited_by.to_string()))
            .bind(("now", now))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        if let Err(err) = result.check() {
            if self
                .find_one(BY_TOKEN_HASH, input.token_hash.clone())
                .await?
                .is_some()
            {
                return Err(DbError::UniqueViolation {
                    entity: "invitation",
                    constraint: "token_hash",
                }
                .into());
            }
            return Err(DbError::from(err).into());
        }

        Ok(Invitation {
            id,
            organization_id: input.organization_id,
            email: input.email,
            role: input.role,
            token_hash: input.token_hash,
            invited_by: input.invited_by,
            created_at: now,
            expires_at: input.expires_at,
            accepted_at: None,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> LayrbaseResult<Invitation> {
        let invitation = self
            .find_one(BY_ID, id.to_string())
            .await?
            .ok_or_else(|| DbError::not_found("invitation", id))?;
        Ok(invitation)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> LayrbaseResult<Invitation> {
        Ok(self.find_by_token_hash(token_hash).await?)
    }

    async fn accept(
        &self,
        token_hash: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> LayrbaseResult<AcceptedInvitation> {
        let result = self
            .db
            .query(ACCEPT_INVITATION)
            .bind(("token_hash", token_hash.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("membership_id", Uuid::new_v4().to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        if let Err(err) = result.check() {
            return Err(self
                .classify_accept_failure(token_hash, user_id, now, err)
                .await);
        }

        let invitation = self.find_by_token_hash(token_hash).await?;
        let membership = fetch_membership(&self.db, invitation.organization_id, user_id)
            .await?
            .ok_or_else(|| {
                DbError::not_found(
                    "membership",
                    format!(
                        "organization={}, user={user_id}",
                        invitation.organization_id
                    ),
                )
            })?;

        Ok(AcceptedInvitation {
            invitation,
            membership,
        })
    }

    async fn delete_pending(&self, id: Uuid) -> LayrbaseResult<()> {
        let mut result = self
            .db
            .query(
                "DELETE type::record('invitation', $id) \
                 WHERE accepted_at = NONE RETURN BEFORE",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let deleted: Vec<DeletedRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::not_found("invitation", id).into());
        }
        Ok(())
    }

    async fn list_pending(&self, organization_id: Uuid) -> LayrbaseResult<Vec<Invitation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM invitation \
                 WHERE organization_id = $organization_id AND accepted_at = NONE \
                 ORDER BY created_at ASC",
            )
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvitationRowWithId> = result.take(0).map_err(DbError::from)?;
        let invitations = rows
            .into_iter()
            .map(InvitationRowWithId::try_into_invitation)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(invitations)
    }
}
