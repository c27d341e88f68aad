//! Invitation service: issuance, public lookup, acceptance and
//! cancellation of organization invitations.

use chrono::{DateTime, Duration, Utc};
use layrbase_core::error::{LayrbaseError, LayrbaseResult};
use layrbase_core::models::invitation::{
    AcceptedInvitation, CreateInvitation, Invitation, InvitationDetails, InvitationStatus,
};
use layrbase_core::models::membership::Role;
use layrbase_core::models::user::{User, validate_email};
use layrbase_core::repository::{
    InvitationRepository, MembershipRepository, OrganizationRepository, UserRepository,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::OrgConfig;
use crate::error::OrgError;
use crate::notify::{InvitationNotice, Notifier};
use crate::organization::require_manager;
use crate::token;

/// Shown in place of an inviter whose account no longer resolves.
const UNKNOWN_INVITER: &str = "A Layrbase user";

/// Whether the invitation email went out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum NotificationOutcome {
    Sent,
    Failed(String),
}

/// Successful issuance.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedInvitation {
    pub invitation: Invitation,
    /// Raw token (return to the issuer, not stored).
    pub token: String,
    /// Join link; the fallback delivery path when the email fails.
    pub accept_url: String,
    pub notification: NotificationOutcome,
}

/// Invitation lifecycle service.
///
/// Generic over repository and notifier implementations so that it has no
/// dependency on a particular store or email provider.
pub struct InvitationService<O, M, I, U, N>
where
    O: OrganizationRepository,
    M: MembershipRepository,
    I: InvitationRepository,
    U: UserRepository,
    N: Notifier,
{
    org_repo: O,
    membership_repo: M,
    invitation_repo: I,
    user_repo: U,
    notifier: N,
    config: OrgConfig,
}

impl<O, M, I, U, N> InvitationService<O, M, I, U, N>
where
    O: OrganizationRepository,
    M: MembershipRepository,
    I: InvitationRepository,
    U: UserRepository,
    N: Notifier,
{
    pub fn new(
        org_repo: O,
        membership_repo: M,
        invitation_repo: I,
        user_repo: U,
        notifier: N,
        config: OrgConfig,
    ) -> Self {
        Self {
            org_repo,
            membership_repo,
            invitation_repo,
            user_repo,
            notifier,
            config,
        }
    }

    /// Issue an invitation for `email` to join `organization_id` as `role`.
    ///
    /// A failed notification is logged and reported in the result; the
    /// invitation is kept either way.
    pub async fn issue(
        &self,
        actor: &User,
        organization_id: Uuid,
        email: &str,
        role: Role,
    ) -> LayrbaseResult<IssuedInvitation> {
        // 1. Validate input and authorize.
        let email = validate_email(email)?;
        let actor_membership =
            require_manager(&self.membership_repo, actor, organization_id).await?;
        if role == Role::Owner && actor_membership.role != Role::Owner {
            return Err(OrgError::OwnerInviteRequiresOwner.into());
        }

        let organization = self.org_repo.get_by_id(organization_id).await?;

        // 2. Refuse invitations for people who already belong.
        let existing_user = match self.user_repo.get_by_email(&email).await {
            Ok(user) => Some(user),
            Err(LayrbaseError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        if let Some(existing) = existing_user {
            match self.membership_repo.get(organization_id, existing.id).await {
                Ok(_) => return Err(OrgError::AlreadyMember(email.clone()).into()),
                Err(LayrbaseError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        // 3. Generate the token and persist its hash.
        let raw_token = token::generate_invitation_token();
        let expires_at = Utc::now() + Duration::seconds(self.config.invitation_lifetime_secs);
        let invitation = self
            .invitation_repo
            .create(CreateInvitation {
                organization_id,
                email: email.clone(),
                role,
                token_hash: token::hash_invitation_token(&raw_token),
                invited_by: actor.id,
                expires_at,
            })
            .await?;

        info!(
            invitation_id = %invitation.id,
            organization_id = %organization_id,
            role = %role,
            invited_by = %actor.id,
            "Invitation issued"
        );

        // 4. Notify. Never rolls back the invitation.
        let accept_url = self.config.accept_url(&raw_token);
        let notice = InvitationNotice {
            to: email,
            organization_name: organization.name,
            inviter_name: actor.display_label().to_string(),
            inviter_email: actor.email.clone(),
            role,
            accept_url: accept_url.clone(),
            expires_at,
        };
        let notification = match self.notifier.send(&notice).await {
            Ok(()) => NotificationOutcome::Sent,
            Err(err) => {
                warn!(
                    invitation_id = %invitation.id,
                    error = %err,
                    "Invitation email failed; share the accept link instead"
                );
                NotificationOutcome::Failed(err.to_string())
            }
        };

        Ok(IssuedInvitation {
            invitation,
            token: raw_token,
            accept_url,
            notification,
        })
    }

    /// Public view of the invitation behind `raw_token`.
    ///
    /// Unknown tokens are `NotFound`. Expired and accepted invitations are
    /// returned with `is_valid = false`.
    pub async fn details(&self, raw_token: &str) -> LayrbaseResult<InvitationDetails> {
        let invitation = self.lookup(raw_token).await?;
        let organization = self.org_repo.get_by_id(invitation.organization_id).await?;

        let inviter_name = match self.user_repo.get_by_id(invitation.invited_by).await {
            Ok(inviter) => inviter.display_label().to_string(),
            Err(LayrbaseError::NotFound { .. }) => UNKNOWN_INVITER.to_string(),
            Err(e) => return Err(e),
        };

        Ok(InvitationDetails {
            invitation_id: invitation.id,
            organization_id: organization.id,
            organization_name: organization.name,
            email: invitation.email.clone(),
            role: invitation.role,
            inviter_name,
            expires_at: invitation.expires_at,
            is_valid: invitation.is_valid_at(Utc::now()),
        })
    }

    /// Accept the invitation behind `raw_token` on behalf of `user`.
    ///
    /// The store performs the accept-and-join atomically; a caller that
    /// loses a race for the same token receives
    /// `InvitationAlreadyAccepted`.
    pub async fn accept(&self, raw_token: &str, user: &User) -> LayrbaseResult<AcceptedInvitation> {
        let token_hash = token::hash_invitation_token(raw_token);
        let invitation = self.invitation_repo.get_by_token_hash(&token_hash).await?;
        let now = Utc::now();

        check_acceptable(&invitation, user, now)?;

        let accepted = self
            .invitation_repo
            .accept(&token_hash, user.id, now)
            .await?;

        info!(
            invitation_id = %accepted.invitation.id,
            organization_id = %accepted.membership.organization_id,
            user_id = %user.id,
            role = %accepted.membership.role,
            "Invitation accepted"
        );

        Ok(accepted)
    }

    /// Delete a pending invitation.
    pub async fn cancel(&self, actor: &User, invitation_id: Uuid) -> LayrbaseResult<()> {
        let invitation = self.invitation_repo.get_by_id(invitation_id).await?;
        require_manager(&self.membership_repo, actor, invitation.organization_id).await?;
        if invitation.accepted_at.is_some() {
            return Err(LayrbaseError::not_found("invitation", invitation_id));
        }

        self.invitation_repo.delete_pending(invitation_id).await?;
        info!(
            invitation_id = %invitation_id,
            cancelled_by = %actor.id,
            "Invitation cancelled"
        );
        Ok(())
    }

    /// Every invitation of the organization not yet accepted, expired ones
    /// included.
    pub async fn list_pending(
        &self,
        actor: &User,
        organization_id: Uuid,
    ) -> LayrbaseResult<Vec<Invitation>> {
        require_manager(&self.membership_repo, actor, organization_id).await?;
        self.invitation_repo.list_pending(organization_id).await
    }

    async fn lookup(&self, raw_token: &str) -> LayrbaseResult<Invitation> {
        let token_hash = token::hash_invitation_token(raw_token);
        self.invitation_repo.get_by_token_hash(&token_hash).await
    }
}

fn check_acceptable(invitation: &Invitation, user: &User, now: DateTime<Utc>) -> LayrbaseResult<()> {
    match invitation.status_at(now) {
        InvitationStatus::Pending => {}
        InvitationStatus::Accepted => return Err(LayrbaseError::InvitationAlreadyAccepted),
        InvitationStatus::Expired => return Err(LayrbaseError::InvitationExpired),
    }
    if !user.has_email(&invitation.email) {
        return Err(LayrbaseError::EmailMismatch {
            invited: invitation.email.clone(),
            actual: user.email.clone(),
        });
    }
    Ok(())
}
