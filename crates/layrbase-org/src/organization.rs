//! Organization service: creation, membership listing and removal.

use layrbase_core::error::{LayrbaseError, LayrbaseResult};
use layrbase_core::models::membership::{
    CreateMembership, Membership, Role, can_manage_organization,
};
use layrbase_core::models::organization::{
    CreateOrganization, NewOrganization, Organization, OrganizationMembership, slugify,
};
use layrbase_core::models::user::User;
use layrbase_core::repository::{MembershipRepository, OrganizationRepository};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::OrgError;

/// Organization service.
///
/// Generic over repository implementations so that it has no dependency
/// on a particular store.
pub struct OrganizationService<O: OrganizationRepository, M: MembershipRepository> {
    org_repo: O,
    membership_repo: M,
}

impl<O: OrganizationRepository, M: MembershipRepository> OrganizationService<O, M> {
    pub fn new(org_repo: O, membership_repo: M) -> Self {
        Self {
            org_repo,
            membership_repo,
        }
    }

    /// Create an organization and make `actor` its owner.
    ///
    /// The organization row and the owner membership are two writes. When
    /// the second fails the organization already exists, so the failure is
    /// reported as `PartialFailure` rather than a plain error: retrying
    /// would hit the slug constraint or create a duplicate.
    pub async fn create(
        &self,
        actor: &User,
        input: NewOrganization,
    ) -> LayrbaseResult<Organization> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(OrgError::EmptyName.into());
        }
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(OrgError::UnsluggableName.into());
        }

        let organization = self
            .org_repo
            .create(CreateOrganization {
                name: name.to_string(),
                slug,
                description: non_empty(input.description),
                industry: non_empty(input.industry),
                website: non_empty(input.website),
                created_by: actor.id,
            })
            .await?;

        if let Err(err) = self
            .membership_repo
            .create(CreateMembership {
                organization_id: organization.id,
                user_id: actor.id,
                role: Role::Owner,
            })
            .await
        {
            error!(
                organization_id = %organization.id,
                user_id = %actor.id,
                error = %err,
                "Organization created without owner membership"
            );
            return Err(LayrbaseError::PartialFailure {
                organization_id: organization.id,
                reason: err.to_string(),
            });
        }

        info!(
            organization_id = %organization.id,
            slug = %organization.slug,
            owner = %actor.id,
            "Organization created"
        );

        Ok(Organization {
            member_count: organization.member_count + 1,
            ..organization
        })
    }

    /// Every organization the user belongs to, with the user's role.
    pub async fn list_for_user(&self, user_id: Uuid) -> LayrbaseResult<Vec<OrganizationMembership>> {
        self.membership_repo.list_for_user(user_id).await
    }

    /// Members of an organization. Any member may list them.
    pub async fn list_members(
        &self,
        actor: &User,
        organization_id: Uuid,
    ) -> LayrbaseResult<Vec<Membership>> {
        require_member(&self.membership_repo, actor, organization_id).await?;
        self.membership_repo
            .list_by_organization(organization_id)
            .await
    }

    /// Remove a member. Managers may remove anyone; other members may only
    /// remove themselves. The last owner can never be removed.
    pub async fn remove_member(
        &self,
        actor: &User,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> LayrbaseResult<()> {
        let actor_membership = require_member(&self.membership_repo, actor, organization_id).await?;
        if actor.id != user_id && !can_manage_organization(&actor_membership) {
            return Err(OrgError::NotManager(organization_id).into());
        }

        self.membership_repo.remove(organization_id, user_id).await?;
        info!(
            organization_id = %organization_id,
            user_id = %user_id,
            removed_by = %actor.id,
            "Member removed"
        );
        Ok(())
    }
}

/// The actor's membership, or `AuthorizationDenied` if there is none.
pub(crate) async fn require_member<M: MembershipRepository>(
    membership_repo: &M,
    actor: &User,
    organization_id: Uuid,
) -> LayrbaseResult<Membership> {
    match membership_repo.get(organization_id, actor.id).await {
        Ok(membership) => Ok(membership),
        Err(LayrbaseError::NotFound { .. }) => Err(OrgError::NotMember(organization_id).into()),
        Err(e) => Err(e),
    }
}

/// The actor's membership if it carries management capability.
pub(crate) async fn require_manager<M: MembershipRepository>(
    membership_repo: &M,
    actor: &User,
    organization_id: Uuid,
) -> LayrbaseResult<Membership> {
    let membership = require_member(membership_repo, actor, organization_id).await?;
    if !can_manage_organization(&membership) {
        return Err(OrgError::NotManager(organization_id).into());
    }
    Ok(membership)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
