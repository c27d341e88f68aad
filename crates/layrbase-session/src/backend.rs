//! The client's view of its collaborators.
//!
//! [`Backend`] is the narrow set of calls the session layer makes;
//! [`IdentityProvider`] answers "who is signed in". Both report failures
//! as [`LayrbaseError`] kinds only.
//!
//! [`LayrbaseError`]: layrbase_core::error::LayrbaseError

use layrbase_core::error::LayrbaseResult;
use layrbase_core::models::invitation::{AcceptedInvitation, InvitationDetails};
use layrbase_core::models::organization::{NewOrganization, Organization, OrganizationMembership};
use layrbase_core::models::user::User;
use layrbase_core::repository::{
    InvitationRepository, MembershipRepository, OrganizationRepository, UserRepository,
};
use layrbase_org::invitation::InvitationService;
use layrbase_org::notify::Notifier;
use layrbase_org::organization::OrganizationService;

pub trait Backend: Send + Sync {
    fn create_organization(
        &self,
        user: &User,
        input: NewOrganization,
    ) -> impl Future<Output = LayrbaseResult<Organization>> + Send;

    fn list_organizations(
        &self,
        user: &User,
    ) -> impl Future<Output = LayrbaseResult<Vec<OrganizationMembership>>> + Send;

    /// Public lookup; no user required.
    fn invitation_details(
        &self,
        token: &str,
    ) -> impl Future<Output = LayrbaseResult<InvitationDetails>> + Send;

    fn accept_invitation(
        &self,
        token: &str,
        user: &User,
    ) -> impl Future<Output = LayrbaseResult<AcceptedInvitation>> + Send;
}

pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when nobody is signed in.
    fn current_user(&self) -> impl Future<Output = LayrbaseResult<Option<User>>> + Send;
}

/// [`Backend`] backed directly by the organization and invitation
/// services.
pub struct ServiceBackend<O, M, I, U, N>
where
    O: OrganizationRepository,
    M: MembershipRepository,
    I: InvitationRepository,
    U: UserRepository,
    N: Notifier,
{
    organizations: OrganizationService<O, M>,
    invitations: InvitationService<O, M, I, U, N>,
}

impl<O, M, I, U, N> ServiceBackend<O, M, I, U, N>
where
    O: OrganizationRepository,
    M: MembershipRepository,
    I: InvitationRepository,
    U: UserRepository,
    N: Notifier,
{
    pub fn new(
        organizations: OrganizationService<O, M>,
        invitations: InvitationService<O, M, I, U, N>,
    ) -> Self {
        Self {
            organizations,
            invitations,
        }
    }

    /// Management calls (members, removal) for organization panels.
    pub fn organizations(&self) -> &OrganizationService<O, M> {
        &self.organizations
    }

    /// Management calls (issue, cancel, list pending) for organization
    /// panels.
    pub fn invitations(&self) -> &InvitationService<O, M, I, U, N> {
        &self.invitations
    }
}

impl<O, M, I, U, N> Backend for ServiceBackend<O, M, I, U, N>
where
    O: OrganizationRepository,
    M: MembershipRepository,
    I: InvitationRepository,
    U: UserRepository,
    N: Notifier,
{
    async fn create_organization(
        &self,
        user: &User,
        input: NewOrganization,
    ) -> LayrbaseResult<Organization> {
        self.organizations.create(user, input).await
    }

    async fn list_organizations(&self, user: &User) -> LayrbaseResult<Vec<OrganizationMembership>> {
        self.organizations.list_for_user(user.id).await
    }

    async fn invitation_details(&self, token: &str) -> LayrbaseResult<InvitationDetails> {
        self.invitations.details(token).await
    }

    async fn accept_invitation(
        &self,
        token: &str,
        user: &User,
    ) -> LayrbaseResult<AcceptedInvitation> {
        self.invitations.accept(token, user).await
    }
}
