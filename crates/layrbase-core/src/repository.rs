//! Repository trait definitions for data access abstraction.
//!
//! These traits are the contract with the backend collaborator. All
//! operations are async and report failures as [`LayrbaseError`] kinds;
//! implementations must not leak their own error shapes.
//!
//! [`LayrbaseError`]: crate::error::LayrbaseError

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LayrbaseResult;
use crate::models::{
    invitation::{AcceptedInvitation, CreateInvitation, Invitation},
    membership::{CreateMembership, Membership},
    organization::{CreateOrganization, Organization, OrganizationMembership},
    user::{CreateUser, User},
};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = LayrbaseResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LayrbaseResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = LayrbaseResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// Organizations & memberships
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the slug is taken; nothing is written
    /// in that case.
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = LayrbaseResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LayrbaseResult<Organization>> + Send;
    fn get_by_slug(&self, slug: &str)
    -> impl Future<Output = LayrbaseResult<Organization>> + Send;
}

pub trait MembershipRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the user is already a member.
    fn create(
        &self,
        input: CreateMembership,
    ) -> impl Future<Output = LayrbaseResult<Membership>> + Send;
    fn get(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = LayrbaseResult<Membership>> + Send;

    /// Remove a membership as one unit with the owner check.
    ///
    /// Fails with `NotFound` when there is no such membership and with
    /// `Validation` when the membership is the organization's only owner.
    /// Concurrent removals are serialized per organization, so two owners
    /// removing each other cannot leave it ownerless.
    fn remove(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = LayrbaseResult<()>> + Send;
    fn list_by_organization(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = LayrbaseResult<Vec<Membership>>> + Send;

    /// All organizations the user belongs to, in the order they were joined.
    fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = LayrbaseResult<Vec<OrganizationMembership>>> + Send;
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

pub trait InvitationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateInvitation,
    ) -> impl Future<Output = LayrbaseResult<Invitation>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LayrbaseResult<Invitation>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = LayrbaseResult<Invitation>> + Send;

    /// Mark the invitation accepted and create the membership as one unit.
    ///
    /// Implementations re-check validity atomically: of any number of
    /// concurrent callers at most one succeeds; the rest receive
    /// `InvitationAlreadyAccepted`. An expired invitation yields
    /// `InvitationExpired`, an existing membership `AlreadyExists`; neither
    /// leaves anything written.
    fn accept(
        &self,
        token_hash: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = LayrbaseResult<AcceptedInvitation>> + Send;

    /// Delete a pending invitation. Accepted or missing invitations yield
    /// `NotFound`.
    fn delete_pending(&self, id: Uuid) -> impl Future<Output = LayrbaseResult<()>> + Send;

    /// Every invitation of the organization that has not been accepted,
    /// expired ones included, oldest first.
    fn list_pending(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = LayrbaseResult<Vec<Invitation>>> + Send;
}
