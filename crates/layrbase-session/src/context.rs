//! Session/organization context: who is signed in and which organization
//! is active.
//!
//! One instance per running client, handed to every consumer explicitly.
//! All mutation of user, membership list and selection goes through the
//! operations here.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use layrbase_core::error::{LayrbaseError, LayrbaseResult};
use layrbase_core::models::invitation::{AcceptedInvitation, InvitationDetails};
use layrbase_core::models::membership::Role;
use layrbase_core::models::organization::{NewOrganization, Organization, OrganizationMembership};
use layrbase_core::models::user::User;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{Backend, IdentityProvider};

/// Top-level session phase, consumed by the gating shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "message", rename_all = "snake_case")]
pub enum SessionPhase {
    Loading,
    /// Identity could not be resolved.
    AuthError(String),
    /// Signed in, but the organization list failed to load. A successful
    /// refresh leaves this phase.
    LoadError(String),
    Unauthenticated,
    NoOrganization,
    Ready,
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub user: Option<User>,
    pub organizations: Vec<OrganizationMembership>,
    pub current: Option<OrganizationMembership>,
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    user: Option<User>,
    organizations: Vec<OrganizationMembership>,
    current: Option<Uuid>,
}

impl SessionState {
    fn loading() -> Self {
        Self {
            phase: SessionPhase::Loading,
            user: None,
            organizations: Vec::new(),
            current: None,
        }
    }

    fn signed_out(phase: SessionPhase) -> Self {
        Self {
            phase,
            ..Self::loading()
        }
    }

    fn contains(&self, organization_id: Uuid) -> bool {
        self.organizations
            .iter()
            .any(|m| m.organization.id == organization_id)
    }

    /// Replace the membership list and repair the selection: keep `prefer`
    /// or the current selection if still listed, else the first entry,
    /// else nothing.
    fn set_organizations(&mut self, organizations: Vec<OrganizationMembership>, prefer: Option<Uuid>) {
        self.organizations = organizations;
        self.current = prefer
            .filter(|id| self.contains(*id))
            .or(self.current.filter(|id| self.contains(*id)))
            .or_else(|| self.organizations.first().map(|m| m.organization.id));
        self.phase = if self.organizations.is_empty() {
            SessionPhase::NoOrganization
        } else {
            SessionPhase::Ready
        };
    }

    fn current_membership(&self) -> Option<&OrganizationMembership> {
        let id = self.current?;
        self.organizations.iter().find(|m| m.organization.id == id)
    }
}

pub struct SessionContext<B: Backend> {
    backend: Arc<B>,
    state: RwLock<SessionState>,
    /// Bumped on every (re)start and sign-out. Results of operations begun
    /// under an older epoch are never applied.
    epoch: AtomicU64,
}

impl<B: Backend> SessionContext<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: RwLock::new(SessionState::loading()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            phase: state.phase.clone(),
            user: state.user.clone(),
            organizations: state.organizations.clone(),
            current: state.current_membership().cloned(),
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn current_organization(&self) -> Option<OrganizationMembership> {
        self.state.read().await.current_membership().cloned()
    }

    /// Whether the user may manage the selected organization.
    pub async fn can_manage_current(&self) -> bool {
        self.current_organization()
            .await
            .is_some_and(|m| m.role.can_manage())
    }

    /// Resolve the signed-in user and load their organizations.
    pub async fn start<P: IdentityProvider>(&self, identity: &P) -> SessionPhase {
        let epoch = {
            let mut state = self.state.write().await;
            *state = SessionState::loading();
            self.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };

        let user = match identity.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.apply(epoch, |s| *s = SessionState::signed_out(SessionPhase::Unauthenticated))
                    .await;
                return self.phase().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to resolve signed-in user");
                self.apply(epoch, |s| {
                    *s = SessionState::signed_out(SessionPhase::AuthError(err.to_string()))
                })
                .await;
                return self.phase().await;
            }
        };

        let listed = self.backend.list_organizations(&user).await;
        self.apply(epoch, |s| {
            s.user = Some(user);
            match listed {
                Ok(organizations) => s.set_organizations(organizations, None),
                Err(err) => {
                    warn!(error = %err, "Failed to load organizations");
                    s.phase = SessionPhase::LoadError(err.to_string());
                }
            }
        })
        .await;

        self.phase().await
    }

    /// Tear the session down. In-flight operations are discarded.
    pub async fn sign_out(&self) {
        let mut state = self.state.write().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *state = SessionState::signed_out(SessionPhase::Unauthenticated);
        info!("Session signed out");
    }

    /// Select an organization from the membership list. Returns `false`
    /// (and changes nothing) when the id is not listed.
    pub async fn set_current_organization(&self, organization_id: Uuid) -> bool {
        let mut state = self.state.write().await;
        if !state.contains(organization_id) {
            debug!(%organization_id, "Ignoring selection of unlisted organization");
            return false;
        }
        state.current = Some(organization_id);
        true
    }

    /// Re-fetch the membership list. On failure nothing changes.
    pub async fn refresh_organizations(&self) -> LayrbaseResult<()> {
        let (epoch, user) = self.signed_in().await?;
        let organizations = self.backend.list_organizations(&user).await?;
        self.apply(epoch, |s| s.set_organizations(organizations, None))
            .await;
        Ok(())
    }

    /// Create an organization owned by the signed-in user and select it.
    pub async fn create_organization(&self, input: NewOrganization) -> LayrbaseResult<Organization> {
        let (epoch, user) = self.signed_in().await?;
        let organization = self.backend.create_organization(&user, input).await?;

        let created = OrganizationMembership {
            organization: organization.clone(),
            role: Role::Owner,
        };
        self.refresh_selecting(epoch, &user, created).await;

        Ok(organization)
    }

    /// Accept the invitation behind `token` as the signed-in user.
    pub async fn join_organization(&self, token: &str) -> LayrbaseResult<AcceptedInvitation> {
        let (epoch, _) = self.signed_in().await?;
        let details = self.backend.invitation_details(token).await?;
        if !self.is_current(epoch) {
            return Err(LayrbaseError::Unauthenticated);
        }
        self.accept_invitation(token, &details).await
    }

    /// Accept an invitation whose details are already on screen.
    ///
    /// Refuses with `EmailMismatch` without contacting the backend when the
    /// invitation was addressed to someone else.
    pub async fn accept_invitation(
        &self,
        token: &str,
        details: &InvitationDetails,
    ) -> LayrbaseResult<AcceptedInvitation> {
        let (epoch, user) = self.signed_in().await?;
        if !user.has_email(&details.email) {
            return Err(LayrbaseError::EmailMismatch {
                invited: details.email.clone(),
                actual: user.email.clone(),
            });
        }

        let accepted = self.backend.accept_invitation(token, &user).await?;

        let joined = OrganizationMembership {
            organization: placeholder_organization(details),
            role: accepted.membership.role,
        };
        self.refresh_selecting(epoch, &user, joined).await;

        Ok(accepted)
    }

    /// Refresh after a successful create/join and select `selected`. When
    /// the refresh itself fails `selected` is added to the list as is.
    async fn refresh_selecting(&self, epoch: u64, user: &User, selected: OrganizationMembership) {
        let selected_id = selected.organization.id;
        match self.backend.list_organizations(user).await {
            Ok(organizations) => {
                self.apply(epoch, |s| s.set_organizations(organizations, Some(selected_id)))
                    .await;
            }
            Err(err) => {
                warn!(error = %err, "Organization refresh failed; using confirmed membership");
                self.apply(epoch, |s| {
                    let mut organizations = s.organizations.clone();
                    if !s.contains(selected_id) {
                        organizations.push(selected);
                    }
                    s.set_organizations(organizations, Some(selected_id));
                })
                .await;
            }
        }
    }

    async fn signed_in(&self) -> LayrbaseResult<(u64, User)> {
        let state = self.state.read().await;
        let user = state.user.clone().ok_or(LayrbaseError::Unauthenticated)?;
        Ok((self.epoch.load(Ordering::SeqCst), user))
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Apply `update` unless the session moved on since `epoch`.
    async fn apply(&self, epoch: u64, update: impl FnOnce(&mut SessionState)) -> bool {
        let mut state = self.state.write().await;
        if !self.is_current(epoch) {
            debug!(epoch, "Discarding stale session result");
            return false;
        }
        update(&mut state);
        true
    }
}

/// Organization record rebuilt from invitation details, for when the
/// post-accept refresh fails.
fn placeholder_organization(details: &InvitationDetails) -> Organization {
    let now = Utc::now();
    Organization {
        id: details.organization_id,
        name: details.organization_name.clone(),
        slug: layrbase_core::slugify(&details.organization_name),
        description: None,
        industry: None,
        website: None,
        member_count: 0,
        created_by: Uuid::nil(),
        created_at: now,
        updated_at: now,
    }
}
