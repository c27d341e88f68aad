//! Integration tests for the invitation lifecycle service.

use std::sync::{Arc, Mutex};

use layrbase_core::error::LayrbaseError;
use layrbase_core::models::membership::Role;
use layrbase_core::models::organization::{NewOrganization, Organization};
use layrbase_core::models::user::{CreateUser, User};
use layrbase_core::repository::{MembershipRepository, UserRepository};
use layrbase_db::repository::{
    SurrealInvitationRepository, SurrealMembershipRepository, SurrealOrganizationRepository,
    SurrealUserRepository,
};
use layrbase_db::{Db, DbConfig, DbManager};
use layrbase_org::config::OrgConfig;
use layrbase_org::invitation::{InvitationService, NotificationOutcome};
use layrbase_org::notify::{InvitationNotice, Notifier, NotifyError};
use layrbase_org::organization::OrganizationService;
use layrbase_org::token;

/// Records every notice; optionally fails each send.
#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<InvitationNotice>>>,
    fail: bool,
}

impl Notifier for RecordingNotifier {
    async fn send(&self, notice: &InvitationNotice) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notice.clone());
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 503,
                body: "mail provider down".into(),
            });
        }
        Ok(())
    }
}

type Invitations = InvitationService<
    SurrealOrganizationRepository<Db>,
    SurrealMembershipRepository<Db>,
    SurrealInvitationRepository<Db>,
    SurrealUserRepository<Db>,
    RecordingNotifier,
>;

struct Fixture {
    invitations: Invitations,
    orgs: OrganizationService<SurrealOrganizationRepository<Db>, SurrealMembershipRepository<Db>>,
    users: SurrealUserRepository<Db>,
    memberships: SurrealMembershipRepository<Db>,
    notifier: RecordingNotifier,
    alice: User,
    org: Organization,
}

impl Fixture {
    async fn user(&self, email: &str, name: &str) -> User {
        self.users
            .create(CreateUser {
                email: email.into(),
                display_name: Some(name.into()),
            })
            .await
            .unwrap()
    }

    /// Create `email` and make them a member of the fixture organization.
    async fn member(&self, email: &str, role: Role) -> User {
        let user = self.user(email, email).await;
        let issued = self
            .invitations
            .issue(&self.alice, self.org.id, email, role)
            .await
            .unwrap();
        self.invitations.accept(&issued.token, &user).await.unwrap();
        user
    }
}

/// Spin up an in-memory store with Alice owning "Acme Corp".
async fn setup_with(config: OrgConfig, notifier: RecordingNotifier) -> Fixture {
    let manager = DbManager::connect(&DbConfig::default()).await.unwrap();
    let db = manager.client();
    let users = SurrealUserRepository::new(db.clone());
    let memberships = SurrealMembershipRepository::new(db.clone());

    let orgs = OrganizationService::new(
        SurrealOrganizationRepository::new(db.clone()),
        memberships.clone(),
    );
    let invitations = InvitationService::new(
        SurrealOrganizationRepository::new(db.clone()),
        memberships.clone(),
        SurrealInvitationRepository::new(db.clone()),
        users.clone(),
        notifier.clone(),
        config,
    );

    let alice = users
        .create(CreateUser {
            email: "alice@example.com".into(),
            display_name: Some("Alice".into()),
        })
        .await
        .unwrap();
    let org = orgs
        .create(&alice, NewOrganization::named("Acme Corp"))
        .await
        .unwrap();

    Fixture {
        invitations,
        orgs,
        users,
        memberships,
        notifier,
        alice,
        org,
    }
}

async fn setup() -> Fixture {
    setup_with(OrgConfig::default(), RecordingNotifier::default()).await
}

#[tokio::test]
async fn end_to_end_issue_view_accept() {
    let fx = setup().await;

    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    assert_eq!(issued.invitation.email, "bob@example.com");
    assert_eq!(issued.invitation.role, Role::Member);
    assert_eq!(issued.notification, NotificationOutcome::Sent);
    assert!(issued.accept_url.ends_with(&format!("/join/{}", issued.token)));

    // Unauthenticated visit to the join route.
    let details = fx.invitations.details(&issued.token).await.unwrap();
    assert_eq!(details.organization_name, "Acme Corp");
    assert_eq!(details.role, Role::Member);
    assert_eq!(details.inviter_name, "Alice");
    assert!(details.is_valid);

    // Bob signs in and accepts.
    let bob = fx.user("bob@example.com", "Bob").await;
    let accepted = fx.invitations.accept(&issued.token, &bob).await.unwrap();
    assert_eq!(accepted.membership.user_id, bob.id);
    assert_eq!(accepted.membership.organization_id, fx.org.id);
    assert_eq!(accepted.membership.role, Role::Member);

    let details = fx.invitations.details(&issued.token).await.unwrap();
    assert!(!details.is_valid);

    let bobs_orgs = fx.orgs.list_for_user(bob.id).await.unwrap();
    assert_eq!(bobs_orgs.len(), 1);
    assert_eq!(bobs_orgs[0].organization.id, fx.org.id);
    assert_eq!(bobs_orgs[0].organization.member_count, 2);
}

#[tokio::test]
async fn token_is_stored_only_as_hash() {
    let fx = setup().await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Viewer)
        .await
        .unwrap();

    assert_ne!(issued.invitation.token_hash, issued.token);
    assert_eq!(
        issued.invitation.token_hash,
        token::hash_invitation_token(&issued.token)
    );
    assert!(!issued.token.contains("bob"));
}

#[tokio::test]
async fn second_accept_fails_without_second_membership() {
    let fx = setup().await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    let bob = fx.user("bob@example.com", "Bob").await;

    fx.invitations.accept(&issued.token, &bob).await.unwrap();
    let again = fx.invitations.accept(&issued.token, &bob).await;
    assert_eq!(again.unwrap_err(), LayrbaseError::InvitationAlreadyAccepted);

    let members = fx.memberships.list_by_organization(fx.org.id).await.unwrap();
    assert_eq!(members.iter().filter(|m| m.user_id == bob.id).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_accepts_have_one_winner() {
    let fx = setup().await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    let bob = fx.user("bob@example.com", "Bob").await;
    let invitations = Arc::new(fx.invitations);

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let invitations = Arc::clone(&invitations);
            let token = issued.token.clone();
            let bob = bob.clone();
            tokio::spawn(async move { invitations.accept(&token, &bob).await })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == LayrbaseError::InvitationAlreadyAccepted)
    );
    let members = fx.memberships.list_by_organization(fx.org.id).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn expired_invitation_is_invalid_and_rejected() {
    let config = OrgConfig {
        invitation_lifetime_secs: 0,
        ..Default::default()
    };
    let fx = setup_with(config, RecordingNotifier::default()).await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();

    let details = fx.invitations.details(&issued.token).await.unwrap();
    assert!(!details.is_valid);

    let bob = fx.user("bob@example.com", "Bob").await;
    let result = fx.invitations.accept(&issued.token, &bob).await;
    assert_eq!(result.unwrap_err(), LayrbaseError::InvitationExpired);
    assert!(fx.orgs.list_for_user(bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let fx = setup().await;
    let bogus = token::generate_invitation_token();

    let details = fx.invitations.details(&bogus).await;
    assert!(matches!(details, Err(LayrbaseError::NotFound { .. })));

    let bob = fx.user("bob@example.com", "Bob").await;
    let accept = fx.invitations.accept(&bogus, &bob).await;
    assert!(matches!(accept, Err(LayrbaseError::NotFound { .. })));
}

#[tokio::test]
async fn email_mismatch_is_refused() {
    let fx = setup().await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    let carol = fx.user("carol@example.com", "Carol").await;

    let result = fx.invitations.accept(&issued.token, &carol).await;
    assert_eq!(
        result.unwrap_err(),
        LayrbaseError::EmailMismatch {
            invited: "bob@example.com".into(),
            actual: "carol@example.com".into(),
        }
    );
    assert!(fx.invitations.details(&issued.token).await.unwrap().is_valid);
}

#[tokio::test]
async fn email_match_ignores_case() {
    let fx = setup().await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "Bob@Example.com", Role::Member)
        .await
        .unwrap();
    assert_eq!(issued.invitation.email, "bob@example.com");

    let bob = fx.user("BOB@example.com", "Bob").await;
    fx.invitations.accept(&issued.token, &bob).await.unwrap();
}

#[tokio::test]
async fn only_managers_issue_invitations() {
    let fx = setup().await;
    let member = fx.member("mia@example.com", Role::Member).await;
    let outsider = fx.user("otto@example.com", "Otto").await;

    let by_member = fx
        .invitations
        .issue(&member, fx.org.id, "bob@example.com", Role::Viewer)
        .await;
    assert!(matches!(
        by_member,
        Err(LayrbaseError::AuthorizationDenied { .. })
    ));

    let by_outsider = fx
        .invitations
        .issue(&outsider, fx.org.id, "bob@example.com", Role::Viewer)
        .await;
    assert!(matches!(
        by_outsider,
        Err(LayrbaseError::AuthorizationDenied { .. })
    ));

    let admin = fx.member("adam@example.com", Role::Admin).await;
    fx.invitations
        .issue(&admin, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
}

#[tokio::test]
async fn only_owners_invite_owners() {
    let fx = setup().await;
    let admin = fx.member("adam@example.com", Role::Admin).await;

    let by_admin = fx
        .invitations
        .issue(&admin, fx.org.id, "bob@example.com", Role::Owner)
        .await;
    assert!(matches!(
        by_admin,
        Err(LayrbaseError::AuthorizationDenied { .. })
    ));

    fx.invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Owner)
        .await
        .unwrap();
}

#[tokio::test]
async fn malformed_email_is_a_validation_error() {
    let fx = setup().await;
    let result = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "not-an-email", Role::Member)
        .await;
    assert!(matches!(result, Err(LayrbaseError::Validation { .. })));
    assert!(fx.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn existing_member_cannot_be_invited() {
    let fx = setup().await;
    let result = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "alice@example.com", Role::Admin)
        .await;
    assert_eq!(
        result.unwrap_err(),
        LayrbaseError::AlreadyExists {
            entity: "membership".into()
        }
    );
}

#[tokio::test]
async fn notice_carries_accept_link_and_inviter() {
    let fx = setup().await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Admin)
        .await
        .unwrap();

    let sent = fx.notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    let notice = &sent[0];
    assert_eq!(notice.to, "bob@example.com");
    assert_eq!(notice.organization_name, "Acme Corp");
    assert_eq!(notice.inviter_name, "Alice");
    assert_eq!(notice.inviter_email, "alice@example.com");
    assert_eq!(notice.role, Role::Admin);
    assert_eq!(notice.accept_url, issued.accept_url);
    assert_eq!(notice.expires_at, issued.invitation.expires_at);
}

#[tokio::test]
async fn failed_notification_keeps_invitation() {
    let notifier = RecordingNotifier {
        fail: true,
        ..Default::default()
    };
    let fx = setup_with(OrgConfig::default(), notifier).await;

    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    assert!(matches!(
        issued.notification,
        NotificationOutcome::Failed(ref reason) if reason.contains("503")
    ));

    // Still shareable through the link.
    let details = fx.invitations.details(&issued.token).await.unwrap();
    assert!(details.is_valid);
    let bob = fx.user("bob@example.com", "Bob").await;
    fx.invitations.accept(&issued.token, &bob).await.unwrap();
}

#[tokio::test]
async fn cancel_pending_invitation() {
    let fx = setup().await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();

    fx.invitations
        .cancel(&fx.alice, issued.invitation.id)
        .await
        .unwrap();

    let details = fx.invitations.details(&issued.token).await;
    assert!(matches!(details, Err(LayrbaseError::NotFound { .. })));
    let again = fx.invitations.cancel(&fx.alice, issued.invitation.id).await;
    assert!(matches!(again, Err(LayrbaseError::NotFound { .. })));
}

#[tokio::test]
async fn cancel_accepted_invitation_is_not_found() {
    let fx = setup().await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    let bob = fx.user("bob@example.com", "Bob").await;
    fx.invitations.accept(&issued.token, &bob).await.unwrap();

    let result = fx.invitations.cancel(&fx.alice, issued.invitation.id).await;
    assert!(matches!(result, Err(LayrbaseError::NotFound { .. })));
}

#[tokio::test]
async fn outsiders_are_denied_whatever_the_invitation_state() {
    let fx = setup().await;
    let accepted = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    let pending = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "carol@example.com", Role::Member)
        .await
        .unwrap();
    let bob = fx.user("bob@example.com", "Bob").await;
    fx.invitations.accept(&accepted.token, &bob).await.unwrap();
    let mallory = fx.user("mallory@example.com", "Mallory").await;

    for id in [accepted.invitation.id, pending.invitation.id] {
        let result = fx.invitations.cancel(&mallory, id).await;
        assert!(
            matches!(result, Err(LayrbaseError::AuthorizationDenied { .. })),
            "{result:?}"
        );
    }
}

#[tokio::test]
async fn members_cannot_cancel_or_list() {
    let fx = setup().await;
    let issued = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    let viewer = fx.member("vic@example.com", Role::Viewer).await;

    let cancel = fx.invitations.cancel(&viewer, issued.invitation.id).await;
    assert!(matches!(cancel, Err(LayrbaseError::AuthorizationDenied { .. })));
    let list = fx.invitations.list_pending(&viewer, fx.org.id).await;
    assert!(matches!(list, Err(LayrbaseError::AuthorizationDenied { .. })));
}

#[tokio::test]
async fn pending_list_includes_expired() {
    let config = OrgConfig {
        invitation_lifetime_secs: 0,
        ..Default::default()
    };
    let fx = setup_with(config, RecordingNotifier::default()).await;

    let expired = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "old@example.com", Role::Member)
        .await
        .unwrap();

    let pending = fx.invitations.list_pending(&fx.alice, fx.org.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, expired.invitation.id);
}

#[tokio::test]
async fn pending_list_excludes_accepted() {
    let fx = setup().await;
    let waiting = fx
        .invitations
        .issue(&fx.alice, fx.org.id, "wes@example.com", Role::Viewer)
        .await
        .unwrap();
    fx.member("mia@example.com", Role::Member).await;

    let pending = fx.invitations.list_pending(&fx.alice, fx.org.id).await.unwrap();
    let ids: Vec<_> = pending.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![waiting.invitation.id]);
}
