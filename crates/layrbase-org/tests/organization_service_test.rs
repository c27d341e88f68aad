//! Integration tests for organization creation and membership management.

use layrbase_core::error::{LayrbaseError, LayrbaseResult};
use layrbase_core::models::membership::{CreateMembership, Membership, Role};
use layrbase_core::models::organization::{NewOrganization, OrganizationMembership};
use layrbase_core::models::user::{CreateUser, User};
use layrbase_core::repository::{MembershipRepository, OrganizationRepository, UserRepository};
use layrbase_db::repository::{
    SurrealMembershipRepository, SurrealOrganizationRepository, SurrealUserRepository,
};
use layrbase_db::{Db, DbConfig, DbManager};
use layrbase_org::organization::OrganizationService;
use uuid::Uuid;

/// Helper: fresh store, service and a signed-up user.
async fn setup() -> (
    OrganizationService<SurrealOrganizationRepository<Db>, SurrealMembershipRepository<Db>>,
    DbManager,
    User,
) {
    let db = store().await;
    let service = OrganizationService::new(
        SurrealOrganizationRepository::new(db.client().clone()),
        SurrealMembershipRepository::new(db.client().clone()),
    );
    let alice = create_user(&db, "alice@example.com").await;
    (service, db, alice)
}

async fn store() -> DbManager {
    DbManager::connect(&DbConfig::default()).await.unwrap()
}

async fn create_user(db: &DbManager, email: &str) -> User {
    SurrealUserRepository::new(db.client().clone())
        .create(CreateUser {
            email: email.into(),
            display_name: None,
        })
        .await
        .unwrap()
}

async fn add_member(db: &DbManager, organization_id: Uuid, user: &User, role: Role) {
    SurrealMembershipRepository::new(db.client().clone())
        .create(CreateMembership {
            organization_id,
            user_id: user.id,
            role,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn create_makes_creator_owner() {
    let (service, _db, alice) = setup().await;

    let org = service
        .create(
            &alice,
            NewOrganization {
                name: "  Acme Corp!! ".into(),
                description: Some("Rockets".into()),
                industry: Some("  ".into()),
                website: Some("https://acme.example".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(org.name, "Acme Corp!!");
    assert_eq!(org.slug, "acme-corp");
    assert_eq!(org.description.as_deref(), Some("Rockets"));
    assert_eq!(org.industry, None);
    assert_eq!(org.member_count, 1);
    assert_eq!(org.created_by, alice.id);

    let listed = service.list_for_user(alice.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].role, Role::Owner);
    assert_eq!(listed[0].organization.id, org.id);
}

#[tokio::test]
async fn blank_or_symbol_names_are_rejected() {
    let (service, _db, alice) = setup().await;

    for name in ["", "   ", "!!!"] {
        let result = service.create(&alice, NewOrganization::named(name)).await;
        assert!(
            matches!(result, Err(LayrbaseError::Validation { .. })),
            "{name:?}"
        );
    }
    assert!(service.list_for_user(alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn slug_collision_creates_nothing() {
    let (service, db, alice) = setup().await;
    let bob = create_user(&db, "bob@example.com").await;

    service
        .create(&alice, NewOrganization::named("Acme Corp"))
        .await
        .unwrap();
    let clash = service
        .create(&bob, NewOrganization::named("acme  CORP"))
        .await;

    assert!(matches!(clash, Err(LayrbaseError::AlreadyExists { .. })));
    assert!(service.list_for_user(bob.id).await.unwrap().is_empty());
}

/// Membership repository whose inserts always fail.
struct BrokenMemberships(SurrealMembershipRepository<Db>);

impl MembershipRepository for BrokenMemberships {
    async fn create(&self, _input: CreateMembership) -> LayrbaseResult<Membership> {
        Err(LayrbaseError::Backend("connection reset".into()))
    }

    async fn get(&self, organization_id: Uuid, user_id: Uuid) -> LayrbaseResult<Membership> {
        self.0.get(organization_id, user_id).await
    }

    async fn remove(&self, organization_id: Uuid, user_id: Uuid) -> LayrbaseResult<()> {
        self.0.remove(organization_id, user_id).await
    }

    async fn list_by_organization(&self, organization_id: Uuid) -> LayrbaseResult<Vec<Membership>> {
        self.0.list_by_organization(organization_id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> LayrbaseResult<Vec<OrganizationMembership>> {
        self.0.list_for_user(user_id).await
    }
}

#[tokio::test]
async fn failed_owner_membership_is_partial_failure() {
    let db = store().await;
    let alice = create_user(&db, "alice@example.com").await;
    let service = OrganizationService::new(
        SurrealOrganizationRepository::new(db.client().clone()),
        BrokenMemberships(SurrealMembershipRepository::new(db.client().clone())),
    );

    let err = service
        .create(&alice, NewOrganization::named("Half Made"))
        .await
        .unwrap_err();

    let LayrbaseError::PartialFailure {
        organization_id,
        reason,
    } = err
    else {
        panic!("expected PartialFailure, got {err:?}");
    };
    assert!(reason.contains("connection reset"));

    // The organization row exists; the owner membership does not.
    let org = SurrealOrganizationRepository::new(db.client().clone())
        .get_by_id(organization_id)
        .await
        .unwrap();
    assert_eq!(org.slug, "half-made");
    assert_eq!(org.member_count, 0);
}

#[tokio::test]
async fn managers_remove_members() {
    let (service, db, alice) = setup().await;
    let org = service
        .create(&alice, NewOrganization::named("Acme"))
        .await
        .unwrap();
    let bob = create_user(&db, "bob@example.com").await;
    add_member(&db, org.id, &bob, Role::Member).await;

    service.remove_member(&alice, org.id, bob.id).await.unwrap();
    let members = service.list_members(&alice, org.id).await.unwrap();
    assert_eq!(members.len(), 1);

    let missing = service.remove_member(&alice, org.id, bob.id).await;
    assert!(matches!(missing, Err(LayrbaseError::NotFound { .. })));
}

#[tokio::test]
async fn members_only_remove_themselves() {
    let (service, db, alice) = setup().await;
    let org = service
        .create(&alice, NewOrganization::named("Acme"))
        .await
        .unwrap();
    let bob = create_user(&db, "bob@example.com").await;
    let carol = create_user(&db, "carol@example.com").await;
    add_member(&db, org.id, &bob, Role::Member).await;
    add_member(&db, org.id, &carol, Role::Viewer).await;

    let denied = service.remove_member(&bob, org.id, carol.id).await;
    assert!(matches!(denied, Err(LayrbaseError::AuthorizationDenied { .. })));

    service.remove_member(&bob, org.id, bob.id).await.unwrap();
    assert!(service.list_for_user(bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn last_owner_cannot_be_removed() {
    let (service, db, alice) = setup().await;
    let org = service
        .create(&alice, NewOrganization::named("Acme"))
        .await
        .unwrap();

    let result = service.remove_member(&alice, org.id, alice.id).await;
    assert!(matches!(result, Err(LayrbaseError::Validation { .. })));

    // With a second owner the first may leave.
    let bob = create_user(&db, "bob@example.com").await;
    add_member(&db, org.id, &bob, Role::Owner).await;
    service.remove_member(&alice, org.id, alice.id).await.unwrap();

    let members = service.list_members(&bob, org.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, bob.id);
}

#[tokio::test]
async fn owners_leaving_together_keep_one_owner() {
    let (service, db, alice) = setup().await;
    let org = service
        .create(&alice, NewOrganization::named("Acme"))
        .await
        .unwrap();
    let bob = create_user(&db, "bob@example.com").await;
    add_member(&db, org.id, &bob, Role::Owner).await;

    let (a, b) = tokio::join!(
        service.remove_member(&alice, org.id, alice.id),
        service.remove_member(&bob, org.id, bob.id),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

    let remaining = if a.is_ok() { &bob } else { &alice };
    let members = service.list_members(remaining, org.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role, Role::Owner);
}

#[tokio::test]
async fn outsiders_cannot_list_members() {
    let (service, db, alice) = setup().await;
    let org = service
        .create(&alice, NewOrganization::named("Acme"))
        .await
        .unwrap();
    let mallory = create_user(&db, "mallory@example.com").await;

    let result = service.list_members(&mallory, org.id).await;
    assert!(matches!(result, Err(LayrbaseError::AuthorizationDenied { .. })));
}
