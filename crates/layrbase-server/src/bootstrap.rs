//! Operator bootstrap: a fresh store has no users, so the server can sign in
//! one configured operator and give them a first organization.

use layrbase_core::error::{LayrbaseError, LayrbaseResult};
use layrbase_core::models::organization::NewOrganization;
use layrbase_core::models::user::{CreateUser, User};
use layrbase_core::repository::UserRepository;
use layrbase_session::{Backend, GatingShell, IdentityProvider, Screen};
use tracing::info;

use crate::config::OperatorConfig;

/// Identity provider that always answers with the operator.
struct Operator(User);

impl IdentityProvider for Operator {
    async fn current_user(&self) -> LayrbaseResult<Option<User>> {
        Ok(Some(self.0.clone()))
    }
}

/// Look the operator up by email, creating the account on first boot.
pub async fn ensure_operator<U: UserRepository>(
    users: &U,
    operator: &OperatorConfig,
) -> LayrbaseResult<User> {
    match users.get_by_email(&operator.email).await {
        Ok(user) => Ok(user),
        Err(LayrbaseError::NotFound { .. }) => {
            let user = users
                .create(CreateUser {
                    email: operator.email.clone(),
                    display_name: operator.display_name.clone(),
                })
                .await?;
            info!(user_id = %user.id, "Operator account created");
            Ok(user)
        }
        Err(e) => Err(e),
    }
}

/// Start the operator's session. When they have no organization yet and one
/// is configured, create it through the shell's setup flow.
pub async fn start_operator_session<B: Backend, U: UserRepository>(
    shell: &GatingShell<B>,
    users: &U,
    operator: &OperatorConfig,
) -> LayrbaseResult<Screen> {
    let user = ensure_operator(users, operator).await?;
    let screen = shell.start(&Operator(user)).await;

    let (Screen::OrganizationSetup { .. }, Some(name)) = (&screen, &operator.organization) else {
        return Ok(screen);
    };
    shell.open_create().await;
    let organization = shell
        .submit_create(NewOrganization::named(name.as_str()))
        .await?;
    info!(
        organization_id = %organization.id,
        slug = %organization.slug,
        "Operator organization created"
    );
    Ok(shell.screen().await)
}

pub fn screen_label(screen: &Screen) -> &'static str {
    match screen {
        Screen::Loading => "loading",
        Screen::AuthError { .. } => "auth_error",
        Screen::LoadError { .. } => "load_error",
        Screen::SignIn => "sign_in",
        Screen::OrganizationSetup { .. } => "organization_setup",
        Screen::Dashboard { .. } => "dashboard",
    }
}
