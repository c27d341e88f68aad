//! Layrbase server: starts the embedded store, wires the organization and
//! invitation services and the email notifier, and optionally brings up an
//! operator session through the gating shell.

mod bootstrap;
mod config;

use std::error::Error;
use std::sync::Arc;

use layrbase_db::DbManager;
use layrbase_db::repository::{
    SurrealInvitationRepository, SurrealMembershipRepository, SurrealOrganizationRepository,
    SurrealUserRepository,
};
use layrbase_org::invitation::InvitationService;
use layrbase_org::notify::{HttpEmailNotifier, LogNotifier, Notifier};
use layrbase_org::organization::OrganizationService;
use layrbase_session::{GatingShell, ServiceBackend, SessionContext};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("layrbase=info")),
        )
        .json()
        .init();

    tracing::info!("Starting Layrbase server...");

    let config = ServerConfig::from_env();
    if config.email.api_key.is_some() {
        let notifier = HttpEmailNotifier::new(config.email.clone());
        serve(config, notifier).await?;
    } else {
        tracing::warn!("No email API key configured; invitation emails will only be logged");
        serve(config, LogNotifier).await?;
    }

    tracing::info!("Layrbase server stopped.");
    Ok(())
}

async fn serve<N: Notifier>(config: ServerConfig, notifier: N) -> Result<(), Box<dyn Error>> {
    let db = DbManager::connect(&config.db).await?;
    let client = db.client();
    let users = SurrealUserRepository::new(client.clone());
    let memberships = SurrealMembershipRepository::new(client.clone());

    let organizations = OrganizationService::new(
        SurrealOrganizationRepository::new(client.clone()),
        memberships.clone(),
    );
    let invitations = InvitationService::new(
        SurrealOrganizationRepository::new(client.clone()),
        memberships,
        SurrealInvitationRepository::new(client.clone()),
        users.clone(),
        notifier,
        config.org.clone(),
    );
    let backend = Arc::new(ServiceBackend::new(organizations, invitations));
    let shell = GatingShell::with_config(SessionContext::new(backend), config.org.clone());

    match &config.operator {
        Some(operator) => {
            match bootstrap::start_operator_session(&shell, &users, operator).await {
                Ok(screen) => tracing::info!(
                    operator = %operator.email,
                    screen = bootstrap::screen_label(&screen),
                    "Operator session ready"
                ),
                Err(err) => tracing::warn!(
                    operator = %operator.email,
                    error = %err,
                    "Operator bootstrap failed"
                ),
            }
        }
        None => tracing::info!("No operator configured"),
    }

    tracing::info!(
        app_base_url = %config.org.app_base_url,
        invitation_lifetime_secs = config.org.invitation_lifetime_secs,
        "Layrbase backend ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shell.sign_out().await;
    Ok(())
}
