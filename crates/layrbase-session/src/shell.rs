//! Top-level gating: decides what the client shows given the session phase,
//! and drives the organization-setup flow.

use layrbase_core::error::{LayrbaseError, LayrbaseResult};
use layrbase_core::models::invitation::AcceptedInvitation;
use layrbase_core::models::membership::Role;
use layrbase_core::models::organization::{NewOrganization, Organization};
use layrbase_org::config::OrgConfig;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{Backend, IdentityProvider};
use crate::context::{SessionContext, SessionPhase};
use crate::join::token_from_input;
use crate::navigation::{NavAction, NavigationState, Section, SubSection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupMode {
    #[default]
    Choose,
    Create,
    Join,
}

/// State of the create/join form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum FormState {
    #[default]
    Idle,
    Submitting,
    Failed(LayrbaseError),
}

/// What the client renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Loading,
    AuthError {
        message: String,
    },
    /// Signed in, but the organization list could not be loaded.
    LoadError {
        message: String,
    },
    SignIn,
    OrganizationSetup {
        mode: SetupMode,
        form: FormState,
    },
    Dashboard {
        organization: Organization,
        role: Role,
        can_manage: bool,
        section: Section,
        sub_section: Option<SubSection>,
    },
}

#[derive(Debug, Default)]
struct ShellState {
    navigation: NavigationState,
    /// Setup requested from the dashboard.
    setup_open: bool,
    mode: SetupMode,
    form: FormState,
    /// Bumped on start and sign-out; a submission only lands in the form
    /// it was started from.
    generation: u64,
}

impl ShellState {
    fn reset_setup(&mut self) {
        self.setup_open = false;
        self.mode = SetupMode::Choose;
        self.form = FormState::Idle;
    }

    fn next_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

pub struct GatingShell<B: Backend> {
    session: SessionContext<B>,
    state: RwLock<ShellState>,
    config: OrgConfig,
}

impl<B: Backend> GatingShell<B> {
    pub fn new(session: SessionContext<B>) -> Self {
        Self::with_config(session, OrgConfig::default())
    }

    /// A shell whose join form understands links built from `config`.
    pub fn with_config(session: SessionContext<B>, config: OrgConfig) -> Self {
        Self {
            session,
            state: RwLock::new(ShellState::default()),
            config,
        }
    }

    pub fn session(&self) -> &SessionContext<B> {
        &self.session
    }

    pub async fn start<P: IdentityProvider>(&self, identity: &P) -> Screen {
        {
            let mut state = self.state.write().await;
            state.reset_setup();
            state.next_generation();
        }
        self.session.start(identity).await;
        self.screen().await
    }

    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        let mut state = self.state.write().await;
        let generation = state.generation;
        *state = ShellState {
            generation,
            ..ShellState::default()
        };
        state.next_generation();
    }

    pub async fn screen(&self) -> Screen {
        let snapshot = self.session.snapshot().await;
        let state = self.state.read().await;
        let setup = Screen::OrganizationSetup {
            mode: state.mode,
            form: state.form.clone(),
        };

        match snapshot.phase {
            SessionPhase::Loading => Screen::Loading,
            SessionPhase::AuthError(message) => Screen::AuthError { message },
            SessionPhase::LoadError(message) => Screen::LoadError { message },
            SessionPhase::Unauthenticated => Screen::SignIn,
            SessionPhase::NoOrganization => setup,
            SessionPhase::Ready if state.setup_open => setup,
            SessionPhase::Ready => match snapshot.current {
                Some(current) => {
                    let (section, sub_section) = state.navigation.location();
                    Screen::Dashboard {
                        can_manage: current.role.can_manage(),
                        organization: current.organization,
                        role: current.role,
                        section,
                        sub_section,
                    }
                }
                None => setup,
            },
        }
    }

    pub async fn open_create(&self) {
        self.set_mode(SetupMode::Create).await;
    }

    pub async fn open_join(&self) {
        self.set_mode(SetupMode::Join).await;
    }

    pub async fn back_to_choice(&self) {
        self.set_mode(SetupMode::Choose).await;
    }

    /// Show the setup flow from the dashboard.
    pub async fn begin_setup(&self) {
        if self.session.phase().await != SessionPhase::Ready {
            return;
        }
        let mut state = self.state.write().await;
        state.reset_setup();
        state.setup_open = true;
    }

    /// Leave the setup flow. Only possible once an organization exists.
    pub async fn close_setup(&self) -> bool {
        if self.session.current_organization().await.is_none() {
            return false;
        }
        let mut state = self.state.write().await;
        if state.form == FormState::Submitting {
            return false;
        }
        state.reset_setup();
        true
    }

    pub async fn submit_create(&self, input: NewOrganization) -> LayrbaseResult<Organization> {
        let generation = self.begin_submit().await?;
        let result = self.session.create_organization(input).await;
        self.finish_submit(generation, &result).await;
        result
    }

    /// Join with a pasted token or invitation link.
    pub async fn submit_join(&self, input: &str) -> LayrbaseResult<AcceptedInvitation> {
        let generation = self.begin_submit().await?;
        let result = match token_from_input(input, &self.config) {
            Some(token) => self.session.join_organization(&token).await,
            None => Err(LayrbaseError::validation("invitation link or token is required")),
        };
        self.finish_submit(generation, &result).await;
        result
    }

    pub async fn navigate(&self, action: NavAction) {
        self.state.write().await.navigation.apply(action);
    }

    async fn set_mode(&self, mode: SetupMode) {
        let mut state = self.state.write().await;
        if state.form == FormState::Submitting {
            debug!(?mode, "Ignoring mode change while submitting");
            return;
        }
        state.mode = mode;
        state.form = FormState::Idle;
    }

    async fn begin_submit(&self) -> LayrbaseResult<u64> {
        let mut state = self.state.write().await;
        if state.form == FormState::Submitting {
            return Err(LayrbaseError::validation("a submission is already in progress"));
        }
        state.form = FormState::Submitting;
        Ok(state.generation)
    }

    async fn finish_submit<T>(&self, generation: u64, result: &LayrbaseResult<T>) {
        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(
                started = generation,
                current = state.generation,
                "Dropping submission result from an earlier session"
            );
            return;
        }
        match result {
            Ok(_) => state.reset_setup(),
            Err(err) => state.form = FormState::Failed(err.clone()),
        }
    }
}
