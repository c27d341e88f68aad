//! The public join page, mounted at `{join_path}/{token}`.

use std::sync::atomic::{AtomicBool, Ordering};

use layrbase_core::error::LayrbaseError;
use layrbase_core::models::invitation::{AcceptedInvitation, InvitationDetails};
use layrbase_org::config::OrgConfig;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::Backend;
use crate::context::SessionContext;

/// A parsed join path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRoute {
    pub token: String,
}

impl JoinRoute {
    /// Accepts `{join_path}/{token}` with an optional trailing slash, the
    /// same shape [`OrgConfig::accept_url`] produces. Anything else (extra
    /// segments, empty token) is not a join route.
    pub fn parse(path: &str, config: &OrgConfig) -> Option<Self> {
        Self::parse_prefixed(path, &config.join_prefix())
    }

    fn parse_prefixed(path: &str, prefix: &str) -> Option<Self> {
        let rest = path.strip_prefix(prefix)?;
        let token = rest.strip_suffix('/').unwrap_or(rest);
        if token.is_empty() || token.contains('/') {
            return None;
        }
        Some(Self {
            token: token.to_string(),
        })
    }
}

/// Extract the token from what a user pasted: a bare token, a join path or
/// a full join link.
pub fn token_from_input(input: &str, config: &OrgConfig) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let prefix = config.join_prefix();
    let Some(start) = input.find(&prefix) else {
        return Some(input.to_string());
    };
    let path = &input[start..];
    let path = path.split(['?', '#']).next().unwrap_or(path);
    JoinRoute::parse_prefixed(path, &prefix).map(|route| route.token)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum JoinView {
    Loading,
    /// Unknown, expired or already used.
    Invalid,
    /// The lookup itself failed.
    Unavailable { error: LayrbaseError },
    Ready { details: InvitationDetails },
    NeedsSignIn { details: InvitationDetails },
    Accepting { details: InvitationDetails },
    Joined { accepted: AcceptedInvitation },
    Failed {
        details: InvitationDetails,
        error: LayrbaseError,
    },
}

impl JoinView {
    /// Details the page may still act on. A failure that only a new
    /// invitation can fix leaves nothing to retry.
    fn details(&self) -> Option<&InvitationDetails> {
        match self {
            JoinView::Ready { details } | JoinView::NeedsSignIn { details } => Some(details),
            JoinView::Failed { details, error } if !error.is_terminal() => Some(details),
            _ => None,
        }
    }
}

/// One visit to the join page. Results arriving after [`JoinPage::unmount`]
/// are dropped.
pub struct JoinPage {
    route: JoinRoute,
    view: RwLock<JoinView>,
    mounted: AtomicBool,
}

impl JoinPage {
    pub fn new(route: JoinRoute) -> Self {
        Self {
            route,
            view: RwLock::new(JoinView::Loading),
            mounted: AtomicBool::new(true),
        }
    }

    pub fn route(&self) -> &JoinRoute {
        &self.route
    }

    pub async fn view(&self) -> JoinView {
        self.view.read().await.clone()
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    /// Fetch the invitation details. No sign-in required.
    pub async fn load<B: Backend>(&self, backend: &B) -> JoinView {
        self.set(JoinView::Loading).await;
        let next = match backend.invitation_details(&self.route.token).await {
            Ok(details) if details.is_valid => JoinView::Ready { details },
            Ok(_) | Err(LayrbaseError::NotFound { .. }) => JoinView::Invalid,
            Err(error) => JoinView::Unavailable { error },
        };
        self.set(next).await;
        self.view().await
    }

    /// Accept as the session's signed-in user.
    ///
    /// An invitation addressed to another email fails here without any
    /// backend call.
    pub async fn accept<B: Backend>(&self, session: &SessionContext<B>) -> JoinView {
        let Some(details) = self.view.read().await.details().cloned() else {
            return self.view().await;
        };

        let Some(user) = session.current_user().await else {
            self.set(JoinView::NeedsSignIn { details }).await;
            return self.view().await;
        };
        if !user.has_email(&details.email) {
            let error = LayrbaseError::EmailMismatch {
                invited: details.email.clone(),
                actual: user.email,
            };
            self.set(JoinView::Failed { details, error }).await;
            return self.view().await;
        }

        self.set(JoinView::Accepting {
            details: details.clone(),
        })
        .await;
        let next = match session.accept_invitation(&self.route.token, &details).await {
            Ok(accepted) => JoinView::Joined { accepted },
            Err(error) => JoinView::Failed { details, error },
        };
        self.set(next).await;
        self.view().await
    }

    async fn set(&self, view: JoinView) {
        let mut current = self.view.write().await;
        if !self.mounted.load(Ordering::SeqCst) {
            debug!("Join page unmounted; dropping result");
            return;
        }
        *current = view;
    }
}
