//! Client-side session state for Layrbase: the signed-in user's
//! organization context, dashboard navigation, the gating shell and the
//! public join page.

pub mod backend;
pub mod context;
pub mod join;
pub mod navigation;
pub mod shell;

pub use backend::{Backend, IdentityProvider, ServiceBackend};
pub use context::{SessionContext, SessionPhase, SessionSnapshot};
pub use join::{JoinPage, JoinRoute, JoinView};
pub use navigation::{NavAction, NavigationState, Section, SubSection};
pub use shell::{FormState, GatingShell, Screen, SetupMode};
