//! Layrbase Org: organization creation, membership management and the
//! invitation lifecycle, plus invitation email delivery.

pub mod config;
pub mod error;
pub mod invitation;
pub mod notify;
pub mod organization;
pub mod token;

pub use config::{EmailConfig, OrgConfig};
pub use error::OrgError;
pub use invitation::{InvitationService, IssuedInvitation, NotificationOutcome};
pub use notify::{HttpEmailNotifier, InvitationNotice, LogNotifier, Notifier, NotifyError};
pub use organization::OrganizationService;
