//! Environment-driven configuration for the server binary.

use layrbase_core::models::user::validate_email;
use layrbase_db::DbConfig;
use layrbase_org::config::{EmailConfig, OrgConfig};
use tracing::warn;

pub const APP_URL: &str = "LAYRBASE_APP_URL";
pub const INVITE_TTL_SECS: &str = "LAYRBASE_INVITE_TTL_SECS";
pub const EMAIL_API_URL: &str = "LAYRBASE_EMAIL_API_URL";
pub const EMAIL_API_KEY: &str = "LAYRBASE_EMAIL_API_KEY";
pub const EMAIL_FROM: &str = "LAYRBASE_EMAIL_FROM";
pub const DB_NAMESPACE: &str = "LAYRBASE_DB_NAMESPACE";
pub const DB_DATABASE: &str = "LAYRBASE_DB_DATABASE";
pub const OPERATOR_EMAIL: &str = "LAYRBASE_OPERATOR_EMAIL";
pub const OPERATOR_NAME: &str = "LAYRBASE_OPERATOR_NAME";
pub const OPERATOR_ORG: &str = "LAYRBASE_OPERATOR_ORG";

/// Account signed in at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    pub email: String,
    pub display_name: Option<String>,
    /// Organization created for the operator when they have none.
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub org: OrgConfig,
    pub email: EmailConfig,
    pub db: DbConfig,
    pub operator: Option<OperatorConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or empty keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(APP_URL) {
            config.org.app_base_url = url;
        }
        if let Some(raw) = get(INVITE_TTL_SECS) {
            match raw.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => config.org.invitation_lifetime_secs = secs,
                _ => warn!(
                    key = INVITE_TTL_SECS,
                    value = %raw,
                    default = config.org.invitation_lifetime_secs,
                    "Ignoring invalid invitation lifetime"
                ),
            }
        }
        if let Some(url) = get(EMAIL_API_URL) {
            config.email.api_url = url;
        }
        config.email.api_key = get(EMAIL_API_KEY);
        if let Some(from) = get(EMAIL_FROM) {
            config.email.from_address = from;
        }
        if let Some(namespace) = get(DB_NAMESPACE) {
            config.db.namespace = namespace;
        }
        if let Some(database) = get(DB_DATABASE) {
            config.db.database = database;
        }
        if let Some(raw) = get(OPERATOR_EMAIL) {
            match validate_email(&raw) {
                Ok(email) => {
                    config.operator = Some(OperatorConfig {
                        email,
                        display_name: get(OPERATOR_NAME),
                        organization: get(OPERATOR_ORG),
                    })
                }
                Err(err) => warn!(
                    key = OPERATOR_EMAIL,
                    value = %raw,
                    error = %err,
                    "Ignoring invalid operator email"
                ),
            }
        }

        config
    }
}
