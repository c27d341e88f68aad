//! Organization and invitation configuration.

/// Configuration for the organization and invitation services.
#[derive(Debug, Clone)]
pub struct OrgConfig {
    /// Invitation lifetime in seconds (default: 604_800 = 7 days).
    pub invitation_lifetime_secs: i64,
    /// Public base URL of the dashboard, used to build accept links.
    pub app_base_url: String,
    /// Path of the public join route; the token is appended as one segment.
    pub join_path: String,
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self {
            invitation_lifetime_secs: 604_800,
            app_base_url: "http://localhost:3000".into(),
            join_path: "/join".into(),
        }
    }
}

impl OrgConfig {
    /// Link the invitee follows to reach the join route.
    pub fn accept_url(&self, token: &str) -> String {
        format!(
            "{}{}{}",
            self.app_base_url.trim_end_matches('/'),
            self.join_prefix(),
            token
        )
    }

    /// The join path with exactly one leading and one trailing slash.
    pub fn join_prefix(&self) -> String {
        let path = self.join_path.trim_matches('/');
        if path.is_empty() {
            "/".into()
        } else {
            format!("/{path}/")
        }
    }
}

/// Configuration for the outbound email API.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Endpoint accepting `{from, to, subject, html}` JSON bodies.
    pub api_url: String,
    /// Bearer key for the endpoint. `None` disables HTTP delivery.
    pub api_key: Option<String>,
    /// Sender shown to recipients.
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.resend.com/emails".into(),
            api_key: None,
            from_address: "Layrbase <invitations@layrbase.app>".into(),
        }
    }
}
