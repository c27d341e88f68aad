//! Invitation notification: message formatting and delivery.
//!
//! Delivery is best-effort. Callers log a failed send and carry on; the
//! invitation itself stays valid and shareable through its accept link.

use chrono::{DateTime, Utc};
use layrbase_core::models::membership::Role;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::EmailConfig;

/// Everything the invitation email needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationNotice {
    pub to: String,
    pub organization_name: String,
    pub inviter_name: String,
    pub inviter_email: String,
    pub role: Role,
    pub accept_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email API is not configured")]
    NotConfigured,

    #[error("email API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email API rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers invitation notices.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        notice: &InvitationNotice,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

pub fn render_subject(notice: &InvitationNotice) -> String {
    format!(
        "{} invited you to join {} on Layrbase",
        notice.inviter_name, notice.organization_name
    )
}

pub fn render_html(notice: &InvitationNotice) -> String {
    let organization = escape_html(&notice.organization_name);
    let inviter = escape_html(&notice.inviter_name);
    let inviter_email = escape_html(&notice.inviter_email);
    let role = escape_html(notice.role.as_str());
    let url = escape_html(&notice.accept_url);
    let expires = notice.expires_at.format("%B %-d, %Y at %H:%M UTC");

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <body style=\"font-family: sans-serif; color: #111827;\">\n\
         <h2>You're invited to join {organization}</h2>\n\
         <p><strong>{inviter}</strong> ({inviter_email}) has invited you to join \
         <strong>{organization}</strong> on Layrbase as a <strong>{role}</strong>.</p>\n\
         <p><a href=\"{url}\" style=\"display: inline-block; padding: 10px 20px; \
         background: #4f46e5; color: #ffffff; text-decoration: none; \
         border-radius: 6px;\">Accept invitation</a></p>\n\
         <p>Or paste this link into your browser:<br>{url}</p>\n\
         <p style=\"color: #6b7280; font-size: 12px;\">This invitation expires on {expires}. \
         If you were not expecting it, you can ignore this email.</p>\n\
         </body>\n\
         </html>\n"
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Records notices in the log instead of sending them. Used when no email
/// API is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send(&self, notice: &InvitationNotice) -> Result<(), NotifyError> {
        info!(
            to = %notice.to,
            organization = %notice.organization_name,
            role = %notice.role,
            expires_at = %notice.expires_at,
            "Invitation email not sent: no email API configured"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

/// Forwards notices to a transactional email API.
#[derive(Clone)]
pub struct HttpEmailNotifier {
    client: Client,
    config: EmailConfig,
}

impl HttpEmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

impl Notifier for HttpEmailNotifier {
    async fn send(&self, notice: &InvitationNotice) -> Result<(), NotifyError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(NotifyError::NotConfigured)?;

        let body = EmailRequest {
            from: &self.config.from_address,
            to: [&notice.to],
            subject: render_subject(notice),
            html: render_html(notice),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(to = %notice.to, "Invitation email accepted by email API");
        Ok(())
    }
}
