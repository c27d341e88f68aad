//! Invitation domain model.
//!
//! An invitation is a single-use, expiring offer to join an organization at
//! a given role. Only the SHA-256 hash of its token is ever stored; the raw
//! token leaves the system once, when the invitation is issued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::membership::{Membership, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Intended recipient, normalized to lowercase.
    pub email: String,
    pub role: Role,
    /// Hex-encoded SHA-256 of the raw token.
    pub token_hash: String,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

impl Invitation {
    pub fn status_at(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.accepted_at.is_some() {
            InvitationStatus::Accepted
        } else if now >= self.expires_at {
            InvitationStatus::Expired
        } else {
            InvitationStatus::Pending
        }
    }

    /// Valid means not yet accepted and strictly before the expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == InvitationStatus::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitation {
    pub organization_id: Uuid,
    pub email: String,
    pub role: Role,
    pub token_hash: String,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Public view of an invitation, shown on the join page before the visitor
/// commits to accepting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationDetails {
    pub invitation_id: Uuid,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub email: String,
    pub role: Role,
    pub inviter_name: String,
    pub expires_at: DateTime<Utc>,
    pub is_valid: bool,
}

/// Result of a successful acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedInvitation {
    pub invitation: Invitation,
    pub membership: Membership,
}
