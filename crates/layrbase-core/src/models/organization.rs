//! Organization domain model.
//!
//! Organizations are the tenancy boundary. Every user-facing record is
//! reached through a membership in one of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::membership::Role;

/// A company or team using the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// URL-safe unique identifier derived from the name (e.g., `acme-corp`).
    pub slug: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    /// Computed from memberships when the row is read.
    pub member_count: u64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to persist a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub created_by: Uuid,
}

/// What a user fills in on the "create organization" form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
}

impl NewOrganization {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// An organization together with the viewing user's role in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub organization: Organization,
    pub role: Role,
}

/// Derive a URL-safe slug from an organization name.
///
/// The result is lowercase, contains only `[a-z0-9-]`, never starts or ends
/// with `-`, and every run of other characters becomes a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_examples() {
        assert_eq!(slugify("Acme Corp!!"), "acme-corp");
        assert_eq!(slugify("  --Foo__Bar--  "), "foo-bar");
        assert_eq!(slugify("Layrbase"), "layrbase");
        assert_eq!(slugify("A & B  Partners, LLC"), "a-b-partners-llc");
        assert_eq!(slugify("Café Zürich 2024"), "caf-z-rich-2024");
    }

    #[test]
    fn slug_of_symbols_only_is_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("!!!---???"), "");
    }

    #[test]
    fn slug_shape_holds_for_arbitrary_names() {
        let names = [
            "x",
            "-x-",
            "__--__",
            "Hello,World",
            "MiXeD CaSe 99 Bottles",
            "tab\tseparated\nlines",
            "émoji 🚀 launch",
            "already-a-slug",
        ];
        for name in names {
            let slug = slugify(name);
            assert!(
                slug.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "{slug:?}"
            );
            assert!(!slug.starts_with('-') && !slug.ends_with('-'), "{slug:?}");
            assert!(!slug.contains("--"), "{slug:?}");
            assert_eq!(slugify(&slug), slug, "slugify must be idempotent");
        }
    }
}
