//! SurrealDB implementation of [`OrganizationRepository`].

use chrono::{DateTime, Utc};
use layrbase_core::error::LayrbaseResult;
use layrbase_core::models::organization::{CreateOrganization, Organization};
use layrbase_core::repository::OrganizationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct OrganizationRowWithId {
    record_id: String,
    name: String,
    slug: String,
    description: Option<String>,
    industry: Option<String>,
    website: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRowWithId {
    fn try_into_organization(self, member_count: u64) -> Result<Organization, DbError> {
        Ok(Organization {
            id: parse_uuid("organization.id", &self.record_id)?,
            name: self.name,
            slug: self.slug,
            description: self.description,
            industry: self.industry,
            website: self.website,
            member_count,
            created_by: parse_uuid("organization.created_by", &self.created_by)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Load one organization with its live member count.
pub(crate) async fn fetch_organization<C: Connection>(
    db: &Surreal<C>,
    id: Uuid,
) -> Result<Option<Organization>, DbError> {
    let id_str = id.to_string();
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * \
             FROM type::record('organization', $id); \
             SELECT count() AS total FROM membership \
             WHERE organization_id = $id GROUP ALL",
        )
        .bind(("id", id_str))
        .await?;

    let rows: Vec<OrganizationRowWithId> = result.take(0)?;
    let counts: Vec<CountRow> = result.take(1)?;
    let member_count = counts.first().map(|c| c.total).unwrap_or(0);

    rows.into_iter()
        .next()
        .map(|row| row.try_into_organization(member_count))
        .transpose()
}

async fn find_by_slug<C: Connection>(
    db: &Surreal<C>,
    slug: &str,
) -> Result<Option<Uuid>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * \
             FROM organization WHERE slug = $slug",
        )
        .bind(("slug", slug.to_string()))
        .await?;

    let rows: Vec<OrganizationRowWithId> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(|row| parse_uuid("organization.id", &row.record_id))
        .transpose()
}

/// SurrealDB implementation of the Organization repository.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> LayrbaseResult<Organization> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let slug = input.slug.clone();

        let result = self
            .db
            .query(
                "CREATE type::record('organization', $id) SET \
                 name = $name, slug = $slug, description = $description, \
                 industry = $industry, website = $website, \
                 created_by = $created_by, created_at = $now, updated_at = $now",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name.clone()))
            .bind(("slug", input.slug.clone()))
            .bind(("description", input.description.clone()))
            .bind(("industry", input.industry.clone()))
            .bind(("website", input.website.clone()))
            .bind(("created_by", input.created_by.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        if let Err(err) = result.check() {
            if find_by_slug(&self.db, &slug).await?.is_some() {
                return Err(DbError::UniqueViolation {
                    entity: "organization",
                    constraint: "slug",
                }
                .into());
            }
            return Err(DbError::from(err).into());
        }

        Ok(Organization {
            id,
            name: input.name,
            slug: input.slug,
            description: input.description,
            industry: input.industry,
            website: input.website,
            member_count: 0,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> LayrbaseResult<Organization> {
        let organization = fetch_organization(&self.db, id)
            .await?
            .ok_or_else(|| DbError::not_found("organization", id))?;
        Ok(organization)
    }

    async fn get_by_slug(&self, slug: &str) -> LayrbaseResult<Organization> {
        let id = find_by_slug(&self.db, slug)
            .await?
            .ok_or_else(|| DbError::not_found("organization", format!("slug={slug}")))?;
        self.get_by_id(id).await
    }
}
