/// Saved lead-search queries
///
/// Every function takes the caller's `organization_id`; there is no unscoped
/// lookup by ID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Saved search query
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub query: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Query {
    /// Creates an enabled query named after its text
    pub async fn create(
        pool: &PgPool,
        organization_id: Uuid,
        text: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Query>(
            r#"
            INSERT INTO queries (organization_id, name, query, enabled)
            VALUES ($1, $2, $2, TRUE)
            RETURNING id, organization_id, name, query, enabled, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(text)
        .fetch_one(pool)
        .await
    }

    /// Finds a query owned by the organization
    pub async fn find_for_organization(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Query>(
            r#"
            SELECT id, organization_id, name, query, enabled, created_at, updated_at
            FROM queries
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the query text and re-enables it
    ///
    /// Returns `None` if the query does not belong to the organization.
    pub async fn update_text(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
        text: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Query>(
            r#"
            UPDATE queries
            SET query = $3, enabled = TRUE, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, name, query, enabled, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(text)
        .fetch_optional(pool)
        .await
    }

    /// Updates the organization's query if `id` names one, otherwise creates a new query
    pub async fn upsert_for_run(
        pool: &PgPool,
        organization_id: Uuid,
        id: Option<Uuid>,
        text: &str,
    ) -> Result<Self, sqlx::Error> {
        if let Some(id) = id {
            if let Some(updated) = Self::update_text(pool, organization_id, id, text).await? {
                return Ok(updated);
            }
        }

        Self::create(pool, organization_id, text).await
    }
}
