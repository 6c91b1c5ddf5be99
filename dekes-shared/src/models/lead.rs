/// Lead model, outcome tracking, and the lead event audit log
///
/// Leads are tenant-scoped: every query below filters on `organization_id`,
/// so a lead owned by another organization is indistinguishable from a lead
/// that does not exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE leads (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id),
///     query_id UUID REFERENCES queries(id),
///     run_id UUID REFERENCES runs(id),
///     title VARCHAR(512) NOT NULL,
///     source_url VARCHAR(2048),
///     snippet TEXT,
///     score INTEGER NOT NULL DEFAULT 0,
///     status TEXT NOT NULL DEFAULT 'NEW',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE lead_events (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     lead_id UUID NOT NULL REFERENCES leads(id),
///     event_type TEXT NOT NULL,
///     meta JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use dekes_shared::models::lead::{Lead, LeadStatus};
/// use serde_json::json;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, org: Uuid, lead_id: Uuid) -> Result<(), sqlx::Error> {
/// if let Some(lead) = Lead::record_outcome(&pool, org, lead_id, LeadStatus::Won, json!({})).await? {
///     assert_eq!(lead.status, LeadStatus::Won);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

const LEAD_COLUMNS: &str = "id, organization_id, query_id, run_id, title, source_url, snippet, \
     score, status, created_at, updated_at";

/// Number of leads returned by the listing endpoint
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Review/outreach state of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Review,
    OutreachReady,
    Contacted,
    Won,
    Lost,
    Rejected,
}

impl LeadStatus {
    /// Whether a user may set this status through the outcome endpoint
    pub fn is_outcome(&self) -> bool {
        !matches!(self, LeadStatus::New)
    }

    /// Whether the lead counts as qualified in dashboard stats
    pub fn is_qualified(&self) -> bool {
        matches!(
            self,
            LeadStatus::Review | LeadStatus::OutreachReady | LeadStatus::Contacted | LeadStatus::Won
        )
    }
}

/// Audit event type recorded for lead changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadEventType {
    Created,
    Updated,
    Contacted,
    Won,
    Lost,
    Rejected,
}

impl From<LeadStatus> for LeadEventType {
    fn from(status: LeadStatus) -> Self {
        match status {
            LeadStatus::Won => LeadEventType::Won,
            LeadStatus::Lost => LeadEventType::Lost,
            LeadStatus::Contacted => LeadEventType::Contacted,
            LeadStatus::Rejected => LeadEventType::Rejected,
            _ => LeadEventType::Updated,
        }
    }
}

/// Lead model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub query_id: Option<Uuid>,
    pub run_id: Option<Uuid>,
    pub title: String,
    pub source_url: Option<String>,
    pub snippet: Option<String>,
    pub score: i32,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a lead
#[derive(Debug, Clone, Default)]
pub struct CreateLead {
    pub query_id: Option<Uuid>,
    pub run_id: Option<Uuid>,
    pub title: String,
    pub source_url: Option<String>,
    pub snippet: Option<String>,
    pub score: i32,
}

/// Aggregate counts for an organization's leads
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadStats {
    pub leads: i64,
    pub qualified: i64,
    pub won: i64,
    /// Won leads as a percentage of all leads
    pub conversion: f64,
}

impl LeadStats {
    fn from_counts(leads: i64, qualified: i64, won: i64) -> Self {
        let conversion = if leads > 0 {
            (won as f64 / leads as f64) * 100.0
        } else {
            0.0
        };

        Self {
            leads,
            qualified,
            won,
            conversion,
        }
    }
}

impl Lead {
    /// Creates a lead and its `CREATED` event in one transaction
    pub async fn create(
        pool: &PgPool,
        organization_id: Uuid,
        data: CreateLead,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO leads (organization_id, query_id, run_id, title, source_url, snippet, score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {LEAD_COLUMNS}"
        );

        let lead = sqlx::query_as::<_, Lead>(&query)
            .bind(organization_id)
            .bind(data.query_id)
            .bind(data.run_id)
            .bind(data.title)
            .bind(data.source_url)
            .bind(data.snippet)
            .bind(data.score)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO lead_events (lead_id, event_type, meta) VALUES ($1, $2, '{}')")
            .bind(lead.id)
            .bind(LeadEventType::Created)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(lead)
    }

    /// Lists the organization's newest leads
    pub async fn list_recent(
        pool: &PgPool,
        organization_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {LEAD_COLUMNS} FROM leads \
             WHERE organization_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2"
        );

        sqlx::query_as::<_, Lead>(&query)
            .bind(organization_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Finds a lead owned by the organization
    pub async fn find_for_organization(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query =
            format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 AND organization_id = $2");

        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// Sets a lead's status and appends the matching audit event atomically
    ///
    /// Returns `None` (and writes nothing) if the lead does not exist or
    /// belongs to another organization.
    pub async fn record_outcome(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
        status: LeadStatus,
        meta: JsonValue,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE leads SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND organization_id = $2 \
             RETURNING {LEAD_COLUMNS}"
        );

        let Some(lead) = sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .bind(organization_id)
            .bind(status)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("INSERT INTO lead_events (lead_id, event_type, meta) VALUES ($1, $2, $3)")
            .bind(lead.id)
            .bind(LeadEventType::from(status))
            .bind(meta)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(lead))
    }

    /// Computes dashboard statistics for an organization
    pub async fn stats(pool: &PgPool, organization_id: Uuid) -> Result<LeadStats, sqlx::Error> {
        let (leads, qualified, won): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status IN ('REVIEW', 'OUTREACH_READY', 'CONTACTED', 'WON')),
                   COUNT(*) FILTER (WHERE status = 'WON')
            FROM leads
            WHERE organization_id = $1
            "#,
        )
        .bind(organization_id)
        .fetch_one(pool)
        .await?;

        Ok(LeadStats::from_counts(leads, qualified, won))
    }
}
