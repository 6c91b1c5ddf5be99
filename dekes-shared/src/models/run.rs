/// Search executions
///
/// A run is inserted as `STARTED` before the optimization service is called
/// and moved to `FINISHED` or `FAILED` once the call returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Run lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Started,
    Finished,
    Failed,
}

impl RunStatus {
    /// Checks if state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Finished | RunStatus::Failed)
    }
}

/// Run model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub query_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result_count: i32,
    pub lead_count: i32,
}

impl Run {
    /// Records the start of a run
    pub async fn start(
        pool: &PgPool,
        organization_id: Uuid,
        query_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Run>(
            r#"
            INSERT INTO runs (organization_id, query_id, status)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, query_id, status, started_at, finished_at,
                      result_count, lead_count
            "#,
        )
        .bind(organization_id)
        .bind(query_id)
        .bind(RunStatus::Started)
        .fetch_one(pool)
        .await
    }

    /// Moves a started run to a terminal state
    ///
    /// Only `STARTED` runs of the given organization are updated.
    pub async fn finish(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
        status: RunStatus,
        result_count: i32,
        lead_count: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        debug_assert!(status.is_terminal());

        sqlx::query_as::<_, Run>(
            r#"
            UPDATE runs
            SET status = $3, finished_at = NOW(), result_count = $4, lead_count = $5
            WHERE id = $1 AND organization_id = $2 AND status = 'STARTED'
            RETURNING id, organization_id, query_id, status, started_at, finished_at,
                      result_count, lead_count
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(status)
        .bind(result_count)
        .bind(lead_count)
        .fetch_optional(pool)
        .await
    }

    /// Finds a run owned by the organization
    pub async fn find_for_organization(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Run>(
            r#"
            SELECT id, organization_id, query_id, status, started_at, finished_at,
                   result_count, lead_count
            FROM runs
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await
    }
}
