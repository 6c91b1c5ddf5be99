/// Carbon usage reports received from the optimization service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CarbonReport {
    pub id: Uuid,
    pub query_id: String,
    pub actual_co2: f64,
    pub reported_at: DateTime<Utc>,
    /// Request body as received
    pub raw: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCarbonReport {
    pub query_id: String,
    pub actual_co2: f64,
    pub reported_at: DateTime<Utc>,
    pub raw: JsonValue,
}

impl CarbonReport {
    pub async fn create(pool: &PgPool, data: CreateCarbonReport) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, CarbonReport>(
            r#"
            INSERT INTO carbon_reports (query_id, actual_co2, reported_at, raw)
            VALUES ($1, $2, $3, $4)
            RETURNING id, query_id, actual_co2, reported_at, raw, created_at
            "#,
        )
        .bind(data.query_id)
        .bind(data.actual_co2)
        .bind(data.reported_at)
        .bind(data.raw)
        .fetch_one(pool)
        .await
    }

    pub async fn list_by_query(pool: &PgPool, query_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CarbonReport>(
            r#"
            SELECT id, query_id, actual_co2, reported_at, raw, created_at
            FROM carbon_reports
            WHERE query_id = $1
            ORDER BY reported_at DESC
            "#,
        )
        .bind(query_id)
        .fetch_all(pool)
        .await
    }
}
