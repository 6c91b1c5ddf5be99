/// Lead endpoints
///
/// - `GET /api/leads` - The organization's newest leads
/// - `POST /api/leads/:id/outcome` - Record a review outcome for a lead
/// - `POST /api/leads/run` - Start a lead search run through the optimization service
///
/// All three run behind the session layer and only ever touch rows of the
/// caller's organization.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use dekes_shared::{
    auth::middleware::AuthContext,
    models::{
        lead::{Lead, LeadStatus, DEFAULT_LIST_LIMIT},
        query::Query,
        run::{Run, RunStatus},
    },
    optimization::{default_regions, OptimizeQuery, OptimizeRequest, OptimizeResponse},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_ESTIMATED_RESULTS: i64 = 100;
const DEFAULT_CARBON_BUDGET: f64 = 10_000.0;

#[derive(Debug, Serialize)]
pub struct LeadsResponse {
    pub leads: Vec<Lead>,
}

/// List the organization's 100 newest leads
pub async fn list_leads(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<LeadsResponse>> {
    let leads = Lead::list_recent(&state.db, auth.organization_id, DEFAULT_LIST_LIMIT).await?;

    Ok(Json(LeadsResponse { leads }))
}

/// Outcome request
#[derive(Debug, Deserialize)]
pub struct OutcomeRequest {
    /// One of `WON`, `LOST`, `CONTACTED`, `REJECTED`, `REVIEW`, `OUTREACH_READY`
    pub status: String,

    /// Stored on the audit event; defaults to `{}`
    pub meta: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub lead: Lead,
}

/// Parses a status a user may set on a lead
fn parse_outcome(status: &str) -> Option<LeadStatus> {
    serde_json::from_value::<LeadStatus>(JsonValue::String(status.to_string()))
        .ok()
        .filter(LeadStatus::is_outcome)
}

fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

/// Record a lead outcome
///
/// # Endpoint
///
/// ```text
/// POST /api/leads/:id/outcome
/// {"status": "WON", "meta": {"note": "signed"}}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown or non-outcome status
/// - `404 Not Found`: No such lead in the caller's organization
pub async fn update_outcome(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<OutcomeRequest>, JsonRejection>,
) -> ApiResult<Json<LeadResponse>> {
    let Json(req) = payload?;

    let status = parse_outcome(&req.status)
        .ok_or_else(|| ApiError::BadRequest("Invalid status".to_string()))?;

    let lead_id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let meta = match req.meta {
        Some(JsonValue::Null) | None => JsonValue::Object(Default::default()),
        Some(meta) => meta,
    };

    let lead = Lead::record_outcome(&state.db, auth.organization_id, lead_id, status, meta)
        .await?
        .ok_or_else(not_found)?;

    info!(
        lead_id = %lead.id,
        organization_id = %auth.organization_id,
        status = ?status,
        "Lead outcome recorded"
    );

    Ok(Json(LeadResponse { lead }))
}

fn default_estimated_results() -> i64 {
    DEFAULT_ESTIMATED_RESULTS
}

fn default_carbon_budget() -> f64 {
    DEFAULT_CARBON_BUDGET
}

/// Run request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Existing query to update; anything that is not one of the caller's
    /// queries results in a new query
    pub query_id: Option<String>,

    #[validate(length(min = 1, message = "Query is required"))]
    pub query: String,

    #[serde(default = "default_estimated_results")]
    #[validate(range(min = 1, max = 2147483647, message = "estimatedResults must be positive"))]
    pub estimated_results: i64,

    #[serde(default = "default_carbon_budget")]
    #[validate(range(exclusive_min = 0.0, message = "carbonBudget must be positive"))]
    pub carbon_budget: f64,

    #[serde(default = "default_regions")]
    #[validate(length(min = 1, message = "At least one region is required"))]
    pub regions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RunQuerySummary {
    pub id: Uuid,
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<Run> for RunSummary {
    fn from(run: Run) -> Self {
        Self {
            id: run.id,
            status: run.status,
            started_at: run.started_at,
            finished_at: run.finished_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub organization_id: Uuid,
    pub query: RunQuerySummary,
    pub run: RunSummary,
    pub optimization: OptimizeResponse,
}

/// Start a lead search run
///
/// The run is recorded as `STARTED` before the optimization service is
/// called and finished as `FINISHED` or `FAILED` afterwards, so a failed
/// call still leaves an audit trail.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `502 Bad Gateway`: The optimization service failed
pub async fn run_leads(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> ApiResult<Json<RunResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let query_text = req.query.trim();
    if query_text.is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }

    let requested_id = req
        .query_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok());

    let query =
        Query::upsert_for_run(&state.db, auth.organization_id, requested_id, query_text).await?;
    let run = Run::start(&state.db, auth.organization_id, query.id).await?;

    let request = OptimizeRequest {
        query: OptimizeQuery {
            id: query.id.to_string(),
            query: query.query.clone(),
            estimated_results: req.estimated_results,
        },
        carbon_budget: req.carbon_budget,
        regions: req.regions,
    };

    let optimization = match state.ecobe.optimize(&request).await {
        Ok(optimization) => optimization,
        Err(e) => {
            error!(
                run_id = %run.id,
                organization_id = %auth.organization_id,
                error = %e,
                "Optimization failed"
            );
            Run::finish(&state.db, auth.organization_id, run.id, RunStatus::Failed, 0, 0).await?;
            return Err(ApiError::from(e).for_environment(state.production()));
        }
    };

    let result_count = i32::try_from(req.estimated_results).unwrap_or(i32::MAX);
    let run = Run::finish(
        &state.db,
        auth.organization_id,
        run.id,
        RunStatus::Finished,
        result_count,
        0,
    )
    .await?
    .unwrap_or(run);

    info!(
        run_id = %run.id,
        query_id = %query.id,
        selected_region = %optimization.selected_region,
        "Lead run finished"
    );

    Ok(Json(RunResponse {
        organization_id: auth.organization_id,
        query: RunQuerySummary {
            id: query.id,
            query: query.query,
        },
        run: run.into(),
        optimization,
    }))
}
