/// Carbon usage reports from the optimization service
///
/// ```text
/// POST /api/carbon/report
/// Authorization: Bearer <DEKES_API_KEY>
///
/// {"queryId": "uuid", "actualCO2": 12.5, "timestamp": "2025-01-01T00:00:00Z"}
/// ```
///
/// ```json
/// {"received": true, "queryId": "uuid"}
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use dekes_shared::{
    auth::shared_secret::verify_bearer_secret,
    models::carbon_report::{CarbonReport, CreateCarbonReport},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct CarbonReportRequest {
    #[serde(rename = "queryId")]
    pub query_id: String,

    #[serde(rename = "actualCO2")]
    pub actual_co2: f64,

    /// RFC 3339; missing or unparsable means "now"
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CarbonReportResponse {
    pub received: bool,

    #[serde(rename = "queryId")]
    pub query_id: String,
}

fn reported_at(timestamp: Option<&str>) -> DateTime<Utc> {
    timestamp
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Store a carbon report
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or wrong shared secret
/// - `400 Bad Request`: Body is not a report
/// - `500 Internal Server Error`: `DEKES_API_KEY` not configured
pub async fn report(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<Json<CarbonReportResponse>> {
    let expected = state.config.reporting_api_key.as_deref().ok_or_else(|| {
        ApiError::misconfigured("Server not configured", "DEKES_API_KEY is not set")
            .for_environment(state.production())
    })?;

    if !verify_bearer_secret(&headers, expected) {
        warn!("Rejected carbon report: bad shared secret");
        return Err(ApiError::Unauthorized("Unauthorized".to_string()));
    }

    let Json(raw) = payload?;
    let req: CarbonReportRequest = serde_json::from_value(raw.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid report: {}", e)))?;

    let report = CarbonReport::create(
        &state.db,
        CreateCarbonReport {
            query_id: req.query_id,
            actual_co2: req.actual_co2,
            reported_at: reported_at(req.timestamp.as_deref()),
            raw,
        },
    )
    .await?;

    info!(
        query_id = %report.query_id,
        actual_co2 = report.actual_co2,
        "Carbon report stored"
    );

    Ok(Json(CarbonReportResponse {
        received: true,
        query_id: report.query_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_at_parses_rfc3339() {
        let ts = reported_at(Some("2025-01-01T12:00:00+02:00"));
        assert_eq!(ts.to_rfc3339(), "2025-01-01T10:00:00+00:00");
    }

    #[test]
    fn test_reported_at_falls_back_to_now() {
        let before = Utc::now();
        let ts = reported_at(Some("yesterday"));
        assert!(ts >= before);

        assert!(reported_at(None) >= before);
    }

    #[test]
    fn test_request_field_names() {
        let req: CarbonReportRequest =
            serde_json::from_str(r#"{"queryId": "q-1", "actualCO2": 3.5}"#).unwrap();
        assert_eq!(req.query_id, "q-1");
        assert_eq!(req.actual_co2, 3.5);
        assert!(req.timestamp.is_none());
    }
}
