/// Client for the ECOBE carbon-aware optimization service
///
/// Before a lead search runs, ECOBE picks the execution region and reports
/// the expected carbon cost. One call per run, single attempt, explicit
/// timeout.
///
/// # Example
///
/// ```no_run
/// use dekes_shared::optimization::{EcobeClient, EcobeConfig, OptimizeQuery, OptimizeRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let ecobe = EcobeClient::new(EcobeConfig::default())?;
///
/// let response = ecobe
///     .optimize(&OptimizeRequest {
///         query: OptimizeQuery {
///             id: "query-id".to_string(),
///             query: "b2b saas buyers".to_string(),
///             estimated_results: 100,
///         },
///         carbon_budget: 10_000.0,
///         regions: vec!["FR".to_string(), "DE".to_string()],
///     })
///     .await?;
///
/// println!("selected region: {}", response.selected_region);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

pub const DEFAULT_ECOBE_BASE_URL: &str = "http://localhost:3000";

pub const DEFAULT_ECOBE_TIMEOUT: Duration = Duration::from_secs(30);

const OPTIMIZE_PATH: &str = "/api/v1/dekes/optimize";

/// Regions offered to the optimizer when the caller names none
pub fn default_regions() -> Vec<String> {
    ["US-CAL-CISO", "FR", "DE"].map(String::from).to_vec()
}

/// Error type for optimization calls
#[derive(Debug, thiserror::Error)]
pub enum OptimizationError {
    /// Transport failure (connect, timeout, body read)
    #[error("Optimization request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response; `body` is the raw response text
    #[error("Optimization service returned {status}: {body}")]
    Remote { status: u16, body: String },

    /// Success response that is not a valid optimization result
    #[error("Invalid optimization response: {0}")]
    InvalidResponse(String),
}

/// ECOBE client configuration
#[derive(Clone)]
pub struct EcobeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EcobeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ECOBE_BASE_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_ECOBE_TIMEOUT,
        }
    }
}

impl EcobeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for EcobeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcobeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeQuery {
    pub id: String,
    pub query: String,
    pub estimated_results: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    pub query: OptimizeQuery,
    pub carbon_budget: f64,
    pub regions: Vec<String>,
}

/// Optimization result; fields this service does not model are kept in `extra`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResponse {
    #[serde(rename = "selectedRegion")]
    pub selected_region: String,

    #[serde(rename = "estimatedCO2", default, skip_serializing_if = "Option::is_none")]
    pub estimated_co2: Option<f64>,

    #[serde(rename = "scheduledTime", default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// ECOBE HTTP client; cheap to clone
#[derive(Debug, Clone)]
pub struct EcobeClient {
    http: Client,
    config: Arc<EcobeConfig>,
}

impl EcobeClient {
    pub fn new(config: EcobeConfig) -> Result<Self, OptimizationError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Asks the service where and when to run a query
    pub async fn optimize(
        &self,
        request: &OptimizeRequest,
    ) -> Result<OptimizeResponse, OptimizationError> {
        let url = format!("{}{}", self.config.base_url, OPTIMIZE_PATH);

        let mut builder = self.http.post(&url).json(request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OptimizationError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let optimized: OptimizeResponse = serde_json::from_str(&body)
            .map_err(|e| OptimizationError::InvalidResponse(e.to_string()))?;

        debug!(
            query_id = %request.query.id,
            selected_region = %optimized.selected_region,
            "Query optimized"
        );

        Ok(optimized)
    }
}
