/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`; the error converts to a JSON body
/// `{error, message}` with the matching status. Errors from the shared crate
/// convert with `?`.
///
/// Upstream and misconfiguration errors carry an optional `detail` that is
/// only meant for development. Call [`ApiError::for_environment`] before
/// returning one so production responses never include it.
///
/// # Example
///
/// ```
/// use dekes_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Not found".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dekes_shared::auth::middleware::AuthRejection;
use dekes_shared::auth::password::PasswordError;
use dekes_shared::auth::session::SessionError;
use dekes_shared::billing::{BillingError, WebhookError};
use dekes_shared::optimization::OptimizationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404), including rows owned by another organization
    NotFound(String),

    /// Request body failed validation (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// A remote service failed (502)
    Upstream {
        message: String,
        detail: Option<String>,
    },

    /// Required server configuration is missing (500)
    Misconfigured {
        message: String,
        detail: Option<String>,
    },

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,

    /// Development-only diagnostic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn upstream(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::Upstream {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn misconfigured(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::Misconfigured {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    /// Drops development detail when running in production
    pub fn for_environment(self, production: bool) -> Self {
        if !production {
            return self;
        }

        match self {
            ApiError::Upstream { message, .. } => ApiError::Upstream {
                message,
                detail: None,
            },
            ApiError::Misconfigured { message, .. } => ApiError::Misconfigured {
                message,
                detail: None,
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Misconfigured { .. } | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Upstream { message, .. } => write!(f, "Upstream failure: {}", message),
            ApiError::Misconfigured { message, .. } => write!(f, "Misconfigured: {}", message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details, detail) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None, None),
            ApiError::NotFound(msg) => ("not_found", msg, None, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
                None,
            ),
            ApiError::Upstream { message, detail } => {
                tracing::warn!(detail = ?detail, "Upstream failure: {}", message);
                ("upstream_error", message, None, detail)
            }
            ApiError::Misconfigured { message, detail } => {
                tracing::error!(detail = ?detail, "Server misconfigured: {}", message);
                ("server_misconfigured", message, None, detail)
            }
            ApiError::InternalError(msg) => {
                // Logged here; clients only see the generic message
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
            detail,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Not found".to_string()),
            sqlx::Error::Database(db_err)
                if db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT) =>
            {
                ApiError::BadRequest("Email already registered".to_string())
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthRejection> for ApiError {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::MissingCredentials | AuthRejection::InvalidSession => {
                ApiError::Unauthorized("Unauthorized".to_string())
            }
            AuthRejection::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Weak passwords are the caller's fault; everything else is ours
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(msg) => ApiError::BadRequest(msg),
            other => ApiError::InternalError(format!("Password operation failed: {}", other)),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Database(db_err) => ApiError::from(db_err),
            other => ApiError::InternalError(format!("Session operation failed: {}", other)),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError::upstream("Billing provider request failed", err.to_string())
    }
}

impl From<OptimizationError> for ApiError {
    fn from(err: OptimizationError) -> Self {
        ApiError::upstream("Optimization service request failed", err.to_string())
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            e if e.is_signature_error() => ApiError::BadRequest("Invalid signature".to_string()),
            WebhookError::InvalidPayload(msg) => {
                tracing::warn!("Rejected webhook payload: {}", msg);
                ApiError::BadRequest("Invalid payload".to_string())
            }
            WebhookError::InvalidSecret => {
                ApiError::misconfigured("Server not configured", "webhook secret is unusable")
            }
            WebhookError::StripeNotConfigured => {
                ApiError::misconfigured("Stripe not configured", "STRIPE_SECRET_KEY is not set")
            }
            WebhookError::Billing(billing) => ApiError::from(billing),
            WebhookError::Database(db_err) => ApiError::from(db_err),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}
