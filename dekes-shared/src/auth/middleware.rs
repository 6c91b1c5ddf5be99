/// Request authentication for Axum
///
/// Every protected route resolves its caller the same way:
///
/// 1. [`extract_token`] picks the candidate token: an `Authorization: Bearer`
///    header wins, the `DEKES_SESSION` cookie is the fallback.
/// 2. [`resolve_session`] validates it with the [`SessionManager`] and
///    produces an [`AuthContext`], or an [`AuthRejection`].
///
/// The API inserts the `AuthContext` into request extensions; handlers take
/// the tenant (`organization_id`) from it and from nowhere else.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use dekes_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}, Organization: {}", auth.user_id, auth.organization_id)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::session::{AuthenticatedSession, SessionManager};
use crate::models::user::UserRole;

/// Name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "DEKES_SESSION";

/// Authentication context added to request extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub session_id: Uuid,
    pub user_id: Uuid,

    /// Tenant for every data access made on behalf of this request
    pub organization_id: Uuid,

    pub email: String,
    pub role: UserRole,
    pub name: Option<String>,
}

impl From<AuthenticatedSession> for AuthContext {
    fn from(session: AuthenticatedSession) -> Self {
        Self {
            session_id: session.session_id,
            user_id: session.user_id,
            organization_id: session.organization_id,
            email: session.email,
            role: session.role,
            name: session.name,
        }
    }
}

/// Why a request could not be authenticated
#[derive(Debug)]
pub enum AuthRejection {
    /// No bearer header and no session cookie; nothing was looked up
    MissingCredentials,

    /// A token was presented but did not resolve to a live session
    InvalidSession,

    /// The session store failed
    Internal(String),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::MissingCredentials | AuthRejection::InvalidSession => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized", "message": "Unauthorized" })),
            )
                .into_response(),
            AuthRejection::Internal(msg) => {
                tracing::error!("Session lookup failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "internal_error",
                        "message": "An internal error occurred"
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// Returns the bearer token from the `Authorization` header
///
/// The scheme is matched case-insensitively; an empty token counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Returns the value of a cookie from any `Cookie` header
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Picks the candidate session token: bearer header first, then cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers)
        .or_else(|| cookie_value(headers, SESSION_COOKIE_NAME))
        .map(str::to_string)
}

/// Authenticates a request from its headers
pub async fn resolve_session(
    sessions: &SessionManager,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthRejection> {
    let token = extract_token(headers).ok_or(AuthRejection::MissingCredentials)?;

    match sessions.validate(&token).await {
        Ok(Some(session)) => Ok(AuthContext::from(session)),
        Ok(None) => Err(AuthRejection::InvalidSession),
        Err(e) => Err(AuthRejection::Internal(e.to_string())),
    }
}

/// Builds the `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE_NAME, token, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Client IP from the first `X-Forwarded-For` entry
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)?
        .to_str()
        .ok()
        .map(str::to_string)
}
