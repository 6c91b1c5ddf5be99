/// Authentication endpoints
///
/// - `POST /api/auth/signup` - Create an organization and its owner, start a session
/// - `POST /api/auth/login` - Start a session
/// - `POST /api/auth/logout` - End the presented session
///
/// Signup and login return the session token in the body and also set it as
/// the `DEKES_SESSION` cookie.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::user::UserProfile,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use dekes_shared::{
    auth::{
        middleware::{clear_session_cookie, client_ip, extract_token, session_cookie, user_agent},
        password,
    },
    models::{
        organization::{CreateOrganization, Organization},
        user::{normalize_email, CreateUser, User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked against the password policy after shape validation
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Organization name must be 1 to 100 characters"
    ))]
    pub organization_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Signup and login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,

    /// Session token; also set as a cookie
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".to_string())
}

/// Issues a session for `user` and builds the response with its cookie
async fn start_session(
    state: &AppState,
    headers: &HeaderMap,
    user: &User,
) -> ApiResult<impl IntoResponse> {
    let issued = state
        .sessions
        .create(user.id, client_ip(headers), user_agent(headers))
        .await?;

    let cookie = session_cookie(
        &issued.token,
        state.sessions.ttl().num_seconds(),
        state.production(),
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: UserProfile::from(user),
            token: issued.token,
        }),
    ))
}

/// Register a new organization and its owner
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/signup
/// Content-Type: application/json
///
/// {
///   "email": "a@x.com",
///   "password": "longenough1",
///   "name": "Ada",
///   "organizationName": "Acme"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user": {"id": "uuid", "email": "a@x.com", "name": "Ada", "organizationId": "uuid", "role": "ADMIN"},
///   "token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, weak password, or email already registered
/// - `500 Internal Server Error`: Server error
pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    req.validate()?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e.to_string(),
        }])
    })?;

    let email = normalize_email(&req.email);
    if User::email_exists(&state.db, &email).await? {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let organization_name = req
        .organization_name
        .unwrap_or_else(|| format!("{}'s Organization", email));

    // Owner and organization commit together
    let mut tx = state.db.begin().await?;

    let organization =
        Organization::create(&mut *tx, CreateOrganization::trial(organization_name)).await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            email,
            password_hash,
            name: req.name,
            role: UserRole::Admin,
            organization_id: organization.id,
        },
    )
    .await?;

    Organization::set_owner(&mut *tx, organization.id, user.id).await?;

    tx.commit().await?;

    info!(
        user_id = %user.id,
        organization_id = %organization.id,
        "User signed up"
    );

    start_session(&state, &headers, &user).await
}

/// Log in with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (same body for both)
/// - `403 Forbidden`: Account is not active
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    req.validate()?;

    let email = normalize_email(&req.email);

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!("Login failed: unknown email");
        return Err(invalid_credentials());
    };

    if !user.status.is_active() {
        warn!(user_id = %user.id, "Login refused: account not active");
        return Err(ApiError::Forbidden("Account is suspended".to_string()));
    }

    if !password::verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid_credentials());
    }

    User::update_last_login(&state.db, user.id).await?;

    info!(user_id = %user.id, "User logged in");

    start_session(&state, &headers, &user).await
}

/// End the presented session
///
/// Revoking an unknown or already revoked token still succeeds; only a
/// request carrying no token at all is rejected.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = extract_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

    let revoked = state.sessions.revoke(&token).await?;
    info!(revoked, "User logged out");

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(state.production()))],
        Json(LogoutResponse { success: true }),
    ))
}
