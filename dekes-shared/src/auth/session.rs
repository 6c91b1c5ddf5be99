/// Session manager
///
/// Issues, validates and revokes bearer sessions. A session is a signed token
/// (see [`crate::auth::token`]) plus a row in `sessions` keyed by the token's
/// digest. Both must hold for a session to be valid, and the row's
/// `expires_at` is the only expiry that counts: validation deletes expired
/// rows as it finds them.
///
/// # Example
///
/// ```no_run
/// use dekes_shared::auth::session::{SessionConfig, SessionManager};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let sessions = SessionManager::new(pool, SessionConfig::new("a-secret-of-at-least-32-bytes!!"));
///
/// let issued = sessions.create(user_id, None, None).await?;
/// assert!(sessions.validate(&issued.token).await?.is_some());
///
/// sessions.revoke(&issued.token).await?;
/// assert!(sessions.validate(&issued.token).await?.is_none());
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::token::{create_token, validate_token, SessionClaims, TokenError};
use crate::models::organization::{OrganizationPlan, OrganizationStatus};
use crate::models::session::{hash_token, CreateSession, Session};
use crate::models::user::{User, UserRole, UserStatus};

/// Default session lifetime
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Session manager configuration
#[derive(Clone)]
pub struct SessionConfig {
    /// HS256 signing secret
    pub secret: String,

    /// Lifetime of newly issued sessions
    pub ttl: Duration,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::days(DEFAULT_SESSION_TTL_DAYS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A validated session with its user and organization
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub user_status: UserStatus,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub organization_plan: OrganizationPlan,
    pub organization_status: OrganizationStatus,
}

/// Issues and checks sessions; cheap to clone
#[derive(Debug, Clone)]
pub struct SessionManager {
    pool: PgPool,
    config: Arc<SessionConfig>,
}

impl SessionManager {
    pub fn new(pool: PgPool, config: SessionConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Issues a session for a user
    ///
    /// # Errors
    ///
    /// - `SessionError::UserNotFound` if the user does not exist
    /// - `SessionError::Token` if signing fails
    /// - `SessionError::Database` on datastore failure
    pub async fn create(
        &self,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<IssuedSession, SessionError> {
        let user = User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(SessionError::UserNotFound)?;

        let claims = SessionClaims::new(user.id, &user.email, user.organization_id, self.config.ttl);
        let token = create_token(&claims, &self.config.secret)?;
        let expires_at = Utc::now() + self.config.ttl;

        let session = Session::create(
            &self.pool,
            CreateSession {
                user_id: user.id,
                token_hash: hash_token(&token),
                expires_at,
                ip_address,
                user_agent,
            },
        )
        .await?;

        info!(user_id = %user.id, session_id = %session.id, "Session created");

        Ok(IssuedSession {
            token,
            session_id: session.id,
            expires_at: session.expires_at,
        })
    }

    /// Resolves a token to its session
    ///
    /// Returns `Ok(None)` for a bad signature, an unknown or revoked token, an
    /// expired session (whose row is deleted), or a subject that does not
    /// match the session's user. `Err` is reserved for datastore failures.
    pub async fn validate(&self, token: &str) -> Result<Option<AuthenticatedSession>, SessionError> {
        let claims = match validate_token(token, &self.config.secret) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                return Ok(None);
            }
        };

        let Some(row) = Session::find_with_user_by_token_hash(&self.pool, &hash_token(token)).await?
        else {
            return Ok(None);
        };

        if row.expires_at <= Utc::now() {
            Session::delete(&self.pool, row.session_id).await?;
            debug!(session_id = %row.session_id, "Deleted expired session");
            return Ok(None);
        }

        if claims.sub != row.user_id {
            return Ok(None);
        }

        Ok(Some(AuthenticatedSession {
            session_id: row.session_id,
            expires_at: row.expires_at,
            user_id: row.user_id,
            email: row.email,
            name: row.name,
            role: row.role,
            user_status: row.user_status,
            organization_id: row.organization_id,
            organization_name: row.organization_name,
            organization_plan: row.organization_plan,
            organization_status: row.organization_status,
        }))
    }

    /// Deletes the session for a token
    ///
    /// Returns whether a row was removed. Unknown tokens are not an error.
    pub async fn revoke(&self, token: &str) -> Result<bool, SessionError> {
        let removed = Session::delete_by_token_hash(&self.pool, &hash_token(token)).await?;
        if removed {
            info!("Session revoked");
        }
        Ok(removed)
    }
}
