/// Session store
///
/// Rows bind an opaque bearer token to a user, an expiry, and the client that
/// created it. Only the SHA-256 digest of the token is persisted; lookups hash
/// the presented token and match the digest exactly.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token_hash VARCHAR(64) NOT NULL UNIQUE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     ip_address VARCHAR(255),
///     user_agent TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use super::organization::{OrganizationPlan, OrganizationStatus};
use super::user::{UserRole, UserStatus};

/// Session row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a session row
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Session joined with its user and that user's organization
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionWithUser {
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

/// Hex-encoded SHA-256 digest of a session token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

impl Session {
    /// Inserts a new session row
    pub async fn create(pool: &PgPool, data: CreateSession) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, token_hash, expires_at, ip_address, user_agent, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.token_hash)
        .bind(data.expires_at)
        .bind(data.ip_address)
        .bind(data.user_agent)
        .fetch_one(pool)
        .await
    }

    /// Looks up a session by token digest, hydrated with user and organization
    pub async fn find_with_user_by_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<SessionWithUser>, sqlx::Error> {
        sqlx::query_as::<_, SessionWithUser>(
            r#"
            SELECT s.id AS session_id,
                   s.expires_at,
                   u.id AS user_id,
                   u.email,
                   u.name,
                   u.role,
                   u.status AS user_status,
                   o.id AS organization_id,
                   o.name AS organization_name,
                   o.plan AS organization_plan,
                   o.status AS organization_status
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            JOIN organizations o ON o.id = u.organization_id
            WHERE s.token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a session by ID
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the session matching a token digest; zero rows is not an error
    pub async fn delete_by_token_hash(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_deterministic_hex() {
        let hash = hash_token("some.jwt.token");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_token("some.jwt.token"));
        assert_ne!(hash, hash_token("some.jwt.tokem"));
    }
}
