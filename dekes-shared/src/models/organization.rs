/// Organization model and database operations
///
/// An organization is the tenant boundary: every user belongs to exactly one,
/// and every query, run, and lead is owned by one. Billing state (plan,
/// subscription status, Stripe identifiers) lives here as well.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug VARCHAR(255) NOT NULL UNIQUE,
///     owner_id UUID REFERENCES users(id),
///     plan TEXT NOT NULL DEFAULT 'FREE',
///     status TEXT NOT NULL DEFAULT 'TRIAL',
///     monthly_lead_quota INTEGER NOT NULL DEFAULT 100,
///     stripe_customer_id VARCHAR(255) UNIQUE,
///     stripe_subscription_id VARCHAR(255),
///     stripe_price_id VARCHAR(255),
///     stripe_current_period_end TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use dekes_shared::models::organization::{CreateOrganization, Organization};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let org = Organization::create(&pool, CreateOrganization::trial("Acme")).await?;
/// assert_eq!(org.monthly_lead_quota, 100);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const ORGANIZATION_COLUMNS: &str = "id, name, slug, owner_id, plan, status, monthly_lead_quota, \
     stripe_customer_id, stripe_subscription_id, stripe_price_id, stripe_current_period_end, \
     created_at, updated_at";

/// Billing plan of an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationPlan {
    /// Default plan for new organizations
    Free,

    /// 100 qualified leads/month
    Starter,

    /// 500 qualified leads/month
    Professional,

    /// Custom volume
    Enterprise,
}

impl OrganizationPlan {
    /// Converts plan to its stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationPlan::Free => "FREE",
            OrganizationPlan::Starter => "STARTER",
            OrganizationPlan::Professional => "PROFESSIONAL",
            OrganizationPlan::Enterprise => "ENTERPRISE",
        }
    }

    /// Parses a plan from its stored representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FREE" => Some(OrganizationPlan::Free),
            "STARTER" => Some(OrganizationPlan::Starter),
            "PROFESSIONAL" => Some(OrganizationPlan::Professional),
            "ENTERPRISE" => Some(OrganizationPlan::Enterprise),
            _ => None,
        }
    }

    /// Monthly lead quota granted by the plan
    pub fn monthly_lead_quota(&self) -> i32 {
        match self {
            OrganizationPlan::Free => 100,
            OrganizationPlan::Starter => 100,
            OrganizationPlan::Professional => 500,
            OrganizationPlan::Enterprise => 10_000,
        }
    }

    /// Whether the plan is sold through a Stripe subscription
    pub fn is_paid(&self) -> bool {
        !matches!(self, OrganizationPlan::Free)
    }
}

/// Billing status of an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationStatus {
    /// Newly created, no subscription yet
    Trial,

    /// Subscription in good standing
    Active,

    /// Provider reported a non-active subscription
    PastDue,

    /// Subscription deleted
    Canceled,
}

impl OrganizationStatus {
    /// Converts status to its stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationStatus::Trial => "TRIAL",
            OrganizationStatus::Active => "ACTIVE",
            OrganizationStatus::PastDue => "PAST_DUE",
            OrganizationStatus::Canceled => "CANCELED",
        }
    }
}

/// Organization (tenant) model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Unique organization ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// URL-safe unique identifier
    pub slug: String,

    /// Owning user (set in the same transaction that creates the owner)
    pub owner_id: Option<Uuid>,

    /// Current billing plan
    pub plan: OrganizationPlan,

    /// Current billing status
    pub status: OrganizationStatus,

    /// Leads allowed per month under the current plan
    pub monthly_lead_quota: i32,

    /// Stripe customer ID, created lazily at first checkout
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,

    /// Stripe subscription ID
    #[serde(skip_serializing)]
    pub stripe_subscription_id: Option<String>,

    /// Stripe price ID of the active subscription
    #[serde(skip_serializing)]
    pub stripe_price_id: Option<String>,

    /// End of the current billing period as reported by Stripe
    pub stripe_current_period_end: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
    pub plan: OrganizationPlan,
    pub status: OrganizationStatus,
    pub monthly_lead_quota: i32,
}

impl CreateOrganization {
    /// Free-plan trial organization with a freshly generated slug
    pub fn trial(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: generate_slug(),
            plan: OrganizationPlan::Free,
            status: OrganizationStatus::Trial,
            monthly_lead_quota: OrganizationPlan::Free.monthly_lead_quota(),
        }
    }
}

/// Generates a unique-enough slug of the form `org-<unix millis>-<9 chars>`
pub fn generate_slug() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();

    format!("org-{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Billing fields written when a checkout completes
#[derive(Debug, Clone)]
pub struct SubscriptionActivation {
    pub plan: OrganizationPlan,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
}

impl Organization {
    /// Creates a new organization
    ///
    /// Accepts any executor so signup can run it inside a transaction.
    pub async fn create<'e, E>(executor: E, data: CreateOrganization) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO organizations (name, slug, plan, status, monthly_lead_quota) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ORGANIZATION_COLUMNS}"
        );

        sqlx::query_as::<_, Organization>(&query)
            .bind(data.name)
            .bind(data.slug)
            .bind(data.plan)
            .bind(data.status)
            .bind(data.monthly_lead_quota)
            .fetch_one(executor)
            .await
    }

    /// Records the owning user
    pub async fn set_owner<'e, E>(executor: E, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE organizations SET owner_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(owner_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Finds an organization by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE id = $1");

        sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds an organization by its Stripe customer ID
    pub async fn find_by_stripe_customer_id(
        pool: &PgPool,
        customer_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE stripe_customer_id = $1"
        );

        sqlx::query_as::<_, Organization>(&query)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Counts organizations (used by tests asserting signup atomicity)
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Stores the Stripe customer created for this organization
    pub async fn set_stripe_customer_id(
        pool: &PgPool,
        id: Uuid,
        customer_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE organizations SET stripe_customer_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(customer_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Activates a paid subscription after a completed checkout
    pub async fn activate_subscription(
        pool: &PgPool,
        id: Uuid,
        activation: SubscriptionActivation,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE organizations \
             SET plan = $2, status = $3, monthly_lead_quota = $4, \
                 stripe_subscription_id = $5, stripe_price_id = $6, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ORGANIZATION_COLUMNS}"
        );

        sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .bind(activation.plan)
            .bind(OrganizationStatus::Active)
            .bind(activation.plan.monthly_lead_quota())
            .bind(activation.stripe_subscription_id)
            .bind(activation.stripe_price_id)
            .fetch_optional(pool)
            .await
    }

    /// Applies a subscription status change reported by the billing provider
    pub async fn update_subscription_status(
        pool: &PgPool,
        id: Uuid,
        status: OrganizationStatus,
        current_period_end: Option<DateTime<Utc>>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET status = $2,
                stripe_current_period_end = COALESCE($3, stripe_current_period_end),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(current_period_end)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Resets the organization to the free plan after its subscription is deleted
    pub async fn cancel_subscription(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET plan = $2,
                status = $3,
                monthly_lead_quota = $4,
                stripe_subscription_id = NULL,
                stripe_price_id = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(OrganizationPlan::Free)
        .bind(OrganizationStatus::Canceled)
        .bind(OrganizationPlan::Free.monthly_lead_quota())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes an organization and, by cascade, everything it owns
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
