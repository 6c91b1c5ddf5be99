/// Current user endpoint
///
/// ```text
/// GET /api/user/me
/// Authorization: Bearer <token>
/// ```
///
/// ```json
/// {
///   "user": {"id": "uuid", "email": "a@x.com", "name": null, "organizationId": "uuid", "role": "ADMIN"},
///   "organization": {"id": "uuid", "name": "Acme", "plan": "FREE", "status": "TRIAL", "monthlyLeadQuota": 100},
///   "stats": {"leads": 12, "qualified": 5, "won": 2, "conversion": 16.67}
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use dekes_shared::{
    auth::middleware::AuthContext,
    models::{
        lead::{Lead, LeadStats},
        organization::{Organization, OrganizationPlan, OrganizationStatus},
        user::{User, UserRole},
    },
};
use serde::Serialize;
use uuid::Uuid;

/// Public view of a user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub organization_id: Uuid,
    pub role: UserRole,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            organization_id: user.organization_id,
            role: user.role,
        }
    }
}

impl From<&AuthContext> for UserProfile {
    fn from(auth: &AuthContext) -> Self {
        Self {
            id: auth.user_id,
            email: auth.email.clone(),
            name: auth.name.clone(),
            organization_id: auth.organization_id,
            role: auth.role,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub plan: OrganizationPlan,
    pub status: OrganizationStatus,
    pub monthly_lead_quota: i32,
}

impl From<Organization> for OrganizationSummary {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            plan: org.plan,
            status: org.status,
            monthly_lead_quota: org.monthly_lead_quota,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserProfile,
    pub organization: OrganizationSummary,
    pub stats: LeadStats,
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let organization = Organization::find_by_id(&state.db, auth.organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    let stats = Lead::stats(&state.db, auth.organization_id).await?;

    Ok(Json(MeResponse {
        user: UserProfile::from(&auth),
        organization: organization.into(),
        stats,
    }))
}
