/// Billing endpoints
///
/// - `POST /api/stripe/create-checkout` - Start a subscription checkout (session auth)
/// - `POST /api/webhooks/stripe` - Receive Stripe events (signature auth)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::Utc;
use dekes_shared::{
    auth::middleware::AuthContext,
    billing::{
        plan::parse_paid_plan,
        stripe::CheckoutSessionParams,
        webhook::{apply_event, verify_signature, WebhookEvent, WebhookOutcome},
        StripeClient,
    },
    models::organization::Organization,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// `STARTER`, `PROFESSIONAL` or `ENTERPRISE`
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

fn stripe_client(state: &AppState) -> ApiResult<&StripeClient> {
    state.stripe.as_ref().ok_or_else(|| {
        ApiError::misconfigured("Stripe not configured", "STRIPE_SECRET_KEY is not set")
            .for_environment(state.production())
    })
}

/// Create a subscription checkout session for the caller's organization
///
/// # Endpoint
///
/// ```text
/// POST /api/stripe/create-checkout
/// {"plan": "PROFESSIONAL"}
/// ```
///
/// # Response
///
/// ```json
/// {"url": "https://checkout.stripe.com/c/pay/cs_..."}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown plan, or no price configured for it
/// - `404 Not Found`: Organization no longer exists
/// - `500 Internal Server Error`: Stripe not configured
/// - `502 Bad Gateway`: Stripe request failed
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<Json<CheckoutResponse>> {
    let stripe = stripe_client(&state)?;
    let Json(req) = payload?;
    let production = state.production();

    let plan = parse_paid_plan(&req.plan)
        .ok_or_else(|| ApiError::BadRequest("Invalid plan".to_string()))?;

    let organization = Organization::find_by_id(&state.db, auth.organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    let price = state
        .config
        .stripe
        .prices
        .price_for(plan)
        .ok_or_else(|| ApiError::BadRequest("Plan not configured".to_string()))?
        .to_string();

    let customer = match organization.stripe_customer_id {
        Some(customer) => customer,
        None => {
            let organization_id = organization.id.to_string();
            let customer = stripe
                .create_customer(&auth.email, &[("organizationId", organization_id.as_str())])
                .await
                .map_err(|e| ApiError::from(e).for_environment(production))?;

            Organization::set_stripe_customer_id(&state.db, organization.id, &customer.id).await?;
            customer.id
        }
    };

    let app_url = &state.config.api.app_url;
    let session = stripe
        .create_checkout_session(CheckoutSessionParams {
            customer,
            price,
            success_url: format!("{}/dashboard?success=true", app_url),
            cancel_url: format!("{}/dashboard?canceled=true", app_url),
            metadata: vec![
                ("organizationId".to_string(), organization.id.to_string()),
                ("plan".to_string(), plan.as_str().to_string()),
            ],
        })
        .await
        .map_err(|e| ApiError::from(e).for_environment(production))?;

    let url = session.url.ok_or_else(|| {
        ApiError::upstream("Billing provider request failed", "checkout session has no url")
            .for_environment(production)
    })?;

    info!(
        organization_id = %organization.id,
        plan = plan.as_str(),
        checkout_session_id = %session.id,
        "Checkout session created"
    );

    Ok(Json(CheckoutResponse { url }))
}

/// Receive a Stripe webhook
///
/// The raw body is authenticated against the `Stripe-Signature` header
/// before anything in it is parsed.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or invalid signature, or unparsable event
/// - `500 Internal Server Error`: Webhook secret not configured
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let production = state.production();

    let secret = state.config.stripe.webhook_secret.as_deref().ok_or_else(|| {
        ApiError::misconfigured("Server not configured", "STRIPE_WEBHOOK_SECRET is not set")
            .for_environment(production)
    })?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing signature".to_string()))?;

    if let Err(e) = verify_signature(&body, signature, secret, Utc::now().timestamp()) {
        warn!(reason = %e, "Rejected webhook signature");
        return Err(ApiError::from(e).for_environment(production));
    }

    let event = WebhookEvent::parse(&body)?;
    let event_id = event.id.clone();
    let billing_event = event.into_billing_event()?;

    // Only checkout completion calls back into Stripe
    let outcome = apply_event(&state.db, state.stripe.as_ref(), billing_event)
        .await
        .map_err(|e| ApiError::from(e).for_environment(production))?;

    match outcome {
        WebhookOutcome::Applied { organization_id } => {
            info!(event_id = %event_id, organization_id = %organization_id, "Webhook applied");
        }
        WebhookOutcome::Skipped(reason) => {
            info!(event_id = %event_id, reason, "Webhook skipped");
        }
        WebhookOutcome::Ignored(event_type) => {
            debug!(event_id = %event_id, event_type = %event_type, "Webhook ignored");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}
