/// Stripe webhook verification and event application
///
/// The `Stripe-Signature` header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`.
/// Each `v1` is an HMAC-SHA256 over `"<t>.<raw body>"` keyed with the endpoint
/// secret. A payload is accepted when any `v1` matches and `t` is within
/// [`SIGNATURE_TOLERANCE_SECS`] of now. Nothing in the payload is parsed
/// before the signature checks out.
///
/// # Example
///
/// ```
/// use dekes_shared::billing::webhook::{sign_payload, verify_signature};
///
/// let payload = br#"{"id":"evt_1","type":"ping","data":{"object":{}}}"#;
/// let now = 1_700_000_000;
/// let header = sign_payload(payload, "whsec_test", now).unwrap();
///
/// assert!(verify_signature(payload, &header, "whsec_test", now).is_ok());
/// assert!(verify_signature(payload, &header, "whsec_other", now).is_err());
/// ```

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sha2::Sha256;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::plan::parse_paid_plan;
use super::stripe::{BillingError, CheckoutSession, StripeClient};
use crate::models::organization::{Organization, OrganizationStatus, SubscriptionActivation};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age (either direction) of a signature timestamp
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Error type for webhook handling
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("No matching signature")]
    SignatureMismatch,

    #[error("Webhook secret cannot be used as an HMAC key")]
    InvalidSecret,

    #[error("Checkout event needs a Stripe client but none is configured")]
    StripeNotConfigured,

    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl WebhookError {
    /// Whether the error means the request was not authentic
    pub fn is_signature_error(&self) -> bool {
        matches!(
            self,
            WebhookError::MalformedHeader
                | WebhookError::StaleTimestamp
                | WebhookError::SignatureMismatch
        )
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verifies a `Stripe-Signature` header against the raw body
///
/// `now` is the current Unix time, passed in so callers and tests agree on
/// the clock.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };

        match key {
            "t" => {
                timestamp = Some(value.parse().map_err(|_| WebhookError::MalformedHeader)?);
            }
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }

    if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(WebhookError::StaleTimestamp);
    }

    let mac = mac_for(secret, timestamp, payload)?;
    let matched = signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok());

    if matched {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Builds a valid `Stripe-Signature` header for a payload
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookError> {
    let signature = hex::encode(mac_for(secret, timestamp, payload)?.finalize().into_bytes());
    Ok(format!("t={},v1={}", timestamp, signature))
}

/// Raw webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: JsonValue,
}

/// Subscription object carried by `customer.subscription.*` events
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

impl Subscription {
    /// Organization status implied by the provider's subscription status
    pub fn organization_status(&self) -> OrganizationStatus {
        match self.status.as_str() {
            "active" | "trialing" => OrganizationStatus::Active,
            _ => OrganizationStatus::PastDue,
        }
    }

    pub fn current_period_end_at(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

/// Events the billing flow acts on
#[derive(Debug, Clone)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutSession),
    SubscriptionUpdated(Subscription),
    SubscriptionDeleted(Subscription),
    Other(String),
}

impl WebhookEvent {
    /// Parses an already-verified payload
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    pub fn into_billing_event(self) -> Result<BillingEvent, WebhookError> {
        let object = self.data.object;
        let invalid = |e: serde_json::Error| WebhookError::InvalidPayload(e.to_string());

        Ok(match self.event_type.as_str() {
            "checkout.session.completed" => {
                BillingEvent::CheckoutCompleted(serde_json::from_value(object).map_err(invalid)?)
            }
            "customer.subscription.updated" => {
                BillingEvent::SubscriptionUpdated(serde_json::from_value(object).map_err(invalid)?)
            }
            "customer.subscription.deleted" => {
                BillingEvent::SubscriptionDeleted(serde_json::from_value(object).map_err(invalid)?)
            }
            _ => BillingEvent::Other(self.event_type),
        })
    }
}

/// What applying an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Organization billing state was updated
    Applied { organization_id: Uuid },

    /// Recognized event without a matching organization or usable metadata
    Skipped(&'static str),

    /// Event type this service does not handle
    Ignored(String),
}

/// Applies a verified billing event to the organization it concerns
pub async fn apply_event(
    pool: &PgPool,
    stripe: Option<&StripeClient>,
    event: BillingEvent,
) -> Result<WebhookOutcome, WebhookError> {
    match event {
        BillingEvent::CheckoutCompleted(session) => {
            let organization_id = session
                .metadata
                .get("organizationId")
                .and_then(|id| Uuid::parse_str(id).ok());
            let plan = session
                .metadata
                .get("plan")
                .and_then(|plan| parse_paid_plan(plan));

            let (Some(organization_id), Some(plan)) = (organization_id, plan) else {
                warn!(checkout_session_id = %session.id, "Checkout completed without usable metadata");
                return Ok(WebhookOutcome::Skipped("missing checkout metadata"));
            };

            let stripe = stripe.ok_or(WebhookError::StripeNotConfigured)?;
            let full = stripe.retrieve_checkout_session(&session.id).await?;
            let activation = SubscriptionActivation {
                plan,
                stripe_subscription_id: full.subscription.clone().or(session.subscription),
                stripe_price_id: full.first_price_id().map(str::to_string),
            };

            match Organization::activate_subscription(pool, organization_id, activation).await? {
                Some(org) => {
                    info!(organization_id = %org.id, plan = plan.as_str(), "Subscription activated");
                    Ok(WebhookOutcome::Applied { organization_id: org.id })
                }
                None => Ok(WebhookOutcome::Skipped("organization not found")),
            }
        }
        BillingEvent::SubscriptionUpdated(subscription) => {
            let Some(org) = Organization::find_by_stripe_customer_id(pool, &subscription.customer).await?
            else {
                return Ok(WebhookOutcome::Skipped("organization not found"));
            };

            let status = subscription.organization_status();
            Organization::update_subscription_status(
                pool,
                org.id,
                status,
                subscription.current_period_end_at(),
            )
            .await?;

            info!(organization_id = %org.id, status = status.as_str(), "Subscription updated");
            Ok(WebhookOutcome::Applied { organization_id: org.id })
        }
        BillingEvent::SubscriptionDeleted(subscription) => {
            let Some(org) = Organization::find_by_stripe_customer_id(pool, &subscription.customer).await?
            else {
                return Ok(WebhookOutcome::Skipped("organization not found"));
            };

            Organization::cancel_subscription(pool, org.id).await?;

            info!(organization_id = %org.id, "Subscription canceled");
            Ok(WebhookOutcome::Applied { organization_id: org.id })
        }
        BillingEvent::Other(event_type) => Ok(WebhookOutcome::Ignored(event_type)),
    }
}
