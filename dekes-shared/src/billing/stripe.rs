/// Minimal Stripe REST client
///
/// Covers the three calls the billing flow needs: creating a customer,
/// creating a subscription checkout session, and retrieving a completed
/// session with its line items. Requests are form-encoded and authenticated
/// with the secret key as a bearer token. Every call is a single attempt
/// bounded by the configured timeout.
///
/// # Example
///
/// ```no_run
/// use dekes_shared::billing::stripe::{CheckoutSessionParams, StripeClient, StripeConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stripe = StripeClient::new(StripeConfig::new("sk_test_123"))?;
///
/// let customer = stripe
///     .create_customer("a@x.com", &[("organizationId", "org-id")])
///     .await?;
///
/// let session = stripe
///     .create_checkout_session(CheckoutSessionParams {
///         customer: customer.id,
///         price: "price_123".to_string(),
///         success_url: "https://app.example.com/dashboard?success=true".to_string(),
///         cancel_url: "https://app.example.com/dashboard?canceled=true".to_string(),
///         metadata: vec![("plan".to_string(), "STARTER".to_string())],
///     })
///     .await?;
/// println!("{:?}", session.url);
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// API version pinned on every request
pub const STRIPE_API_VERSION: &str = "2025-02-24.acacia";

pub const DEFAULT_STRIPE_TIMEOUT: Duration = Duration::from_secs(15);

/// Error type for billing provider calls
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Transport failure (connect, timeout, body read)
    #[error("Billing provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the provider
    #[error("Billing provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Success response that could not be decoded
    #[error("Invalid billing provider response: {0}")]
    InvalidResponse(String),
}

/// Stripe client configuration
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            timeout: DEFAULT_STRIPE_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemList {
    #[serde(default)]
    pub data: Vec<LineItem>,
}

/// Checkout session, as sent in webhooks or retrieved from the API
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub line_items: Option<LineItemList>,
}

impl CheckoutSession {
    /// Price of the first line item, when line items were expanded
    pub fn first_price_id(&self) -> Option<&str> {
        self.line_items
            .as_ref()?
            .data
            .first()?
            .price
            .as_ref()
            .map(|price| price.id.as_str())
    }
}

/// Parameters for a subscription-mode checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub customer: String,
    pub price: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

impl CheckoutSessionParams {
    fn into_form(self) -> Vec<(String, String)> {
        let mut form = vec![
            ("customer".to_string(), self.customer),
            ("mode".to_string(), "subscription".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), self.price),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url),
            ("cancel_url".to_string(), self.cancel_url),
        ];
        form.extend(
            self.metadata
                .into_iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value)),
        );
        form
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Stripe API client; cheap to clone
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: Client,
    config: Arc<StripeConfig>,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, BillingError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.secret_key)
            .header("Stripe-Version", STRIPE_API_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BillingError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or(body);

            return Err(BillingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| BillingError::InvalidResponse(e.to_string()))
    }

    /// Creates a customer with metadata
    pub async fn create_customer(
        &self,
        email: &str,
        metadata: &[(&str, &str)],
    ) -> Result<Customer, BillingError> {
        let mut form = vec![("email".to_string(), email.to_string())];
        form.extend(
            metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value.to_string())),
        );

        let customer: Customer = self
            .send(self.http.post(self.url("/v1/customers")).form(&form))
            .await?;

        debug!(customer_id = %customer.id, "Created Stripe customer");
        Ok(customer)
    }

    /// Creates a subscription checkout session for one unit of a price
    pub async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CheckoutSession, BillingError> {
        let form = params.into_form();

        let session: CheckoutSession = self
            .send(self.http.post(self.url("/v1/checkout/sessions")).form(&form))
            .await?;

        debug!(checkout_session_id = %session.id, "Created Stripe checkout session");
        Ok(session)
    }

    /// Retrieves a checkout session with its line items expanded
    pub async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, BillingError> {
        let url = self.url(&format!("/v1/checkout/sessions/{}", id));

        self.send(self.http.get(url).query(&[("expand[]", "line_items")]))
            .await
    }
}
