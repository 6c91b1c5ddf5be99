/// Billing integration
///
/// - [`plan`]: Paid plan catalog and configured price ids
/// - [`stripe`]: Stripe REST client (customers, checkout sessions)
/// - [`webhook`]: Webhook signature verification and event application

pub mod plan;
pub mod stripe;
pub mod webhook;

pub use plan::PlanPrices;
pub use stripe::{BillingError, StripeClient, StripeConfig};
pub use webhook::WebhookError;
