/// API route handlers, organized by resource
///
/// - `health`: Health check
/// - `auth`: Signup, login, logout
/// - `user`: Current user profile and stats
/// - `leads`: Lead listing, outcomes, search runs
/// - `billing`: Stripe checkout and webhook
/// - `carbon`: Carbon usage reports from the optimization service

pub mod auth;
pub mod billing;
pub mod carbon;
pub mod health;
pub mod leads;
pub mod user;
