/// Database models for DEKES
///
/// # Models
///
/// - `organization`: Tenants and their billing state
/// - `user`: Accounts and credentials
/// - `session`: Bearer-token sessions
/// - `query`: Saved lead-search queries (tenant-scoped)
/// - `run`: Search executions (tenant-scoped)
/// - `lead`: Generated leads and their audit events (tenant-scoped)
/// - `carbon_report`: Carbon usage reports from the optimization service

pub mod carbon_report;
pub mod lead;
pub mod organization;
pub mod query;
pub mod run;
pub mod session;
pub mod user;
