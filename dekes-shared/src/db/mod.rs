/// Database plumbing
///
/// - `pool`: connection pool and liveness ping
/// - `migrations`: embedded schema migrations
///
/// Table access lives in [`crate::models`].

pub mod migrations;
pub mod pool;
