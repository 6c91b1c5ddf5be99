/// Middleware modules for the API server
///
/// - `auth`: Session authentication layer for protected routes
/// - `security`: Security response headers

pub mod auth;
pub mod security;
