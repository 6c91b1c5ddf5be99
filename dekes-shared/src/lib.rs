//! # DEKES Shared Library
//!
//! Types, persistence, and integrations shared by the DEKES API server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migrations
//! - `models`: Database models (organizations, users, sessions, queries, runs, leads)
//! - `auth`: Passwords, session tokens, the session manager, request authentication
//! - `billing`: Stripe client, plan catalog, webhook verification
//! - `optimization`: ECOBE optimization service client

pub mod auth;
pub mod billing;
pub mod db;
pub mod models;
pub mod optimization;

/// Current version of the DEKES shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
