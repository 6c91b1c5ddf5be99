//! # DEKES API Server Library
//!
//! HTTP surface of the DEKES lead generation backend.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration loaded once from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Session authentication and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
