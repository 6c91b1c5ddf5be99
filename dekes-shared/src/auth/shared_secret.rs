/// Service-to-service authentication with a pre-shared key
///
/// Used by callbacks from the optimization service, which authenticate with
/// `Authorization: Bearer <DEKES_API_KEY>` instead of a user session.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use super::middleware::bearer_token;

/// Compares two strings without short-circuiting on the first difference
///
/// ```
/// use dekes_shared::auth::shared_secret::constant_time_compare;
///
/// assert!(constant_time_compare("hello", "hello"));
/// assert!(!constant_time_compare("hello", "world"));
/// ```
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Checks the request's bearer token against the expected key
///
/// Both sides are hashed first so the comparison runs over equal-length
/// inputs and the key length does not leak.
pub fn verify_bearer_secret(headers: &HeaderMap, expected: &str) -> bool {
    let Some(presented) = bearer_token(headers) else {
        return false;
    };

    let presented = hex::encode(Sha256::digest(presented.as_bytes()));
    let expected = hex::encode(Sha256::digest(expected.as_bytes()));

    constant_time_compare(&presented, &expected)
}
