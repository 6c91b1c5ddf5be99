/// Authentication primitives for DEKES
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the password policy
/// - [`token`]: HS256 session token signing and validation
/// - [`session`]: Session manager (issue, validate, revoke)
/// - [`middleware`]: Token extraction, request authentication, session cookies
/// - [`shared_secret`]: Pre-shared key checks for service callbacks
///
/// # Example
///
/// ```no_run
/// use dekes_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password1")?;
/// assert!(verify_password("user_password1", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod middleware;
pub mod password;
pub mod session;
pub mod shared_secret;
pub mod token;
