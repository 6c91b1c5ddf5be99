/// Configuration management for the API server
///
/// Configuration is read from the environment once at startup (a `.env`
/// file is loaded first when present). Handlers and clients receive the
/// resulting [`Config`]; nothing reads the environment at request time.
///
/// # Environment Variables
///
/// | Variable | Default | Notes |
/// |---|---|---|
/// | `API_HOST` / `API_PORT` | `0.0.0.0` / `8080` | |
/// | `APP_ENV` | `development` | `production` enables production mode |
/// | `APP_URL` | `http://localhost:3000` | Base for checkout redirect URLs |
/// | `CORS_ORIGINS` | `*` | Comma-separated |
/// | `DATABASE_URL` | | Required |
/// | `DATABASE_MAX_CONNECTIONS` | `10` | |
/// | `DATABASE_ACQUIRE_TIMEOUT_SECONDS` | `30` | |
/// | `JWT_SECRET` | dev fallback | Required (≥ 32 chars) in production |
/// | `SESSION_TTL_DAYS` | `7` | At most 365 |
/// | `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET` | | Required in production |
/// | `STRIPE_PRICE_STARTER`, `STRIPE_PRICE_PROFESSIONAL`, `STRIPE_PRICE_ENTERPRISE` | | |
/// | `STRIPE_API_BASE` | `https://api.stripe.com` | |
/// | `STRIPE_TIMEOUT_SECONDS` | `15` | |
/// | `ECOBE_ENGINE_URL` | `http://localhost:3000` | |
/// | `ECOBE_ENGINE_API_KEY` | | |
/// | `ECOBE_TIMEOUT_SECONDS` | `30` | |
/// | `DEKES_API_KEY` | | Enables the carbon report endpoint |
///
/// # Example
///
/// ```no_run
/// use dekes_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::time::Duration;

use dekes_shared::auth::session::{SessionConfig, DEFAULT_SESSION_TTL_DAYS};
use dekes_shared::billing::{PlanPrices, StripeConfig};
use dekes_shared::billing::stripe::DEFAULT_STRIPE_API_BASE;
use dekes_shared::db::pool::{DatabaseConfig, DEFAULT_MAX_CONNECTIONS};
use dekes_shared::optimization::{EcobeConfig, DEFAULT_ECOBE_BASE_URL};

/// Signing secret used outside production when `JWT_SECRET` is unset
pub const DEVELOPMENT_JWT_SECRET: &str = "dekes-development-secret-do-not-use-in-production";

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Upper bound for `SESSION_TTL_DAYS`
pub const MAX_SESSION_TTL_DAYS: i64 = 365;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub stripe: StripeSettings,
    pub ecobe: EcobeSettings,

    /// Shared secret for service callbacks (`DEKES_API_KEY`)
    pub reporting_api_key: Option<String>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production mode: secure cookies, HSTS, no error details
    pub production: bool,

    /// Public URL of the web app
    pub app_url: String,

    pub cors_origins: Vec<String>,
}

/// Session configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret for session tokens
    pub jwt_secret: String,
    pub session_ttl_days: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl_days", &self.session_ttl_days)
            .finish()
    }
}

/// Billing provider configuration
#[derive(Clone)]
pub struct StripeSettings {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub prices: PlanPrices,
    pub api_base: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for StripeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeSettings")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("prices", &self.prices)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Optimization service configuration
#[derive(Clone)]
pub struct EcobeSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for EcobeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcobeSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is
    /// invalid. In production `JWT_SECRET`, `STRIPE_SECRET_KEY` and
    /// `STRIPE_WEBHOOK_SECRET` are required.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    /// Builds configuration from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let production = get("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));

        let port = get_or("API_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;

        let cors_origins = get_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = get_or("DATABASE_MAX_CONNECTIONS", &DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;
        if max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be positive");
        }
        let acquire_timeout = parse_seconds(
            get("DATABASE_ACQUIRE_TIMEOUT_SECONDS"),
            30,
            "DATABASE_ACQUIRE_TIMEOUT_SECONDS",
        )?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => {
                if secret.len() < MIN_JWT_SECRET_LENGTH {
                    anyhow::bail!(
                        "JWT_SECRET must be at least {} characters long",
                        MIN_JWT_SECRET_LENGTH
                    );
                }
                secret
            }
            None if production => {
                anyhow::bail!("JWT_SECRET environment variable is required in production")
            }
            None => {
                tracing::warn!("JWT_SECRET not set; using the development secret");
                DEVELOPMENT_JWT_SECRET.to_string()
            }
        };

        let session_ttl_days = get_or("SESSION_TTL_DAYS", &DEFAULT_SESSION_TTL_DAYS.to_string())
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("SESSION_TTL_DAYS is invalid: {}", e))?;
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&session_ttl_days) {
            anyhow::bail!(
                "SESSION_TTL_DAYS must be between 1 and {}",
                MAX_SESSION_TTL_DAYS
            );
        }

        let stripe_secret_key = get("STRIPE_SECRET_KEY");
        let stripe_webhook_secret = get("STRIPE_WEBHOOK_SECRET");
        if production && stripe_secret_key.is_none() {
            anyhow::bail!("STRIPE_SECRET_KEY environment variable is required in production");
        }
        if production && stripe_webhook_secret.is_none() {
            anyhow::bail!("STRIPE_WEBHOOK_SECRET environment variable is required in production");
        }

        let stripe_timeout = parse_seconds(get("STRIPE_TIMEOUT_SECONDS"), 15, "STRIPE_TIMEOUT_SECONDS")?;
        let ecobe_timeout = parse_seconds(get("ECOBE_TIMEOUT_SECONDS"), 30, "ECOBE_TIMEOUT_SECONDS")?;

        Ok(Self {
            api: ApiConfig {
                host: get_or("API_HOST", "0.0.0.0"),
                port,
                production,
                app_url: get_or("APP_URL", "http://localhost:3000")
                    .trim_end_matches('/')
                    .to_string(),
                cors_origins,
            },
            database: DatabaseConfig::new(database_url)
                .with_max_connections(max_connections)
                .with_acquire_timeout(acquire_timeout),
            auth: AuthConfig {
                jwt_secret,
                session_ttl_days,
            },
            stripe: StripeSettings {
                secret_key: stripe_secret_key,
                webhook_secret: stripe_webhook_secret,
                prices: PlanPrices {
                    starter: get("STRIPE_PRICE_STARTER"),
                    professional: get("STRIPE_PRICE_PROFESSIONAL"),
                    enterprise: get("STRIPE_PRICE_ENTERPRISE"),
                },
                api_base: get_or("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
                timeout: stripe_timeout,
            },
            ecobe: EcobeSettings {
                base_url: get_or("ECOBE_ENGINE_URL", DEFAULT_ECOBE_BASE_URL),
                api_key: get("ECOBE_ENGINE_API_KEY"),
                timeout: ecobe_timeout,
            },
            reporting_api_key: get("DEKES_API_KEY"),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.auth.jwt_secret.clone())
            .with_ttl(chrono::Duration::days(self.auth.session_ttl_days))
    }

    /// Stripe client settings, if a secret key is configured
    pub fn stripe_config(&self) -> Option<StripeConfig> {
        self.stripe.secret_key.as_ref().map(|key| {
            StripeConfig::new(key.clone())
                .with_api_base(self.stripe.api_base.clone())
                .with_timeout(self.stripe.timeout)
        })
    }

    pub fn ecobe_config(&self) -> EcobeConfig {
        EcobeConfig::new(self.ecobe.base_url.clone())
            .with_api_key(self.ecobe.api_key.clone())
            .with_timeout(self.ecobe.timeout)
    }
}

fn parse_seconds(value: Option<String>, default: u64, name: &str) -> anyhow::Result<Duration> {
    let seconds = match value {
        Some(v) => v
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", name, e))?,
        None => default,
    };

    if seconds == 0 {
        anyhow::bail!("{} must be positive", name);
    }

    Ok(Duration::from_secs(seconds))
}
