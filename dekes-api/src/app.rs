/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use dekes_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = dekes_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::session_auth_layer, security::SecurityHeadersLayer},
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use dekes_shared::auth::session::SessionManager;
use dekes_shared::billing::StripeClient;
use dekes_shared::optimization::EcobeClient;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; every field is
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    pub sessions: SessionManager,

    /// Present only when `STRIPE_SECRET_KEY` is configured
    pub stripe: Option<StripeClient>,

    pub ecobe: EcobeClient,
}

impl AppState {
    /// Builds state and the outbound clients from configuration
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let sessions = SessionManager::new(db.clone(), config.session_config());
        let stripe = config.stripe_config().map(StripeClient::new).transpose()?;
        let ecobe = EcobeClient::new(config.ecobe_config())?;

        Ok(Self {
            db,
            config: Arc::new(config),
            sessions,
            stripe,
            ecobe,
        })
    }

    pub fn production(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health                      # public
/// ├── /api/auth/
/// │   ├── POST /signup                  # public
/// │   ├── POST /login                   # public
/// │   └── POST /logout                  # token optional, checked in handler
/// ├── GET  /api/user/me                 # session
/// ├── GET  /api/leads                   # session
/// ├── POST /api/leads/run               # session
/// ├── POST /api/leads/:id/outcome       # session
/// ├── POST /api/stripe/create-checkout  # session
/// ├── POST /api/webhooks/stripe         # Stripe signature
/// └── POST /api/carbon/report           # shared secret
/// ```
///
/// Layers, outermost first: security headers, CORS, tracing.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/webhooks/stripe", post(routes::billing::stripe_webhook))
        .route("/api/carbon/report", post(routes::carbon::report));

    let session_routes = Router::new()
        .route("/api/user/me", get(routes::user::me))
        .route("/api/leads", get(routes::leads::list_leads))
        .route("/api/leads/run", post(routes::leads::run_leads))
        .route("/api/leads/:id/outcome", post(routes::leads::update_outcome))
        .route(
            "/api/stripe/create-checkout",
            post(routes::billing::create_checkout),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.production();

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
