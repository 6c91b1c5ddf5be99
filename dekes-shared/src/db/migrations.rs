/// Schema migrations
///
/// The SQL files under the workspace `migrations/` directory are embedded at
/// compile time. The API applies pending ones before it starts serving.

use sqlx::postgres::PgPool;
use tracing::{error, info};

/// Applies pending migrations; already-applied ones are skipped
///
/// # Errors
///
/// Returns an error if a migration fails or an applied migration's checksum
/// no longer matches its file.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    let migrator = sqlx::migrate!("../migrations");
    info!(available = migrator.iter().count(), "Applying database migrations");

    migrator.run(pool).await.inspect_err(|e| {
        error!(error = %e, "Database migration failed");
    })?;

    info!("Database schema is up to date");
    Ok(())
}
