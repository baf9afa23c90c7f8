use std::str::FromStr;

use log::info;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppResult;

/// Opens the Postgres pool.
///
/// Acquiring a connection waits at most `DB_TIMEOUT_SECS`, and the server cancels any
/// statement that runs longer than that.
pub async fn connect(config: &Config) -> AppResult<PgPool> {
    info!("Initializing database connection pool");

    let statement_timeout_ms = config.db_timeout().as_millis();
    let options = PgConnectOptions::from_str(&config.database_url)?
        .options([("statement_timeout", statement_timeout_ms.to_string())]);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_timeout())
        .connect_with(options)
        .await?;

    info!(
        "Database connection pool initialized (statement timeout {}ms)",
        statement_timeout_ms
    );
    Ok(pool)
}

/// Applies the embedded migrations in `migrations/`.
pub async fn migrate(pool: &PgPool) -> AppResult<()> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
