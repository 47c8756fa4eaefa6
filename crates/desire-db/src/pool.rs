//! Pool, schema and database bootstrap for the document store.

use std::time::Duration;

use anyhow::{Context, Result, ensure};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Schema for `profiles` and `pantry_items`, embedded from `migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a pool sized by [`DbConfig::max_connections`].
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| {
            format!(
                "failed to reach the document store ({})",
                config.database_name().unwrap_or("unnamed database")
            )
        })
}

/// Bring the document tables up to the embedded schema.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to migrate the document store schema")?;
    info!(migrations = MIGRATOR.iter().count(), "document store schema is current");
    Ok(())
}

/// Create the configured database on its server when it is missing.
///
/// Returns `true` when the database was created by this call.
pub async fn create_database_if_missing(config: &DbConfig) -> Result<bool> {
    let (Some(name), Some(maintenance_url)) = (config.database_name(), config.maintenance_url())
    else {
        anyhow::bail!("the document store URL does not name a database");
    };
    // CREATE DATABASE takes no bind parameters.
    ensure!(
        name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
        "document store database name {name:?} may only use ASCII letters, digits and underscores"
    );

    let admin = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&maintenance_url)
        .await
        .context("failed to reach the server's postgres database")?;
    let created = create_if_absent(&admin, name).await;
    admin.close().await;

    let created = created?;
    if created {
        info!(db = name, "document store database created");
    } else {
        debug!(db = name, "document store database already present");
    }
    Ok(created)
}

async fn create_if_absent(admin: &PgPool, name: &str) -> Result<bool> {
    let present: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(admin)
            .await
            .context("failed to look up existing databases")?;
    if present {
        return Ok(false);
    }
    admin
        .execute(format!("CREATE DATABASE {name}").as_str())
        .await
        .with_context(|| format!("failed to create document store database {name}"))?;
    Ok(true)
}

/// Document counts per table, for the `desire db-init` summary.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let mut counts = Vec::with_capacity(2);
    for table in ["profiles", "pantry_items"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count documents in {table}"))?;
        counts.push((table.to_owned(), count));
    }
    Ok(counts)
}
