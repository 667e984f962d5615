//! Pool setup, the embedded `todos` schema and the `db-init` status report.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/mindplan-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Connect to the todo database.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

/// Apply any embedded migrations the database has not seen yet.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(known = MIGRATOR.iter().count(), "todo schema up to date");
    Ok(())
}

/// Whether [`ensure_database_exists`] had to issue `CREATE DATABASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    Created,
    AlreadyExists,
}

/// Database name from the config, restricted to characters that are safe
/// to splice into `CREATE DATABASE`.
fn creatable_database_name(config: &DbConfig) -> Result<&str> {
    let name = config
        .database_name()
        .context("could not determine database name from URL")?;
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!("database name {name:?} contains invalid characters");
    }
    Ok(name)
}

/// Create the configured database through the `postgres` maintenance
/// database when it is missing.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<Bootstrap> {
    let db_name = creatable_database_name(config)?;

    let maintenance_url = config.maintenance_url();
    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&maintenance_url)
        .await
        .with_context(|| format!("failed to reach maintenance database at {maintenance_url}"))?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&maint_pool)
            .await
            .context("failed to query pg_database")?;

    let outcome = if exists {
        Bootstrap::AlreadyExists
    } else {
        maint_pool
            .execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        Bootstrap::Created
    };
    info!(db = db_name, ?outcome, "todo database ready");

    maint_pool.close().await;
    Ok(outcome)
}

/// A migration recorded in `_sqlx_migrations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: i64,
    pub description: String,
}

/// Schema and todo counts shown after `mindplan db-init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStatus {
    pub applied: Vec<AppliedMigration>,
    /// Embedded migrations not yet recorded as applied.
    pub pending: usize,
    pub todos: i64,
    pub completed: i64,
}

impl fmt::Display for DbStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migrations: {} applied, {} pending", self.applied.len(), self.pending)?;
        for m in &self.applied {
            writeln!(f, "  {:04} {}", m.version, m.description)?;
        }
        writeln!(
            f,
            "Todos: {} ({} done, {} open)",
            self.todos,
            self.completed,
            self.todos - self.completed
        )
    }
}

/// Read the applied migrations and the size of the todo list.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let applied: Vec<(i64, String)> = sqlx::query_as(
        "SELECT version, description FROM _sqlx_migrations WHERE success ORDER BY version",
    )
    .fetch_all(pool)
    .await
    .context("failed to read applied migrations")?;

    let pending = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .filter(|m| applied.iter().all(|(version, _)| *version != m.version))
        .count();

    let (todos, completed): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COUNT(*) FILTER (WHERE completed) FROM todos")
            .fetch_one(pool)
            .await
            .context("failed to count todos")?;

    Ok(DbStatus {
        applied: applied
            .into_iter()
            .map(|(version, description)| AppliedMigration {
                version,
                description,
            })
            .collect(),
        pending,
        todos,
        completed,
    })
}
