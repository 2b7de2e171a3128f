//! Database module.
//!
//! SQLite or PostgreSQL behind sqlx's `Any` driver. Every statement uses
//! positional `$N` parameters, which both backends accept.

mod repository;

pub use repository::*;

use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::config::DatabaseConfig;

const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        field TEXT NOT NULL DEFAULT '',
        stage TEXT NOT NULL DEFAULT '',
        abstract_text TEXT NOT NULL DEFAULT '',
        priority TEXT NOT NULL DEFAULT '',
        deadline TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS collaborators (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        email TEXT NOT NULL DEFAULT '',
        role TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name)",
    "CREATE INDEX IF NOT EXISTS idx_collaborators_project_id ON collaborators(project_id)",
];

const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        field TEXT NOT NULL DEFAULT '',
        stage TEXT NOT NULL DEFAULT '',
        abstract_text TEXT NOT NULL DEFAULT '',
        priority TEXT NOT NULL DEFAULT '',
        deadline TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS collaborators (
        id BIGSERIAL PRIMARY KEY,
        project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        email TEXT NOT NULL DEFAULT '',
        role TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name)",
    "CREATE INDEX IF NOT EXISTS idx_collaborators_project_id ON collaborators(project_id)",
];

/// Initialize the database connection pool and run migrations.
pub async fn init_database(
    database: &DatabaseConfig,
    max_connections: u32,
) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    if let DatabaseConfig::Sqlite { path } = database {
        // Ensure the parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !database.is_in_memory() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
    }

    // Each in-memory connection would otherwise see its own empty database.
    let max_connections = if database.is_in_memory() {
        1
    } else {
        max_connections
    };

    let pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database.connection_url())
        .await?;

    run_migrations(&pool, database).await?;

    Ok(pool)
}

/// Create tables and indexes if they don't exist.
async fn run_migrations(pool: &AnyPool, database: &DatabaseConfig) -> Result<(), sqlx::Error> {
    let statements = match database {
        DatabaseConfig::Sqlite { .. } => SQLITE_SCHEMA,
        DatabaseConfig::Postgres { .. } => POSTGRES_SCHEMA,
    };

    for statement in statements {
        sqlx::query(*statement).execute(pool).await?;
    }

    tracing::debug!("Applied {} schema statements", statements.len());
    Ok(())
}

/// Cheap connectivity probe.
pub async fn ping(pool: &AnyPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
