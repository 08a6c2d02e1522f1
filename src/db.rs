use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RepoError {
    /// Turns a unique-violation into `Duplicate`, anything else into `Database`.
    pub fn from_insert(e: sqlx::Error, what: &'static str) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => RepoError::Duplicate(what),
            _ => RepoError::Database(e),
        }
    }
}

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;
    tracing::info!("postgres connection pool established");
    Ok(pool)
}

/// Applies embedded migrations. A failure is logged and startup continues,
/// so an already-provisioned schema still serves.
pub async fn migrate(pool: &PgPool) {
    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => tracing::info!("database migrations applied"),
        Err(e) => tracing::warn!(error = %e, "migration failed; continuing with existing schema"),
    }
}
