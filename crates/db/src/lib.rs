//! PostgreSQL persistence for the generation pipeline.
//!
//! Repositories are zero-sized structs taking `&PgPool`; [`queue`] and
//! [`results`] adapt them to the `prodgen-core` storage traits. The
//! [`memory`] module carries in-process implementations of the same traits
//! and [`artifacts`] a filesystem-backed artifact store.

use sqlx::postgres::PgPoolOptions;

pub mod artifacts;
pub mod memory;
pub mod models;
pub mod queue;
pub mod repositories;
pub mod results;

pub use artifacts::LocalArtifactStore;
pub use queue::PgTaskQueue;
pub use results::PgResultRepository;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to prove the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
