//! Database pool construction
//!
//! SQLite via diesel + r2d2. Every connection gets the same PRAGMA setup
//! on acquire; migrations are embedded so a fresh database is usable
//! without external tooling.
//!
//! The pool is constructed once in `main` and passed explicitly to every
//! service and handler that needs it; nothing in this crate holds a
//! module-level database singleton.

use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies PRAGMAs on every acquired connection.
#[derive(Debug, Clone)]
struct SqlitePragmaCustomizer;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        // Dispute transitions rely on conditional UPDATEs being atomic per
        // row; WAL keeps readers unblocked while a writer holds the lock.
        sql_query("PRAGMA journal_mode = WAL;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;

        sql_query("PRAGMA foreign_keys = ON;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;

        // Wait for locks instead of failing immediately
        sql_query("PRAGMA busy_timeout = 5000;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;

        sql_query("PRAGMA synchronous = NORMAL;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;

        Ok(())
    }
}

/// Create a database connection pool.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);

    let pool = r2d2::Pool::builder()
        .max_size(10)
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)
        .context("Failed to create database pool")?;

    Ok(pool)
}

/// Run embedded migrations against the pool.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().context("Failed to get connection for migrations")?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration failed: {e}"))?;
    Ok(())
}

/// Single-connection in-memory pool for tests.
///
/// One connection only: every `:memory:` connection is its own database,
/// so concurrent test tasks must share it.
pub fn create_test_pool() -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
    let pool = r2d2::Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to build in-memory pool");

    {
        let mut conn = pool.get().expect("Failed to get in-memory connection");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Failed to run migrations on in-memory database");
    }

    pool
}
