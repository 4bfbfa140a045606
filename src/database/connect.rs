use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use crate::error::LedgerError;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

// create database connection pool with the database url using diesel
pub fn create_db_connection_pool(database_url: &str) -> Result<PgPool, LedgerError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Ok(Pool::builder().test_on_check_out(true).build(manager)?)
}

// run diesel migrations
pub fn run_migrations(pool: &PgPool) -> Result<(), LedgerError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(LedgerError::Persistence)?;
    info!(applied = applied.len(), "database migrations done");
    Ok(())
}
