use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{Member, Operator, PaymentEntry, SchemeSettings, SchemeType};
use crate::error::LedgerError;

pub mod connect;
pub mod local;
pub mod models;
pub mod mutations;
pub mod pg;
pub mod queries;

/// Storage capabilities the scheme book needs. Every backend speaks the
/// canonical records of [`crate::domain`] and translates at its own boundary.
///
/// Calls are blocking; the HTTP layer runs them on the blocking pool.
pub trait Repository: Send + Sync {
    fn list_members(&self, scheme: SchemeType) -> Result<Vec<Member>, LedgerError>;
    /// All members, oldest first.
    fn list_all_members(&self) -> Result<Vec<Member>, LedgerError>;
    fn find_member(&self, id: &str) -> Result<Option<Member>, LedgerError>;
    fn count_members(&self, scheme: SchemeType) -> Result<u32, LedgerError>;
    /// Atomically bumps the scheme's counter to `max(counter, floor) + 1` and
    /// returns the new value.
    fn next_member_sequence(&self, scheme: SchemeType, floor: u32) -> Result<u32, LedgerError>;
    /// Fails with `Conflict` when the id is taken.
    fn create_member(&self, member: &Member) -> Result<Member, LedgerError>;
    fn update_member(&self, member: &Member) -> Result<Member, LedgerError>;
    /// Leaves the member's payment entries in place.
    fn delete_member(&self, id: &str) -> Result<(), LedgerError>;

    /// Ordered by date ascending, then id.
    fn list_payment_entries(&self, member_id: &str) -> Result<Vec<PaymentEntry>, LedgerError>;
    fn append_payment_entry(&self, entry: &PaymentEntry) -> Result<PaymentEntry, LedgerError>;
    fn delete_payment_entries(&self, member_id: &str) -> Result<usize, LedgerError>;

    fn list_operators(&self) -> Result<Vec<Operator>, LedgerError>;
    fn find_operator(&self, id: i64) -> Result<Option<Operator>, LedgerError>;
    fn find_operator_by_username(&self, username: &str) -> Result<Option<Operator>, LedgerError>;
    /// Fails with `Conflict` when the username is taken.
    fn create_operator(&self, operator: &Operator) -> Result<Operator, LedgerError>;
    fn update_operator(&self, operator: &Operator) -> Result<Operator, LedgerError>;
    fn delete_operator(&self, id: i64) -> Result<(), LedgerError>;

    /// Defaults when nothing was saved yet.
    fn load_settings(&self) -> Result<SchemeSettings, LedgerError>;
    fn save_settings(&self, settings: &SchemeSettings) -> Result<SchemeSettings, LedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// JSON document on disk, or memory only when `path` is `None`.
    Local { path: Option<PathBuf> },
    Postgres { database_url: String },
}

pub fn open(storage: &StorageConfig) -> Result<Arc<dyn Repository>, LedgerError> {
    match storage {
        StorageConfig::Local { path: Some(path) } => Ok(Arc::new(local::LocalStore::open(path)?)),
        StorageConfig::Local { path: None } => Ok(Arc::new(local::LocalStore::in_memory())),
        StorageConfig::Postgres { database_url } => {
            let pool = connect::create_db_connection_pool(database_url)?;
            connect::run_migrations(&pool)?;
            Ok(Arc::new(pg::PgStore::new(pool)))
        }
    }
}
