use std::ops::DerefMut;

use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::PgConnection;

use super::connect::PgPool;
use super::{mutations, queries, Repository};
use crate::domain::{Member, Operator, PaymentEntry, SchemeSettings, SchemeType};
use crate::error::LedgerError;

/// Postgres-backed repository. Every call checks a connection out of the
/// pool; nothing is cached between calls.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, LedgerError> {
        Ok(self.pool.get()?)
    }
}

impl Repository for PgStore {
    fn list_members(&self, scheme: SchemeType) -> Result<Vec<Member>, LedgerError> {
        queries::list_members(self.conn()?.deref_mut(), Some(scheme))
    }

    fn list_all_members(&self) -> Result<Vec<Member>, LedgerError> {
        queries::list_members(self.conn()?.deref_mut(), None)
    }

    fn find_member(&self, id: &str) -> Result<Option<Member>, LedgerError> {
        queries::find_member(self.conn()?.deref_mut(), id)
    }

    fn count_members(&self, scheme: SchemeType) -> Result<u32, LedgerError> {
        queries::count_members(self.conn()?.deref_mut(), scheme)
    }

    fn next_member_sequence(&self, scheme: SchemeType, floor: u32) -> Result<u32, LedgerError> {
        mutations::next_member_sequence(self.conn()?.deref_mut(), scheme, floor)
    }

    fn create_member(&self, member: &Member) -> Result<Member, LedgerError> {
        mutations::create_member(self.conn()?.deref_mut(), member)
    }

    fn update_member(&self, member: &Member) -> Result<Member, LedgerError> {
        mutations::update_member(self.conn()?.deref_mut(), member)
    }

    fn delete_member(&self, id: &str) -> Result<(), LedgerError> {
        mutations::delete_member(self.conn()?.deref_mut(), id)
    }

    fn list_payment_entries(&self, member_id: &str) -> Result<Vec<PaymentEntry>, LedgerError> {
        queries::list_payment_entries(self.conn()?.deref_mut(), member_id)
    }

    fn append_payment_entry(&self, entry: &PaymentEntry) -> Result<PaymentEntry, LedgerError> {
        mutations::append_payment_entry(self.conn()?.deref_mut(), entry)
    }

    fn delete_payment_entries(&self, member_id: &str) -> Result<usize, LedgerError> {
        mutations::delete_payment_entries(self.conn()?.deref_mut(), member_id)
    }

    fn list_operators(&self) -> Result<Vec<Operator>, LedgerError> {
        queries::list_operators(self.conn()?.deref_mut())
    }

    fn find_operator(&self, id: i64) -> Result<Option<Operator>, LedgerError> {
        queries::find_operator(self.conn()?.deref_mut(), id)
    }

    fn find_operator_by_username(&self, username: &str) -> Result<Option<Operator>, LedgerError> {
        queries::find_operator_by_username(self.conn()?.deref_mut(), username)
    }

    fn create_operator(&self, operator: &Operator) -> Result<Operator, LedgerError> {
        mutations::create_operator(self.conn()?.deref_mut(), operator)
    }

    fn update_operator(&self, operator: &Operator) -> Result<Operator, LedgerError> {
        mutations::update_operator(self.conn()?.deref_mut(), operator)
    }

    fn delete_operator(&self, id: i64) -> Result<(), LedgerError> {
        mutations::delete_operator(self.conn()?.deref_mut(), id)
    }

    fn load_settings(&self) -> Result<SchemeSettings, LedgerError> {
        queries::load_settings(self.conn()?.deref_mut())
    }

    fn save_settings(&self, settings: &SchemeSettings) -> Result<SchemeSettings, LedgerError> {
        mutations::save_settings(self.conn()?.deref_mut(), settings)
    }
}
