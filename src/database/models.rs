//! Row shapes of the postgres tables and their translation to the canonical
//! records. Table and column names differ from the domain names on purpose;
//! nothing outside this module sees them.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{Member, Operator, PaymentEntry};
use crate::error::LedgerError;
use crate::schema::{login_user, member_payment, scheme_member};

#[derive(Queryable, Insertable)]
#[diesel(table_name = scheme_member)]
pub struct MemberRow {
    pub member_code: String,
    pub full_name: String,
    pub mobile: String,
    pub address: String,
    pub total_amount: BigDecimal,
    pub scheme_count: i32,
    pub scheme_kind: String,
    pub gift_item: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = member_payment)]
pub struct PaymentRow {
    pub payment_id: i64,
    pub member_code: String,
    pub amount: BigDecimal,
    pub paid_on: DateTime<Utc>,
    pub channel: String,
    pub balance_after: BigDecimal,
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = login_user)]
pub struct OperatorRow {
    pub user_id: i64,
    pub display_name: String,
    pub login_name: String,
    pub password_hash: String,
    pub mobile: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub user_role: String,
    pub created_at: DateTime<Utc>,
}

fn corrupt(table: &str, err: LedgerError) -> LedgerError {
    LedgerError::persistence(format!("corrupt {table} row: {err}"))
}

fn scheme_count(num_schemes: u32) -> Result<i32, LedgerError> {
    i32::try_from(num_schemes).map_err(|_| LedgerError::validation("num_schemes", "is too large"))
}

impl TryFrom<MemberRow> for Member {
    type Error = LedgerError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Member {
            scheme_type: row.scheme_kind.parse().map_err(|e| corrupt("scheme_member", e))?,
            selected_item: row
                .gift_item
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(|e| corrupt("scheme_member", e))?,
            num_schemes: u32::try_from(row.scheme_count)
                .map_err(|_| LedgerError::persistence("corrupt scheme_member row: negative scheme_count"))?,
            id: row.member_code,
            name: row.full_name,
            phone: row.mobile,
            address: row.address,
            total_amount: row.total_amount,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<&Member> for MemberRow {
    type Error = LedgerError;

    fn try_from(member: &Member) -> Result<Self, Self::Error> {
        Ok(MemberRow {
            member_code: member.id.clone(),
            full_name: member.name.clone(),
            mobile: member.phone.clone(),
            address: member.address.clone(),
            total_amount: member.total_amount.clone(),
            scheme_count: scheme_count(member.num_schemes)?,
            scheme_kind: member.scheme_type.prefix().to_string(),
            gift_item: member.selected_item.map(|item| item.label().to_string()),
            created_at: member.created_at,
        })
    }
}

impl TryFrom<PaymentRow> for PaymentEntry {
    type Error = LedgerError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentEntry {
            method: row.channel.parse().map_err(|e| corrupt("member_payment", e))?,
            id: row.payment_id,
            member_id: row.member_code,
            amount: row.amount,
            date: row.paid_on,
            balance_after: row.balance_after,
        })
    }
}

impl From<&PaymentEntry> for PaymentRow {
    fn from(entry: &PaymentEntry) -> Self {
        PaymentRow {
            payment_id: entry.id,
            member_code: entry.member_id.clone(),
            amount: entry.amount.clone(),
            paid_on: entry.date,
            channel: entry.method.as_str().to_string(),
            balance_after: entry.balance_after.clone(),
        }
    }
}

impl TryFrom<OperatorRow> for Operator {
    type Error = LedgerError;

    fn try_from(row: OperatorRow) -> Result<Self, Self::Error> {
        Ok(Operator {
            role: row.user_role.parse().map_err(|e| corrupt("login_user", e))?,
            id: row.user_id,
            name: row.display_name,
            username: row.login_name,
            password_hash: row.password_hash,
            phone: row.mobile,
            email: row.email,
            address: row.address,
            created_at: row.created_at,
        })
    }
}

impl From<&Operator> for OperatorRow {
    fn from(operator: &Operator) -> Self {
        OperatorRow {
            user_id: operator.id,
            display_name: operator.name.clone(),
            login_name: operator.username.clone(),
            password_hash: operator.password_hash.clone(),
            mobile: operator.phone.clone(),
            email: operator.email.clone(),
            address: operator.address.clone(),
            user_role: operator.role.as_str().to_string(),
            created_at: operator.created_at,
        }
    }
}
