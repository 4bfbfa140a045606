//! Paid/balance projection over a member's payment entries.
//!
//! Nothing here is stored: every read sums the ledger again.

use std::str::FromStr;

use bigdecimal::BigDecimal;

use crate::domain::PaymentEntry;
use crate::error::LedgerError;

/// Where the displayed balance comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalancePolicy {
    /// `total - paid`, always.
    #[default]
    Recompute,
    /// `balance_after` of the chronologically last entry. Diverges from
    /// `total - paid` once the total is edited after payments were recorded.
    Snapshot,
}

impl FromStr for BalancePolicy {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recompute" => Ok(BalancePolicy::Recompute),
            "snapshot" => Ok(BalancePolicy::Snapshot),
            _ => Err(LedgerError::validation("balance_policy", format!("unknown policy {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub paid: BigDecimal,
    /// Negative on overpayment, never clamped.
    pub balance: BigDecimal,
}

pub fn paid_sum<'a>(entries: impl IntoIterator<Item = &'a PaymentEntry>) -> BigDecimal {
    entries
        .into_iter()
        .fold(BigDecimal::from(0), |acc, entry| acc + &entry.amount)
}

/// Latest entry by date, ties broken by id (ids are monotonic).
pub fn latest_entry(entries: &[PaymentEntry]) -> Option<&PaymentEntry> {
    entries.iter().max_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)))
}

pub fn project(total_amount: &BigDecimal, entries: &[PaymentEntry], policy: BalancePolicy) -> Projection {
    let paid = paid_sum(entries);
    let balance = match (policy, latest_entry(entries)) {
        (BalancePolicy::Snapshot, Some(last)) => last.balance_after.clone(),
        _ => total_amount - &paid,
    };
    Projection { paid, balance }
}

/// Balance to record on a new entry of `amount`, given the entries already in
/// the ledger.
pub fn balance_after(total_amount: &BigDecimal, prior: &[PaymentEntry], amount: &BigDecimal) -> BigDecimal {
    total_amount - &(paid_sum(prior) + amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PaymentMethod;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(id: i64, amount: i64, day: i64, balance_after: i64) -> PaymentEntry {
        PaymentEntry {
            id,
            member_id: "KHSS-001".to_string(),
            amount: BigDecimal::from(amount),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            method: PaymentMethod::Cash,
            balance_after: BigDecimal::from(balance_after),
        }
    }

    #[test]
    fn test_no_entries() {
        let total = BigDecimal::from(1000);
        for policy in [BalancePolicy::Recompute, BalancePolicy::Snapshot] {
            let p = project(&total, &[], policy);
            assert_eq!(p.paid, BigDecimal::from(0));
            assert_eq!(p.balance, total);
        }
    }

    #[test]
    fn test_paid_is_order_independent() {
        let total = BigDecimal::from(5000);
        let entries = vec![entry(1, 100, 0, 4900), entry(2, 250, 1, 4650), entry(3, 650, 2, 4000)];
        let mut reversed = entries.clone();
        reversed.reverse();
        let mut rotated = entries.clone();
        rotated.rotate_left(1);

        let expected = project(&total, &entries, BalancePolicy::Recompute);
        assert_eq!(expected.paid, BigDecimal::from(1000));
        assert_eq!(expected.balance, BigDecimal::from(4000));
        assert_eq!(project(&total, &reversed, BalancePolicy::Recompute), expected);
        assert_eq!(project(&total, &rotated, BalancePolicy::Recompute), expected);
        assert_eq!(project(&total, &rotated, BalancePolicy::Snapshot), expected);
    }

    #[test]
    fn test_overpayment_goes_negative() {
        let total = BigDecimal::from(1000);
        let entries = vec![entry(1, 700, 0, 300), entry(2, 500, 1, -200)];
        let p = project(&total, &entries, BalancePolicy::Recompute);
        assert_eq!(p.paid, BigDecimal::from(1200));
        assert_eq!(p.balance, BigDecimal::from(-200));
    }

    #[test]
    fn test_zero_total_with_payment() {
        let p = project(&BigDecimal::from(0), &[entry(1, 50, 0, -50)], BalancePolicy::Recompute);
        assert_eq!(p.balance, BigDecimal::from(-50));
    }

    #[test]
    fn test_snapshot_uses_last_entry_by_date() {
        // total was 2000 when these were recorded, later edited to 3000
        let total = BigDecimal::from(3000);
        let entries = vec![entry(7, 500, 3, 1000), entry(5, 500, 1, 1500)];

        let snapshot = project(&total, &entries, BalancePolicy::Snapshot);
        assert_eq!(snapshot.paid, BigDecimal::from(1000));
        assert_eq!(snapshot.balance, BigDecimal::from(1000));

        let recomputed = project(&total, &entries, BalancePolicy::Recompute);
        assert_eq!(recomputed.balance, BigDecimal::from(2000));
    }

    #[test]
    fn test_latest_entry_breaks_ties_by_id() {
        let entries = vec![entry(9, 10, 0, 0), entry(3, 10, 0, 0)];
        assert_eq!(latest_entry(&entries).map(|e| e.id), Some(9));
    }

    #[test]
    fn test_balance_after() {
        let prior = vec![entry(1, 300, 0, 700)];
        let next = balance_after(&BigDecimal::from(1000), &prior, &BigDecimal::from(200));
        assert_eq!(next, BigDecimal::from(500));
    }
}
