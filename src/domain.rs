//! Canonical records shared by every storage backend.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Signed, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchemeType {
    /// Fixed recurring-deposit-like scheme.
    #[serde(rename = "KHSS")]
    Khss,
    /// Festival/gift scheme, members pick a physical item.
    #[serde(rename = "DSS")]
    Dss,
    /// Generic finance scheme.
    #[serde(rename = "FIN", alias = "Finance")]
    Finance,
}

impl SchemeType {
    pub const ALL: [SchemeType; 3] = [SchemeType::Khss, SchemeType::Dss, SchemeType::Finance];

    /// Prefix of member ids, also the wire and storage spelling.
    pub fn prefix(self) -> &'static str {
        match self {
            SchemeType::Khss => "KHSS",
            SchemeType::Dss => "DSS",
            SchemeType::Finance => "FIN",
        }
    }
}

impl fmt::Display for SchemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for SchemeType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KHSS" => Ok(SchemeType::Khss),
            "DSS" => Ok(SchemeType::Dss),
            "FIN" | "FINANCE" => Ok(SchemeType::Finance),
            _ => Err(LedgerError::validation("scheme_type", format!("unknown scheme {s:?}"))),
        }
    }
}

/// Rewards a festival scheme member can choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GiftItem {
    #[default]
    #[serde(rename = "Copper Kudam")]
    CopperKudam,
    #[serde(rename = "Kuthu Vizhakku")]
    KuthuVizhakku,
    #[serde(rename = "Brass Vessel")]
    BrassVessel,
    #[serde(rename = "Silver Coin")]
    SilverCoin,
}

impl GiftItem {
    pub fn label(self) -> &'static str {
        match self {
            GiftItem::CopperKudam => "Copper Kudam",
            GiftItem::KuthuVizhakku => "Kuthu Vizhakku",
            GiftItem::BrassVessel => "Brass Vessel",
            GiftItem::SilverCoin => "Silver Coin",
        }
    }
}

impl fmt::Display for GiftItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GiftItem {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        [
            GiftItem::CopperKudam,
            GiftItem::KuthuVizhakku,
            GiftItem::BrassVessel,
            GiftItem::SilverCoin,
        ]
        .into_iter()
        .find(|item| item.label().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| LedgerError::validation("selected_item", format!("unknown item {s:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Upi,
    BankTransfer,
    Card,
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Upi => "upi",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Cheque => "cheque",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "upi" => Ok(PaymentMethod::Upi),
            "bank_transfer" | "bank" | "neft" => Ok(PaymentMethod::BankTransfer),
            "card" => Ok(PaymentMethod::Card),
            "cheque" => Ok(PaymentMethod::Cheque),
            _ => Err(LedgerError::validation("method", format!("unknown payment method {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Basic,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Basic => "Basic",
        }
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "basic" => Ok(Role::Basic),
            _ => Err(LedgerError::validation("role", format!("unknown role {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub total_amount: BigDecimal,
    pub num_schemes: u32,
    pub scheme_type: SchemeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_item: Option<GiftItem>,
    pub created_at: DateTime<Utc>,
}

/// One append-only ledger line. `balance_after` is the member's balance as of
/// this entry, computed when it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    pub id: i64,
    pub member_id: String,
    pub amount: BigDecimal,
    pub date: DateTime<Utc>,
    pub method: PaymentMethod,
    pub balance_after: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Unit price per scheme type. Changes apply to members created or re-counted
/// afterwards, never retroactively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeSettings {
    #[serde(rename = "KHSS")]
    pub khss: BigDecimal,
    #[serde(rename = "DSS")]
    pub dss: BigDecimal,
    #[serde(rename = "FIN", alias = "Finance")]
    pub finance: BigDecimal,
}

impl Default for SchemeSettings {
    fn default() -> Self {
        Self {
            khss: BigDecimal::from(1000),
            dss: BigDecimal::from(2000),
            finance: BigDecimal::from(5000),
        }
    }
}

impl SchemeSettings {
    pub fn unit_price(&self, scheme: SchemeType) -> &BigDecimal {
        match scheme {
            SchemeType::Khss => &self.khss,
            SchemeType::Dss => &self.dss,
            SchemeType::Finance => &self.finance,
        }
    }

    pub fn set_unit_price(&mut self, scheme: SchemeType, price: BigDecimal) {
        match scheme {
            SchemeType::Khss => self.khss = price,
            SchemeType::Dss => self.dss = price,
            SchemeType::Finance => self.finance = price,
        }
    }

    pub fn total_for(&self, scheme: SchemeType, num_schemes: u32) -> BigDecimal {
        self.unit_price(scheme) * &BigDecimal::from(num_schemes)
    }
}

pub fn validate_phone(phone: &str) -> Result<(), LedgerError> {
    if phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(LedgerError::validation("phone", "must be exactly 10 digits"))
    }
}

pub fn require_text(field: &'static str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        Err(LedgerError::validation(field, "is required"))
    } else {
        Ok(())
    }
}

const MAX_INTEGER_DIGITS: usize = 12;
const MAX_FRACTION_DIGITS: usize = 2;

/// Accepts plain decimals only (`1500`, `-3`, `0.05`); exponent forms and
/// oversized values are refused before they reach `BigDecimal`.
fn parse_money(field: &'static str, raw: &str) -> Result<BigDecimal, LedgerError> {
    let raw = raw.trim();
    let unsigned = raw.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(raw);
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let plain = !(integer.is_empty() && fraction.is_empty())
        && integer.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit());
    if !plain {
        return Err(LedgerError::validation(field, format!("{raw:?} is not a number")));
    }
    if integer.len() > MAX_INTEGER_DIGITS || fraction.len() > MAX_FRACTION_DIGITS {
        return Err(LedgerError::validation(
            field,
            format!("at most {MAX_INTEGER_DIGITS} digits and {MAX_FRACTION_DIGITS} decimal places"),
        ));
    }
    BigDecimal::from_str(raw).map_err(|_| LedgerError::validation(field, format!("{raw:?} is not a number")))
}

/// Parses a payment amount; anything that is not a decimal strictly above zero
/// is rejected.
pub fn parse_amount(raw: &str) -> Result<BigDecimal, LedgerError> {
    let value = parse_money("amount", raw)?;
    if value.is_negative() || value.is_zero() {
        return Err(LedgerError::validation("amount", "must be greater than zero"));
    }
    Ok(value)
}

/// Parses a unit price; zero is allowed, negative values are not.
pub fn parse_price(field: &'static str, raw: &str) -> Result<BigDecimal, LedgerError> {
    let value = parse_money(field, raw)?;
    if value.is_negative() {
        return Err(LedgerError::validation(field, "must not be negative"));
    }
    Ok(value)
}

pub fn validate_num_schemes(num_schemes: u32) -> Result<(), LedgerError> {
    if num_schemes == 0 {
        Err(LedgerError::validation("num_schemes", "must be at least 1"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("1234567890").is_ok());
        assert!(validate_phone("12345678901").is_err());
        assert!(validate_phone("12345abcde").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn test_parse_amount() {
        for bad in [
            "0", "-5", "abc", "", "0.00", "NaN", ".", "1e-100000", "1e400", "1E2", "0.001", "1234567890123", "1_000",
        ] {
            let err = parse_amount(bad).unwrap_err();
            assert!(
                matches!(err, LedgerError::Validation { field: "amount", .. }),
                "{bad:?} gave {err:?}"
            );
        }
        assert_eq!(parse_amount("0.01").unwrap(), BigDecimal::from_str("0.01").unwrap());
        assert_eq!(parse_amount(" 250 ").unwrap(), BigDecimal::from(250));
        assert_eq!(parse_amount("999999999999.99").unwrap().to_string(), "999999999999.99");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("KHSS", "0").unwrap(), BigDecimal::from(0));
        assert!(parse_price("KHSS", "-1").is_err());
        assert!(parse_price("KHSS", "ten").is_err());
        for huge in ["1e400", "1e-100000", "5000.125"] {
            assert!(matches!(
                parse_price("DSS", huge),
                Err(LedgerError::Validation { field: "DSS", .. })
            ));
        }
        assert_eq!(parse_price("FIN", "7500.50").unwrap(), BigDecimal::from_str("7500.5").unwrap());
    }

    #[test]
    fn test_scheme_type_parsing() {
        assert_eq!("khss".parse::<SchemeType>().unwrap(), SchemeType::Khss);
        assert_eq!("DSS".parse::<SchemeType>().unwrap(), SchemeType::Dss);
        assert_eq!("Finance".parse::<SchemeType>().unwrap(), SchemeType::Finance);
        assert_eq!("FIN".parse::<SchemeType>().unwrap(), SchemeType::Finance);
        assert!("gold".parse::<SchemeType>().is_err());
    }

    #[test]
    fn test_gift_item_round_trip() {
        assert_eq!("silver coin".parse::<GiftItem>().unwrap(), GiftItem::SilverCoin);
        assert_eq!(
            serde_json::to_string(&GiftItem::KuthuVizhakku).unwrap(),
            "\"Kuthu Vizhakku\""
        );
        assert!("gold bar".parse::<GiftItem>().is_err());
    }

    #[test]
    fn test_settings_total() {
        let mut settings = SchemeSettings::default();
        assert_eq!(settings.total_for(SchemeType::Khss, 2), BigDecimal::from(2000));
        settings.set_unit_price(SchemeType::Khss, BigDecimal::from(1500));
        assert_eq!(settings.total_for(SchemeType::Khss, 3), BigDecimal::from(4500));
        assert_eq!(settings.total_for(SchemeType::Finance, 1), BigDecimal::from(5000));
    }
}
