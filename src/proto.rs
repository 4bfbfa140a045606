//! Wire messages. Responses go out as protobuf when the client accepts
//! `application/x-protobuf`, JSON otherwise; request bodies are JSON.

use prost_wkt_types::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};

/// Amounts arrive as JSON strings or numbers; both keep their decimal text.
fn amount_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Amount::deserialize(deserializer)? {
        Amount::Text(text) => text,
        Amount::Number(number) => number.to_string(),
    })
}

/// Snowflake ids go out as JSON strings, since they overflow the 53-bit
/// integers JavaScript clients read numbers into.
mod id_text {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Id {
            Text(String),
            Number(i64),
        }
        match Id::deserialize(deserializer)? {
            Id::Text(text) => text.parse().map_err(D::Error::custom),
            Id::Number(number) => Ok(number),
        }
    }
}

// ---- inputs ----

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterInput {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub username: String,
    #[prost(string, tag = "3")]
    pub password: String,
    #[prost(string, tag = "4")]
    pub phone: String,
    #[prost(string, optional, tag = "5")]
    pub email: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub address: Option<String>,
    #[prost(string, tag = "7")]
    pub role: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginInput {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberInput {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub phone: String,
    #[prost(string, tag = "3")]
    pub address: String,
    #[prost(string, tag = "4")]
    pub scheme_type: String,
    #[prost(uint32, optional, tag = "5")]
    pub num_schemes: Option<u32>,
    #[prost(string, optional, tag = "6")]
    pub selected_item: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberPatchInput {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub phone: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub address: Option<String>,
    #[prost(uint32, optional, tag = "4")]
    pub num_schemes: Option<u32>,
    #[prost(string, optional, tag = "5")]
    pub selected_item: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub scheme_type: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub id: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentInput {
    #[prost(string, tag = "1")]
    #[serde(deserialize_with = "amount_text")]
    pub amount: String,
    #[prost(message, optional, tag = "2")]
    pub date: Option<Timestamp>,
    #[prost(string, tag = "3")]
    pub method: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperatorPatchInput {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub phone: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub email: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub address: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub role: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub password: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsInput {
    #[prost(string, optional, tag = "1")]
    #[serde(rename = "KHSS", alias = "khss")]
    pub khss: Option<String>,
    #[prost(string, optional, tag = "2")]
    #[serde(rename = "DSS", alias = "dss")]
    pub dss: Option<String>,
    #[prost(string, optional, tag = "3")]
    #[serde(rename = "FIN", alias = "finance")]
    pub finance: Option<String>,
}

// ---- outputs ----

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberData {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub phone: String,
    #[prost(string, tag = "4")]
    pub address: String,
    #[prost(string, tag = "5")]
    pub scheme_type: String,
    #[prost(uint32, tag = "6")]
    pub num_schemes: u32,
    #[prost(string, tag = "7")]
    pub selected_item: String,
    #[prost(string, tag = "8")]
    pub total_amount: String,
    #[prost(string, tag = "9")]
    pub paid_amount: String,
    #[prost(string, tag = "10")]
    pub balance: String,
    #[prost(bool, tag = "11")]
    pub is_overpaid: bool,
    #[prost(string, tag = "12")]
    pub progress_percent: String,
    #[prost(message, optional, tag = "13")]
    pub created_at: Option<Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentData {
    #[prost(int64, tag = "1")]
    #[serde(with = "id_text")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub member_id: String,
    #[prost(string, tag = "3")]
    pub amount: String,
    #[prost(message, optional, tag = "4")]
    pub date: Option<Timestamp>,
    #[prost(string, tag = "5")]
    pub method: String,
    #[prost(string, tag = "6")]
    pub balance_after: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberListData {
    #[prost(string, tag = "1")]
    pub scheme_type: String,
    #[prost(message, repeated, tag = "2")]
    pub members: Vec<MemberData>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberDetailData {
    #[prost(message, optional, tag = "1")]
    pub member: Option<MemberData>,
    #[prost(message, repeated, tag = "2")]
    pub payments: Vec<PaymentData>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentReceiptData {
    #[prost(message, optional, tag = "1")]
    pub payment: Option<PaymentData>,
    #[prost(message, optional, tag = "2")]
    pub member: Option<MemberData>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperatorData {
    #[prost(int64, tag = "1")]
    #[serde(with = "id_text")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub username: String,
    #[prost(string, tag = "4")]
    pub phone: String,
    #[prost(string, tag = "5")]
    pub email: String,
    #[prost(string, tag = "6")]
    pub address: String,
    #[prost(string, tag = "7")]
    pub role: String,
    #[prost(message, optional, tag = "8")]
    pub created_at: Option<Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperatorListData {
    #[prost(message, repeated, tag = "1")]
    pub operators: Vec<OperatorData>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionData {
    #[prost(string, tag = "1")]
    pub token: String,
    #[prost(message, optional, tag = "2")]
    pub operator: Option<OperatorData>,
    #[prost(string, repeated, tag = "3")]
    pub menu: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MenuData {
    #[prost(string, tag = "1")]
    pub role: String,
    #[prost(string, repeated, tag = "2")]
    pub sections: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    #[prost(string, tag = "1")]
    #[serde(rename = "KHSS")]
    pub khss: String,
    #[prost(string, tag = "2")]
    #[serde(rename = "DSS")]
    pub dss: String,
    #[prost(string, tag = "3")]
    #[serde(rename = "FIN")]
    pub finance: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemeCountData {
    #[prost(string, tag = "1")]
    pub scheme_type: String,
    #[prost(uint32, tag = "2")]
    pub members: u32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardData {
    #[prost(message, repeated, tag = "1")]
    pub counts: Vec<SchemeCountData>,
    #[prost(message, repeated, tag = "2")]
    pub recent: Vec<MemberData>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeletedData {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(uint32, tag = "2")]
    pub removed_payments: u32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BadParameterError {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub reason: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvalidCredentialsError {}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnauthenticatedError {}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForbiddenError {
    #[prost(string, tag = "1")]
    pub reason: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotFoundError {
    #[prost(string, tag = "1")]
    pub resource: String,
    #[prost(string, tag = "2")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConflictError {
    #[prost(string, tag = "1")]
    pub reason: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InternalError {}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Error {
    #[prost(oneof = "error::OneError", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub one_error: Option<error::OneError>,
}

pub mod error {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum OneError {
        #[prost(message, tag = "1")]
        BadParameter(super::BadParameterError),
        #[prost(message, tag = "2")]
        InvalidCredentials(super::InvalidCredentialsError),
        #[prost(message, tag = "3")]
        Unauthenticated(super::UnauthenticatedError),
        #[prost(message, tag = "4")]
        Forbidden(super::ForbiddenError),
        #[prost(message, tag = "5")]
        NotFound(super::NotFoundError),
        #[prost(message, tag = "6")]
        Conflict(super::ConflictError),
        #[prost(message, tag = "7")]
        Internal(super::InternalError),
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenericOutput {
    /// Localized notification text.
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(message, optional, tag = "2")]
    pub error: Option<Error>,
    #[prost(message, optional, tag = "3")]
    pub member: Option<MemberData>,
    #[prost(message, optional, tag = "4")]
    pub member_list: Option<MemberListData>,
    #[prost(message, optional, tag = "5")]
    pub member_detail: Option<MemberDetailData>,
    #[prost(message, optional, tag = "6")]
    pub payment_receipt: Option<PaymentReceiptData>,
    #[prost(message, optional, tag = "7")]
    pub operator: Option<OperatorData>,
    #[prost(message, optional, tag = "8")]
    pub operator_list: Option<OperatorListData>,
    #[prost(message, optional, tag = "9")]
    pub session: Option<SessionData>,
    #[prost(message, optional, tag = "10")]
    pub menu: Option<MenuData>,
    #[prost(message, optional, tag = "11")]
    pub settings: Option<SettingsData>,
    #[prost(message, optional, tag = "12")]
    pub dashboard: Option<DashboardData>,
    #[prost(message, optional, tag = "13")]
    pub deleted: Option<DeletedData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_amount_accepts_numbers() {
        let input: PaymentInput = serde_json::from_str(r#"{"amount": 500}"#).unwrap();
        assert_eq!(input.amount, "500");
        let input: PaymentInput = serde_json::from_str(r#"{"amount": 250.75, "method": "upi"}"#).unwrap();
        assert_eq!(input.amount, "250.75");
        let input: PaymentInput = serde_json::from_str(r#"{"amount": "0.01"}"#).unwrap();
        assert_eq!(input.amount, "0.01");
        let input: PaymentInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.amount, "");
        assert!(serde_json::from_str::<PaymentInput>(r#"{"amount": true}"#).is_err());
    }

    #[test]
    fn test_snowflake_ids_are_json_strings() {
        let data = OperatorData {
            id: 9_007_199_254_740_993,
            ..Default::default()
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["id"], "9007199254740993");
        let back: OperatorData = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, 9_007_199_254_740_993);

        let payment: PaymentData = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(payment.id, 42);
    }
}
