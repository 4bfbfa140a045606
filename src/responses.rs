use std::fmt;
use std::future::{ready, Ready};

use actix_web::http::{header, StatusCode};
use actix_web::{dev::Payload, FromRequest, HttpRequest, HttpResponse, ResponseError};
use bigdecimal::Signed;
use chrono::{DateTime, TimeZone, Utc};
use prost::Message;
use prost_wkt_types::Timestamp;
use tracing::{error, warn};

use crate::access::Section;
use crate::book::{self, Dashboard, MemberDetail, MemberView, PaymentReceipt};
use crate::domain::{Operator, PaymentEntry, SchemeSettings};
use crate::error::LedgerError;
use crate::i18n::{self, Locale};
use crate::proto::error::OneError;
use crate::proto::{
    BadParameterError, ConflictError, DashboardData, Error, ForbiddenError, GenericOutput, InternalError,
    InvalidCredentialsError, MemberData, MemberDetailData, NotFoundError, OperatorData, PaymentData,
    PaymentReceiptData, SchemeCountData, SettingsData, UnauthenticatedError,
};

const PROTOBUF: &str = "application/x-protobuf";

/// Output encoding and language, taken from `Accept` and `Accept-Language`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseFormat {
    pub is_protobuf: bool,
    pub locale: Locale,
}

impl ResponseFormat {
    pub fn of(req: &HttpRequest) -> Self {
        let headers = req.headers();
        let is_protobuf = headers
            .get_all(header::ACCEPT)
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.split(',').any(|m| m.trim().starts_with(PROTOBUF)));
        let locale = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(Locale::from_accept_language)
            .unwrap_or_default();
        Self { is_protobuf, locale }
    }
}

impl FromRequest for ResponseFormat {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Self::of(req)))
    }
}

pub fn timestamp(at: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}

pub fn from_timestamp(ts: &Timestamp) -> Option<DateTime<Utc>> {
    u32::try_from(ts.nanos)
        .ok()
        .and_then(|nanos| Utc.timestamp_opt(ts.seconds, nanos).single())
}

pub fn member_data(view: &MemberView) -> MemberData {
    let member = &view.member;
    let projection = &view.projection;
    MemberData {
        id: member.id.clone(),
        name: member.name.clone(),
        phone: member.phone.clone(),
        address: member.address.clone(),
        scheme_type: member.scheme_type.prefix().to_string(),
        num_schemes: member.num_schemes,
        selected_item: member
            .selected_item
            .map(|item| item.label().to_string())
            .unwrap_or_default(),
        total_amount: member.total_amount.to_string(),
        paid_amount: projection.paid.to_string(),
        balance: projection.balance.to_string(),
        is_overpaid: projection.balance.is_negative(),
        progress_percent: book::progress_percent(&member.total_amount, &projection.paid).to_string(),
        created_at: Some(timestamp(member.created_at)),
    }
}

pub fn payment_data(entry: &PaymentEntry) -> PaymentData {
    PaymentData {
        id: entry.id,
        member_id: entry.member_id.clone(),
        amount: entry.amount.to_string(),
        date: Some(timestamp(entry.date)),
        method: entry.method.as_str().to_string(),
        balance_after: entry.balance_after.to_string(),
    }
}

pub fn member_detail_data(detail: MemberDetail) -> MemberDetailData {
    let payments = detail.entries.iter().map(payment_data).collect();
    MemberDetailData {
        member: Some(member_data(&MemberView {
            member: detail.member,
            projection: detail.projection,
        })),
        payments,
    }
}

pub fn payment_receipt_data(receipt: PaymentReceipt) -> PaymentReceiptData {
    PaymentReceiptData {
        payment: Some(payment_data(&receipt.entry)),
        member: Some(member_data(&MemberView {
            member: receipt.member,
            projection: receipt.projection,
        })),
    }
}

// the password hash never leaves the server
pub fn operator_data(operator: &Operator) -> OperatorData {
    OperatorData {
        id: operator.id,
        name: operator.name.clone(),
        username: operator.username.clone(),
        phone: operator.phone.clone(),
        email: operator.email.clone().unwrap_or_default(),
        address: operator.address.clone().unwrap_or_default(),
        role: operator.role.as_str().to_string(),
        created_at: Some(timestamp(operator.created_at)),
    }
}

pub fn settings_data(settings: &SchemeSettings) -> SettingsData {
    SettingsData {
        khss: settings.khss.to_string(),
        dss: settings.dss.to_string(),
        finance: settings.finance.to_string(),
    }
}

pub fn dashboard_data(dashboard: &Dashboard) -> DashboardData {
    DashboardData {
        counts: dashboard
            .counts
            .iter()
            .map(|(scheme, members)| SchemeCountData {
                scheme_type: scheme.prefix().to_string(),
                members: *members,
            })
            .collect(),
        recent: dashboard.recent.iter().map(member_data).collect(),
    }
}

pub fn section_names(sections: &[Section]) -> Vec<String> {
    sections.iter().map(|s| s.as_str().to_string()).collect()
}

fn error_data(err: &LedgerError) -> Error {
    let one_error = match err {
        LedgerError::Validation { field, reason } => OneError::BadParameter(BadParameterError {
            name: field.to_string(),
            reason: reason.clone(),
        }),
        LedgerError::InvalidCredentials => OneError::InvalidCredentials(InvalidCredentialsError {}),
        LedgerError::Unauthenticated => OneError::Unauthenticated(UnauthenticatedError {}),
        LedgerError::Forbidden(reason) => OneError::Forbidden(ForbiddenError { reason: reason.clone() }),
        LedgerError::NotFound { resource, id } => OneError::NotFound(NotFoundError {
            resource: resource.to_string(),
            id: id.clone(),
        }),
        LedgerError::Conflict(reason) => OneError::Conflict(ConflictError { reason: reason.clone() }),
        LedgerError::Persistence(_) | LedgerError::Internal(_) => OneError::Internal(InternalError {}),
    };
    Error {
        one_error: Some(one_error),
    }
}

pub fn encode_http_response(status: StatusCode, data: &GenericOutput, format: ResponseFormat) -> HttpResponse {
    if format.is_protobuf {
        HttpResponse::build(status)
            .content_type(PROTOBUF)
            .body(data.encode_to_vec())
    } else {
        HttpResponse::build(status).json(data)
    }
}

pub fn ok_http_response(data: GenericOutput, format: ResponseFormat) -> HttpResponse {
    encode_http_response(StatusCode::OK, &data, format)
}

/// A [`LedgerError`] bound to the encoding and language of the request that
/// failed.
#[derive(Debug)]
pub struct ApiError {
    pub error: LedgerError,
    pub format: ResponseFormat,
}

impl ApiError {
    pub fn new(error: LedgerError, format: ResponseFormat) -> Self {
        Self { error, format }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.error {
            LedgerError::Validation { .. } => StatusCode::BAD_REQUEST,
            LedgerError::InvalidCredentials | LedgerError::Unauthenticated => StatusCode::UNAUTHORIZED,
            LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::Persistence(_) | LedgerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.error.is_client_error() {
            warn!(error = %self.error, "request rejected");
        } else {
            error!(error = ?self.error, "request failed");
        }
        let data = GenericOutput {
            message: i18n::error_text(&self.error, self.format.locale),
            error: Some(error_data(&self.error)),
            ..Default::default()
        };
        encode_http_response(self.status_code(), &data, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Member, SchemeType};
    use crate::ledger::Projection;
    use actix_web::body::to_bytes;
    use actix_web::test::TestRequest;
    use bigdecimal::BigDecimal;

    #[test]
    fn test_response_format_from_headers() {
        let req = TestRequest::default()
            .insert_header((header::ACCEPT, "application/x-protobuf"))
            .insert_header((header::ACCEPT_LANGUAGE, "ta"))
            .to_http_request();
        let format = ResponseFormat::of(&req);
        assert!(format.is_protobuf);
        assert_eq!(format.locale, Locale::Ta);

        let req = TestRequest::default().to_http_request();
        assert_eq!(ResponseFormat::of(&req), ResponseFormat::default());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(from_timestamp(&timestamp(at)), Some(at));
        let broken = Timestamp { seconds: 0, nanos: -1 };
        assert_eq!(from_timestamp(&broken), None);
    }

    #[test]
    fn test_member_data_flags_overpayment() {
        let view = MemberView {
            member: Member {
                id: "KHSS-001".to_string(),
                name: "Uma".to_string(),
                phone: "9876543210".to_string(),
                address: String::new(),
                total_amount: BigDecimal::from(1000),
                num_schemes: 1,
                scheme_type: SchemeType::Khss,
                selected_item: None,
                created_at: Utc::now(),
            },
            projection: Projection {
                paid: BigDecimal::from(1200),
                balance: BigDecimal::from(-200),
            },
        };
        let data = member_data(&view);
        assert_eq!(data.balance, "-200");
        assert!(data.is_overpaid);
        assert_eq!(data.progress_percent, "100");
        assert_eq!(data.selected_item, "");
    }

    #[actix_web::test]
    async fn test_error_response_encoding() {
        let err = ApiError::new(
            LedgerError::validation("amount", "must be greater than zero"),
            ResponseFormat {
                is_protobuf: true,
                locale: Locale::En,
            },
        );
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let decoded = GenericOutput::decode(body).unwrap();
        assert_eq!(decoded.message, "Invalid amount.");
        assert!(matches!(
            decoded.error.and_then(|e| e.one_error),
            Some(OneError::BadParameter(BadParameterError { name, .. })) if name == "amount"
        ));

        let err = ApiError::new(LedgerError::InvalidCredentials, ResponseFormat::default());
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Invalid username or password.");
        assert!(json["error"]["oneError"]["invalidCredentials"].is_object());
    }
}
