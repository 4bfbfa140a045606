use std::future::{ready, Ready};
use std::str::FromStr;

use actix_request_identifier::RequestId;
use actix_web::{delete, dev::Payload, get, http::header, patch, post, put, web, FromRequest, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::access::{self, SessionStore};
use crate::book::{MemberPatch, NewMember, NewOperator, NewPayment, OperatorPatch, SchemeBook, SettingsPatch};
use crate::domain::{Operator, SchemeType};
use crate::error::LedgerError;
use crate::i18n::Notice;
use crate::proto::{
    DeletedData, GenericOutput, LoginInput, MemberInput, MemberListData, MemberPatchInput, MenuData,
    OperatorListData, OperatorPatchInput, PaymentInput, RegisterInput, SessionData, SettingsInput,
};
use crate::responses::{self, ApiError, ResponseFormat};

/// The operator behind the request's `Authorization: Bearer` token.
#[derive(Debug)]
pub struct CurrentOperator {
    pub operator: Operator,
    pub token: String,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

impl FromRequest for CurrentOperator {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let sessions = req.app_data::<web::Data<SessionStore>>();
        let current = bearer_token(req).and_then(|token| {
            let operator = sessions?.resolve(&token)?;
            Some(CurrentOperator { operator, token })
        });
        ready(current.ok_or_else(|| ApiError::new(LedgerError::Unauthenticated, ResponseFormat::of(req))))
    }
}

/// Runs a book operation on the blocking pool.
async fn run<T, F>(book: &web::Data<SchemeBook>, format: ResponseFormat, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&SchemeBook) -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    let book = book.clone();
    web::block(move || op(&book))
        .await
        .map_err(LedgerError::from)
        .and_then(|res| res)
        .map_err(|e| ApiError::new(e, format))
}

fn parse_optional<T: FromStr<Err = LedgerError>>(raw: Option<&str>) -> Result<Option<T>, LedgerError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some),
    }
}

fn new_member(input: MemberInput) -> Result<NewMember, LedgerError> {
    Ok(NewMember {
        scheme_type: parse_optional(Some(&input.scheme_type))?,
        selected_item: parse_optional(input.selected_item.as_deref())?,
        num_schemes: input.num_schemes,
        name: input.name,
        phone: input.phone,
        address: input.address,
    })
}

fn member_patch(input: MemberPatchInput) -> Result<MemberPatch, LedgerError> {
    Ok(MemberPatch {
        scheme_type: parse_optional(input.scheme_type.as_deref())?,
        selected_item: parse_optional(input.selected_item.as_deref())?,
        name: input.name,
        phone: input.phone,
        address: input.address,
        num_schemes: input.num_schemes,
        id: input.id,
    })
}

fn new_payment(input: PaymentInput) -> Result<NewPayment, LedgerError> {
    let date = match input.date {
        Some(ts) => Some(responses::from_timestamp(&ts).ok_or_else(|| LedgerError::validation("date", "out of range"))?),
        None => None,
    };
    Ok(NewPayment {
        method: parse_optional(Some(&input.method))?,
        amount: input.amount,
        date,
    })
}

fn new_operator(input: RegisterInput) -> Result<NewOperator, LedgerError> {
    Ok(NewOperator {
        role: parse_optional(Some(&input.role))?,
        name: input.name,
        username: input.username,
        password: input.password,
        phone: input.phone,
        email: input.email,
        address: input.address,
    })
}

fn operator_patch(input: OperatorPatchInput) -> Result<OperatorPatch, LedgerError> {
    Ok(OperatorPatch {
        role: parse_optional(input.role.as_deref())?,
        name: input.name,
        phone: input.phone,
        email: input.email,
        address: input.address,
        password: input.password,
    })
}

fn notice(notice: Notice, format: ResponseFormat) -> GenericOutput {
    GenericOutput {
        message: notice.text(format.locale),
        ..Default::default()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMemberQuery {
    #[serde(default)]
    pub cascade: bool,
}

// ---- auth ----

#[post("/auth/register")]
#[instrument(skip(book, format, input), fields(request_id = request_id.as_str()))]
pub async fn register_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    input: web::Json<RegisterInput>,
) -> Result<HttpResponse, ApiError> {
    let new = new_operator(input.into_inner()).map_err(|e| ApiError::new(e, format))?;
    let operator = run(&book, format, move |book| book.register(new)).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            operator: Some(responses::operator_data(&operator)),
            ..notice(Notice::OperatorSaved, format)
        },
        format,
    ))
}

#[post("/auth/login")]
#[instrument(skip(book, sessions, format, input), fields(request_id = request_id.as_str()))]
pub async fn login_handler(
    book: web::Data<SchemeBook>,
    sessions: web::Data<SessionStore>,
    request_id: RequestId,
    format: ResponseFormat,
    input: web::Json<LoginInput>,
) -> Result<HttpResponse, ApiError> {
    let LoginInput { username, password } = input.into_inner();
    let operator = run(&book, format, move |book| book.authenticate(&username, &password)).await?;
    let menu = responses::section_names(&access::menu(operator.role));
    let token = sessions.open(operator.clone());
    Ok(responses::ok_http_response(
        GenericOutput {
            session: Some(SessionData {
                token,
                operator: Some(responses::operator_data(&operator)),
                menu,
            }),
            ..notice(Notice::LoggedIn, format)
        },
        format,
    ))
}

#[post("/auth/logout")]
#[instrument(skip(sessions, format, current), fields(request_id = request_id.as_str()))]
pub async fn logout_handler(
    sessions: web::Data<SessionStore>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
) -> Result<HttpResponse, ApiError> {
    if let Some(session) = sessions.close(&current.token) {
        let minutes = (Utc::now() - session.opened_at).num_minutes();
        info!(operator_id = session.operator.id, session_minutes = minutes, "operator logged out");
    }
    Ok(responses::ok_http_response(notice(Notice::LoggedOut, format), format))
}

#[get("/menu")]
#[instrument(skip(format, current), fields(request_id = request_id.as_str()))]
pub async fn menu_handler(
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
) -> Result<HttpResponse, ApiError> {
    let role = current.operator.role;
    Ok(responses::ok_http_response(
        GenericOutput {
            menu: Some(MenuData {
                role: role.as_str().to_string(),
                sections: responses::section_names(&access::menu(role)),
            }),
            ..Default::default()
        },
        format,
    ))
}

// ---- members ----

#[get("/dashboard")]
#[instrument(skip(book, format, _current), fields(request_id = request_id.as_str()))]
pub async fn dashboard_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    _current: CurrentOperator,
) -> Result<HttpResponse, ApiError> {
    let dashboard = run(&book, format, |book| book.dashboard()).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            dashboard: Some(responses::dashboard_data(&dashboard)),
            ..Default::default()
        },
        format,
    ))
}

#[get("/schemes/{scheme}/members")]
#[instrument(skip(book, format, _current), fields(request_id = request_id.as_str()))]
pub async fn list_members_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    _current: CurrentOperator,
    scheme: web::Path<String>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let scheme = SchemeType::from_str(&scheme).map_err(|e| ApiError::new(e, format))?;
    let search = query.into_inner().q;
    let views = run(&book, format, move |book| book.list_members(scheme, search.as_deref())).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            member_list: Some(MemberListData {
                scheme_type: scheme.prefix().to_string(),
                members: views.iter().map(responses::member_data).collect(),
            }),
            ..Default::default()
        },
        format,
    ))
}

#[post("/members")]
#[instrument(skip(book, format, current), fields(request_id = request_id.as_str()))]
pub async fn create_member_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
    input: web::Json<MemberInput>,
) -> Result<HttpResponse, ApiError> {
    let new = new_member(input.into_inner()).map_err(|e| ApiError::new(e, format))?;
    let view = run(&book, format, move |book| book.create_member(&current.operator, new)).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            member: Some(responses::member_data(&view)),
            ..notice(Notice::MemberCreated(view.member.id.clone()), format)
        },
        format,
    ))
}

#[get("/members/{member_id}")]
#[instrument(skip(book, format, _current), fields(request_id = request_id.as_str()))]
pub async fn member_detail_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    _current: CurrentOperator,
    member_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let member_id = member_id.into_inner();
    let detail = run(&book, format, move |book| book.member_detail(&member_id)).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            member_detail: Some(responses::member_detail_data(detail)),
            ..Default::default()
        },
        format,
    ))
}

#[patch("/members/{member_id}")]
#[instrument(skip(book, format, current), fields(request_id = request_id.as_str()))]
pub async fn edit_member_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
    member_id: web::Path<String>,
    input: web::Json<MemberPatchInput>,
) -> Result<HttpResponse, ApiError> {
    let member_id = member_id.into_inner();
    let patch = member_patch(input.into_inner()).map_err(|e| ApiError::new(e, format))?;
    let view = run(&book, format, move |book| book.edit_member(&current.operator, &member_id, patch)).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            member: Some(responses::member_data(&view)),
            ..notice(Notice::MemberUpdated, format)
        },
        format,
    ))
}

#[delete("/members/{member_id}")]
#[instrument(skip(book, format, current), fields(request_id = request_id.as_str()))]
pub async fn delete_member_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
    member_id: web::Path<String>,
    query: web::Query<DeleteMemberQuery>,
) -> Result<HttpResponse, ApiError> {
    let member_id = member_id.into_inner();
    let cascade = query.cascade;
    let id = member_id.clone();
    let removed = run(&book, format, move |book| book.delete_member(&current.operator, &id, cascade)).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            deleted: Some(DeletedData {
                id: member_id,
                removed_payments: u32::try_from(removed).unwrap_or(u32::MAX),
            }),
            ..notice(Notice::MemberDeleted, format)
        },
        format,
    ))
}

#[post("/members/{member_id}/payments")]
#[instrument(skip(book, format, current), fields(request_id = request_id.as_str(), operator = %current.operator.username))]
pub async fn submit_payment_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
    member_id: web::Path<String>,
    input: web::Json<PaymentInput>,
) -> Result<HttpResponse, ApiError> {
    let member_id = member_id.into_inner();
    let payment = new_payment(input.into_inner()).map_err(|e| ApiError::new(e, format))?;
    let receipt = run(&book, format, move |book| book.submit_payment(&member_id, payment)).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            payment_receipt: Some(responses::payment_receipt_data(receipt)),
            ..notice(Notice::PaymentReceived, format)
        },
        format,
    ))
}

// ---- operators ----

#[get("/operators")]
#[instrument(skip(book, format, current), fields(request_id = request_id.as_str()))]
pub async fn list_operators_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let search = query.into_inner().q;
    let operators = run(&book, format, move |book| book.list_operators(&current.operator, search.as_deref())).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            operator_list: Some(OperatorListData {
                operators: operators.iter().map(responses::operator_data).collect(),
            }),
            ..Default::default()
        },
        format,
    ))
}

#[post("/operators")]
#[instrument(skip(book, format, current, input), fields(request_id = request_id.as_str()))]
pub async fn create_operator_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
    input: web::Json<RegisterInput>,
) -> Result<HttpResponse, ApiError> {
    let new = new_operator(input.into_inner()).map_err(|e| ApiError::new(e, format))?;
    let operator = run(&book, format, move |book| book.create_operator(&current.operator, new)).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            operator: Some(responses::operator_data(&operator)),
            ..notice(Notice::OperatorSaved, format)
        },
        format,
    ))
}

#[patch("/operators/{operator_id}")]
#[instrument(skip(book, sessions, format, current, input), fields(request_id = request_id.as_str()))]
pub async fn update_operator_handler(
    book: web::Data<SchemeBook>,
    sessions: web::Data<SessionStore>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
    operator_id: web::Path<i64>,
    input: web::Json<OperatorPatchInput>,
) -> Result<HttpResponse, ApiError> {
    let operator_id = operator_id.into_inner();
    let patch = operator_patch(input.into_inner()).map_err(|e| ApiError::new(e, format))?;
    let operator = run(&book, format, move |book| {
        book.update_operator(&current.operator, operator_id, patch)
    })
    .await?;
    sessions.refresh(&operator);
    Ok(responses::ok_http_response(
        GenericOutput {
            operator: Some(responses::operator_data(&operator)),
            ..notice(Notice::OperatorSaved, format)
        },
        format,
    ))
}

#[delete("/operators/{operator_id}")]
#[instrument(skip(book, sessions, format, current), fields(request_id = request_id.as_str()))]
pub async fn delete_operator_handler(
    book: web::Data<SchemeBook>,
    sessions: web::Data<SessionStore>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
    operator_id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let operator_id = operator_id.into_inner();
    run(&book, format, move |book| book.delete_operator(&current.operator, operator_id)).await?;
    let closed = sessions.close_for(operator_id);
    info!(operator_id, closed_sessions = closed, "sessions of deleted operator closed");
    Ok(responses::ok_http_response(
        GenericOutput {
            deleted: Some(DeletedData {
                id: operator_id.to_string(),
                removed_payments: 0,
            }),
            ..notice(Notice::OperatorDeleted, format)
        },
        format,
    ))
}

// ---- settings ----

#[get("/settings")]
#[instrument(skip(book, format, _current), fields(request_id = request_id.as_str()))]
pub async fn settings_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    _current: CurrentOperator,
) -> Result<HttpResponse, ApiError> {
    let settings = run(&book, format, |book| book.settings()).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            settings: Some(responses::settings_data(&settings)),
            ..Default::default()
        },
        format,
    ))
}

#[put("/settings")]
#[instrument(skip(book, format, current), fields(request_id = request_id.as_str()))]
pub async fn update_settings_handler(
    book: web::Data<SchemeBook>,
    request_id: RequestId,
    format: ResponseFormat,
    current: CurrentOperator,
    input: web::Json<SettingsInput>,
) -> Result<HttpResponse, ApiError> {
    let SettingsInput { khss, dss, finance } = input.into_inner();
    let patch = SettingsPatch { khss, dss, finance };
    let settings = run(&book, format, move |book| book.update_settings(&current.operator, patch)).await?;
    Ok(responses::ok_http_response(
        GenericOutput {
            settings: Some(responses::settings_data(&settings)),
            ..notice(Notice::SettingsSaved, format)
        },
        format,
    ))
}

/// Malformed bodies get the same error envelope as every other validation
/// failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        ApiError::new(LedgerError::validation("body", err.to_string()), ResponseFormat::of(req)).into()
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(register_handler)
        .service(login_handler)
        .service(logout_handler)
        .service(menu_handler)
        .service(dashboard_handler)
        .service(list_members_handler)
        .service(create_member_handler)
        .service(member_detail_handler)
        .service(edit_member_handler)
        .service(delete_member_handler)
        .service(submit_payment_handler)
        .service(list_operators_handler)
        .service(create_operator_handler)
        .service(update_operator_handler)
        .service(delete_operator_handler)
        .service(settings_handler)
        .service(update_settings_handler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_request_identifier::RequestIdentifier;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use prost::Message;
    use serde_json::{json, Value};

    use crate::book::BookOptions;
    use crate::database::local::LocalStore;

    fn state() -> (web::Data<SchemeBook>, web::Data<SessionStore>) {
        let book = SchemeBook::new(Arc::new(LocalStore::in_memory()), BookOptions::default());
        book.seed_admin("admin", "admin123").unwrap();
        (web::Data::new(book), web::Data::new(SessionStore::new()))
    }

    macro_rules! init_app {
        ($book:expr, $sessions:expr) => {
            test::init_service(
                App::new()
                    .wrap(RequestIdentifier::with_uuid())
                    .app_data($book)
                    .app_data($sessions)
                    .configure(configure),
            )
            .await
        };
    }

    macro_rules! login {
        ($app:expr, $username:expr, $password:expr) => {{
            let req = test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({ "username": $username, "password": $password }))
                .to_request();
            let body: Value = test::call_and_read_body_json($app, req).await;
            body["session"]["token"].as_str().unwrap().to_string()
        }};
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }

    #[actix_web::test]
    async fn test_member_lifecycle_over_http() {
        let (book, sessions) = state();
        let app = init_app!(book, sessions);
        let token = login!(&app, "Admin", "admin123");

        let req = test::TestRequest::post()
            .uri("/members")
            .insert_header(bearer(&token))
            .set_json(json!({
                "name": "Anitha",
                "phone": "9876543210",
                "address": "Coimbatore",
                "schemeType": "KHSS",
                "numSchemes": 2
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["member"]["id"], "KHSS-001");
        assert_eq!(body["member"]["totalAmount"], "2000");
        assert_eq!(body["message"], "Success. ID: KHSS-001");

        let req = test::TestRequest::post()
            .uri("/members/KHSS-001/payments")
            .insert_header(bearer(&token))
            .insert_header((header::ACCEPT_LANGUAGE, "ta"))
            .set_json(json!({ "amount": "500", "method": "upi" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["paymentReceipt"]["payment"]["balanceAfter"], "1500");
        assert_eq!(body["paymentReceipt"]["payment"]["method"], "upi");
        assert_eq!(body["paymentReceipt"]["member"]["paidAmount"], "500");
        assert_eq!(body["message"], "பணம் பெறப்பட்டது.");

        let req = test::TestRequest::post()
            .uri("/members/KHSS-001/payments")
            .insert_header(bearer(&token))
            .set_json(json!({ "amount": 250 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["paymentReceipt"]["payment"]["balanceAfter"], "1250");
        assert!(body["paymentReceipt"]["payment"]["id"].is_string());

        let req = test::TestRequest::post()
            .uri("/members/KHSS-001/payments")
            .insert_header(bearer(&token))
            .set_json(json!({ "amount": "1e-100000" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/members/KHSS-001")
            .insert_header(bearer(&token))
            .insert_header((header::ACCEPT, "application/x-protobuf"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = test::read_body(resp).await;
        let output = GenericOutput::decode(bytes).unwrap();
        let detail = output.member_detail.unwrap();
        assert_eq!(detail.member.unwrap().balance, "1250");
        assert_eq!(detail.payments.len(), 2);

        let req = test::TestRequest::get()
            .uri("/schemes/khss/members?q=anit")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["memberList"]["members"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri("/members/KHSS-001?cascade=true")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["deleted"]["removedPayments"], 2);
    }

    #[actix_web::test]
    async fn test_validation_errors_are_bad_requests() {
        let (book, sessions) = state();
        let app = init_app!(book, sessions);
        let token = login!(&app, "admin", "admin123");

        let req = test::TestRequest::post()
            .uri("/members")
            .insert_header(bearer(&token))
            .set_json(json!({ "name": "Anitha", "phone": "12345", "schemeType": "DSS" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["oneError"]["badParameter"]["name"], "phone");

        let req = test::TestRequest::post()
            .uri("/members/DSS-001/payments")
            .insert_header(bearer(&token))
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/members/DSS-404/payments")
            .insert_header(bearer(&token))
            .set_json(json!({ "amount": "10" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_sessions_are_required() {
        let (book, sessions) = state();
        let app = init_app!(book, sessions);

        let req = test::TestRequest::get().uri("/dashboard").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "username": "admin", "password": "nope" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let token = login!(&app, "admin", "admin123");
        let req = test::TestRequest::post()
            .uri("/auth/logout")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/dashboard")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_basic_operator_is_forbidden_admin_actions() {
        let (book, sessions) = state();
        let app = init_app!(book, sessions);

        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "name": "Clerk",
                "username": "clerk",
                "password": "clerk-pw",
                "phone": "9000000000",
                "role": "Basic"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["operator"]["role"], "Basic");
        assert!(body["operator"].get("passwordHash").is_none());

        let token = login!(&app, "clerk", "clerk-pw");
        let req = test::TestRequest::get()
            .uri("/menu")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["menu"]["sections"], json!(["dashboard", "khss", "dss", "finance"]));

        for req in [
            test::TestRequest::post()
                .uri("/members")
                .insert_header(bearer(&token))
                .set_json(json!({ "name": "X", "phone": "9876543210", "schemeType": "FIN" })),
            test::TestRequest::put()
                .uri("/settings")
                .insert_header(bearer(&token))
                .set_json(json!({ "KHSS": "1500" })),
            test::TestRequest::get().uri("/operators").insert_header(bearer(&token)),
        ] {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }

        let req = test::TestRequest::get()
            .uri("/settings")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["settings"]["KHSS"], "1000");
    }

    #[actix_web::test]
    async fn test_deleted_operator_loses_session() {
        let (book, sessions) = state();
        let app = init_app!(book, sessions);
        let admin = login!(&app, "admin", "admin123");

        let req = test::TestRequest::post()
            .uri("/operators")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "name": "Gopal",
                "username": "gopal",
                "password": "pw",
                "phone": "9999988888"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let gopal_id: i64 = body["operator"]["id"].as_str().unwrap().parse().unwrap();
        let gopal = login!(&app, "gopal", "pw");

        let req = test::TestRequest::delete()
            .uri(&format!("/operators/{gopal_id}"))
            .insert_header(bearer(&admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/dashboard")
            .insert_header(bearer(&gopal))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
