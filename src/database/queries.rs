use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl};

use crate::database::models;
use crate::domain::{Member, Operator, PaymentEntry, SchemeSettings, SchemeType};
use crate::error::LedgerError;

pub fn list_members(conn: &mut PgConnection, scheme: Option<SchemeType>) -> Result<Vec<Member>, LedgerError> {
    use crate::schema::scheme_member::dsl::*;
    let mut query = scheme_member.order((created_at.asc(), member_code.asc())).into_boxed();
    if let Some(scheme) = scheme {
        query = query.filter(scheme_kind.eq(scheme.prefix()));
    }
    query
        .load::<models::MemberRow>(conn)?
        .into_iter()
        .map(Member::try_from)
        .collect()
}

pub fn find_member(conn: &mut PgConnection, req_member_id: &str) -> Result<Option<Member>, LedgerError> {
    use crate::schema::scheme_member::dsl::*;
    scheme_member
        .filter(member_code.eq(req_member_id))
        .first::<models::MemberRow>(conn)
        .optional()?
        .map(Member::try_from)
        .transpose()
}

pub fn count_members(conn: &mut PgConnection, scheme: SchemeType) -> Result<u32, LedgerError> {
    use crate::schema::scheme_member::dsl::*;
    let count: i64 = scheme_member
        .filter(scheme_kind.eq(scheme.prefix()))
        .count()
        .get_result(conn)?;
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

pub fn list_payment_entries(conn: &mut PgConnection, req_member_id: &str) -> Result<Vec<PaymentEntry>, LedgerError> {
    use crate::schema::member_payment::dsl::*;
    member_payment
        .filter(member_code.eq(req_member_id))
        .order((paid_on.asc(), payment_id.asc()))
        .load::<models::PaymentRow>(conn)?
        .into_iter()
        .map(PaymentEntry::try_from)
        .collect()
}

pub fn list_operators(conn: &mut PgConnection) -> Result<Vec<Operator>, LedgerError> {
    use crate::schema::login_user::dsl::*;
    login_user
        .order(created_at.asc())
        .load::<models::OperatorRow>(conn)?
        .into_iter()
        .map(Operator::try_from)
        .collect()
}

pub fn find_operator(conn: &mut PgConnection, req_id: i64) -> Result<Option<Operator>, LedgerError> {
    use crate::schema::login_user::dsl::*;
    login_user
        .filter(user_id.eq(req_id))
        .first::<models::OperatorRow>(conn)
        .optional()?
        .map(Operator::try_from)
        .transpose()
}

pub fn find_operator_by_username(conn: &mut PgConnection, req_username: &str) -> Result<Option<Operator>, LedgerError> {
    use crate::schema::login_user::dsl::*;
    login_user
        .filter(login_name.eq(req_username))
        .first::<models::OperatorRow>(conn)
        .optional()?
        .map(Operator::try_from)
        .transpose()
}

// schemes without a saved row keep their default price
pub fn load_settings(conn: &mut PgConnection) -> Result<SchemeSettings, LedgerError> {
    use crate::schema::scheme_setting::dsl::*;
    let rows = scheme_setting.load::<(String, bigdecimal::BigDecimal)>(conn)?;
    let mut settings = SchemeSettings::default();
    for (kind, price) in rows {
        let scheme: SchemeType = kind
            .parse()
            .map_err(|e| LedgerError::persistence(format!("corrupt scheme_setting row: {e}")))?;
        settings.set_unit_price(scheme, price);
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{connect, mutations};
    use crate::domain::PaymentMethod;
    use bigdecimal::BigDecimal;
    use chrono::{Duration, Utc};
    use diesel::result::Error;
    use diesel::Connection;

    #[test]
    #[ignore = "needs DATABASE_URL pointing at a postgres database"]
    fn test_payment_entries_ordered_by_date() {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = connect::create_db_connection_pool(&url).unwrap();
        connect::run_migrations(&pool).unwrap();

        pool.get().unwrap().test_transaction::<_, Error, _>(|conn| {
            let now = Utc::now();
            for (id, days_ago) in [(30_i64, 0_i64), (10, 3), (20, 1)] {
                mutations::append_payment_entry(
                    conn,
                    &PaymentEntry {
                        id,
                        member_id: "KHSS-900".to_string(),
                        amount: BigDecimal::from(100),
                        date: now - Duration::days(days_ago),
                        method: PaymentMethod::Cash,
                        balance_after: BigDecimal::from(0),
                    },
                )
                .unwrap();
            }
            let ids: Vec<i64> = list_payment_entries(conn, "KHSS-900")
                .unwrap()
                .into_iter()
                .map(|p| p.id)
                .collect();
            assert_eq!(ids, vec![10, 20, 30]);
            Ok(())
        });
    }

    #[test]
    #[ignore = "needs DATABASE_URL pointing at a postgres database"]
    fn test_settings_default_until_saved() {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = connect::create_db_connection_pool(&url).unwrap();
        connect::run_migrations(&pool).unwrap();

        pool.get().unwrap().test_transaction::<_, Error, _>(|conn| {
            diesel::delete(crate::schema::scheme_setting::table).execute(conn)?;
            assert_eq!(load_settings(conn).unwrap(), SchemeSettings::default());

            let mut settings = SchemeSettings::default();
            settings.set_unit_price(SchemeType::Finance, BigDecimal::from(7500));
            mutations::save_settings(conn, &settings).unwrap();
            assert_eq!(load_settings(conn).unwrap().finance, BigDecimal::from(7500));
            Ok(())
        });
    }
}
