use diesel::sql_types::{Int4, Varchar};
use diesel::{Connection, ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};

use crate::database::models;
use crate::domain::{Member, Operator, PaymentEntry, SchemeSettings, SchemeType};
use crate::error::LedgerError;

#[derive(diesel::QueryableByName)]
struct SequenceValue {
    #[diesel(sql_type = Int4)]
    last_value: i32,
}

// bumps the scheme counter in a single statement, so concurrent callers never
// see the same value
pub fn next_member_sequence(conn: &mut PgConnection, scheme: SchemeType, floor: u32) -> Result<u32, LedgerError> {
    let floor = i32::try_from(floor).unwrap_or(i32::MAX - 1);
    let row = diesel::sql_query(
        "INSERT INTO member_sequence (scheme_kind, last_value) VALUES ($1, $2 + 1) \
         ON CONFLICT (scheme_kind) DO UPDATE \
         SET last_value = GREATEST(member_sequence.last_value, $2) + 1 \
         RETURNING last_value",
    )
    .bind::<Varchar, _>(scheme.prefix())
    .bind::<Int4, _>(floor)
    .get_result::<SequenceValue>(conn)?;
    u32::try_from(row.last_value).map_err(|_| LedgerError::persistence("member sequence went negative"))
}

pub fn create_member(conn: &mut PgConnection, member: &Member) -> Result<Member, LedgerError> {
    use crate::schema::scheme_member::dsl::*;
    let row = models::MemberRow::try_from(member)?;
    diesel::insert_into(scheme_member).values(&row).execute(conn)?;
    Ok(member.clone())
}

pub fn update_member(conn: &mut PgConnection, member: &Member) -> Result<Member, LedgerError> {
    use crate::schema::scheme_member::dsl::*;
    let row = models::MemberRow::try_from(member)?;
    let updated = diesel::update(scheme_member.filter(member_code.eq(&row.member_code)))
        .set((
            full_name.eq(&row.full_name),
            mobile.eq(&row.mobile),
            address.eq(&row.address),
            total_amount.eq(&row.total_amount),
            scheme_count.eq(row.scheme_count),
            gift_item.eq(&row.gift_item),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Err(LedgerError::not_found("member", &member.id));
    }
    Ok(member.clone())
}

pub fn delete_member(conn: &mut PgConnection, req_member_id: &str) -> Result<(), LedgerError> {
    use crate::schema::scheme_member::dsl::*;
    let deleted = diesel::delete(scheme_member.filter(member_code.eq(req_member_id))).execute(conn)?;
    if deleted == 0 {
        return Err(LedgerError::not_found("member", req_member_id));
    }
    Ok(())
}

pub fn append_payment_entry(conn: &mut PgConnection, entry: &PaymentEntry) -> Result<PaymentEntry, LedgerError> {
    use crate::schema::member_payment::dsl::*;
    diesel::insert_into(member_payment)
        .values(&models::PaymentRow::from(entry))
        .execute(conn)?;
    Ok(entry.clone())
}

pub fn delete_payment_entries(conn: &mut PgConnection, req_member_id: &str) -> Result<usize, LedgerError> {
    use crate::schema::member_payment::dsl::*;
    Ok(diesel::delete(member_payment.filter(member_code.eq(req_member_id))).execute(conn)?)
}

pub fn create_operator(conn: &mut PgConnection, operator: &Operator) -> Result<Operator, LedgerError> {
    use crate::schema::login_user::dsl::*;
    diesel::insert_into(login_user)
        .values(&models::OperatorRow::from(operator))
        .execute(conn)
        .map_err(|e| match LedgerError::from(e) {
            LedgerError::Conflict(_) => {
                LedgerError::Conflict(format!("username {} is already taken", operator.username))
            }
            other => other,
        })?;
    Ok(operator.clone())
}

pub fn update_operator(conn: &mut PgConnection, operator: &Operator) -> Result<Operator, LedgerError> {
    use crate::schema::login_user::dsl::*;
    let row = models::OperatorRow::from(operator);
    let updated = diesel::update(login_user.filter(user_id.eq(row.user_id)))
        .set((
            display_name.eq(&row.display_name),
            login_name.eq(&row.login_name),
            password_hash.eq(&row.password_hash),
            mobile.eq(&row.mobile),
            email.eq(&row.email),
            address.eq(&row.address),
            user_role.eq(&row.user_role),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Err(LedgerError::not_found("operator", operator.id));
    }
    Ok(operator.clone())
}

pub fn delete_operator(conn: &mut PgConnection, req_id: i64) -> Result<(), LedgerError> {
    use crate::schema::login_user::dsl::*;
    let deleted = diesel::delete(login_user.filter(user_id.eq(req_id))).execute(conn)?;
    if deleted == 0 {
        return Err(LedgerError::not_found("operator", req_id));
    }
    Ok(())
}

pub fn save_settings(conn: &mut PgConnection, settings: &SchemeSettings) -> Result<SchemeSettings, LedgerError> {
    // wrap in transaction
    conn.transaction::<_, LedgerError, _>(|conn| {
        use crate::schema::scheme_setting::dsl::*;
        for scheme in SchemeType::ALL {
            let price = settings.unit_price(scheme);
            diesel::insert_into(scheme_setting)
                .values((scheme_kind.eq(scheme.prefix()), unit_price.eq(price)))
                .on_conflict(scheme_kind)
                .do_update()
                .set(unit_price.eq(price))
                .execute(conn)?;
        }
        Ok(settings.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{connect, queries};
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use diesel::result::Error;

    fn pool() -> connect::PgPool {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = connect::create_db_connection_pool(&url).unwrap();
        connect::run_migrations(&pool).unwrap();
        pool
    }

    #[test]
    #[ignore = "needs DATABASE_URL pointing at a postgres database"]
    fn test_member_round_trip() {
        pool().get().unwrap().test_transaction::<_, Error, _>(|conn| {
            let member = Member {
                id: "FIN-900".to_string(),
                name: "Selvi".to_string(),
                phone: "9444444444".to_string(),
                address: "Salem".to_string(),
                total_amount: BigDecimal::from(5000),
                num_schemes: 1,
                scheme_type: SchemeType::Finance,
                selected_item: None,
                created_at: Utc::now(),
            };
            create_member(conn, &member).unwrap();
            assert!(matches!(create_member(conn, &member), Err(LedgerError::Conflict(_))));

            let loaded = queries::find_member(conn, "FIN-900").unwrap().unwrap();
            assert_eq!(loaded.total_amount, BigDecimal::from(5000));

            let mut edited = loaded.clone();
            edited.num_schemes = 2;
            edited.total_amount = BigDecimal::from(10000);
            update_member(conn, &edited).unwrap();
            let loaded = queries::find_member(conn, "FIN-900").unwrap().unwrap();
            assert_eq!(loaded.num_schemes, 2);

            delete_member(conn, "FIN-900").unwrap();
            assert!(matches!(delete_member(conn, "FIN-900"), Err(LedgerError::NotFound { .. })));
            Ok(())
        });
    }

    #[test]
    #[ignore = "needs DATABASE_URL pointing at a postgres database"]
    fn test_next_member_sequence() {
        pool().get().unwrap().test_transaction::<_, Error, _>(|conn| {
            diesel::delete(crate::schema::member_sequence::table).execute(conn)?;
            assert_eq!(next_member_sequence(conn, SchemeType::Dss, 0).unwrap(), 1);
            assert_eq!(next_member_sequence(conn, SchemeType::Dss, 0).unwrap(), 2);
            assert_eq!(next_member_sequence(conn, SchemeType::Dss, 7).unwrap(), 8);
            assert_eq!(next_member_sequence(conn, SchemeType::Khss, 0).unwrap(), 1);
            Ok(())
        });
    }
}
