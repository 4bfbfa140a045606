//! The scheme book: members, their payment ledgers, operators and unit prices,
//! with every operator-facing operation. Storage is whatever [`Repository`] it
//! was built with.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::access::require_admin;
use crate::allocator::{self, MemberIdPolicy};
use crate::database::Repository;
use crate::domain::{
    parse_amount, parse_price, require_text, validate_num_schemes, validate_phone, GiftItem, Member, Operator,
    PaymentEntry, PaymentMethod, Role, SchemeSettings, SchemeType,
};
use crate::error::LedgerError;
use crate::ledger::{self, BalancePolicy, Projection};
use crate::{idgen, password};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookOptions {
    pub balance_policy: BalancePolicy,
    pub member_id_policy: MemberIdPolicy,
    /// Lets anyone registering pick the Admin role for themselves.
    pub allow_self_assigned_admin: bool,
}

impl Default for BookOptions {
    fn default() -> Self {
        Self {
            balance_policy: BalancePolicy::Recompute,
            member_id_policy: MemberIdPolicy::Sequence,
            allow_self_assigned_admin: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewMember {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub scheme_type: Option<SchemeType>,
    pub num_schemes: Option<u32>,
    pub selected_item: Option<GiftItem>,
}

/// Fields an administrator may change on a member. Id and scheme type are
/// fixed for life.
#[derive(Debug, Clone, Default)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub num_schemes: Option<u32>,
    pub selected_item: Option<GiftItem>,
    pub scheme_type: Option<SchemeType>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPayment {
    pub amount: String,
    pub date: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Default)]
pub struct NewOperator {
    pub name: String,
    pub username: String,
    pub password: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default)]
pub struct OperatorPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

/// Prices to change; schemes left out keep their current price.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub khss: Option<String>,
    pub dss: Option<String>,
    pub finance: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberView {
    pub member: Member,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberDetail {
    pub member: Member,
    pub entries: Vec<PaymentEntry>,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub entry: PaymentEntry,
    pub member: Member,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub counts: Vec<(SchemeType, u32)>,
    /// Five most recently created members, newest first.
    pub recent: Vec<MemberView>,
}

const RECENT_MEMBERS: usize = 5;

pub struct SchemeBook {
    repo: Arc<dyn Repository>,
    options: BookOptions,
}

fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn matches_search(haystacks: &[&str], needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    needle.is_empty() || haystacks.iter().any(|h| h.to_lowercase().contains(&needle))
}

impl SchemeBook {
    pub fn new(repo: Arc<dyn Repository>, options: BookOptions) -> Self {
        Self { repo, options }
    }

    fn view(&self, member: Member) -> Result<MemberView, LedgerError> {
        let entries = self.repo.list_payment_entries(&member.id)?;
        let projection = ledger::project(&member.total_amount, &entries, self.options.balance_policy);
        Ok(MemberView { member, projection })
    }

    fn member(&self, id: &str) -> Result<Member, LedgerError> {
        self.repo
            .find_member(id)?
            .ok_or_else(|| LedgerError::not_found("member", id))
    }

    // ---- scheme settings ----

    pub fn settings(&self) -> Result<SchemeSettings, LedgerError> {
        self.repo.load_settings()
    }

    /// New prices only affect members created or re-counted afterwards.
    #[instrument(skip(self, actor, patch), fields(actor = %actor.username))]
    pub fn update_settings(&self, actor: &Operator, patch: SettingsPatch) -> Result<SchemeSettings, LedgerError> {
        require_admin(actor, "changing scheme prices")?;
        let mut settings = self.repo.load_settings()?;
        for (scheme, raw) in [
            (SchemeType::Khss, patch.khss),
            (SchemeType::Dss, patch.dss),
            (SchemeType::Finance, patch.finance),
        ] {
            if let Some(raw) = raw {
                settings.set_unit_price(scheme, parse_price(scheme.prefix(), &raw)?);
            }
        }
        let settings = self.repo.save_settings(&settings)?;
        info!(khss = %settings.khss, dss = %settings.dss, finance = %settings.finance, "scheme prices updated");
        Ok(settings)
    }

    // ---- members ----

    fn allocate_member_id(&self, scheme: SchemeType) -> Result<String, LedgerError> {
        match self.options.member_id_policy {
            MemberIdPolicy::Count => Ok(allocator::allocate(scheme, self.repo.count_members(scheme)?)),
            MemberIdPolicy::Sequence => {
                // ids issued before the counter existed must not be handed out again
                let floor = self
                    .repo
                    .list_members(scheme)?
                    .iter()
                    .filter_map(|m| allocator::parse_sequence(scheme, &m.id))
                    .max()
                    .unwrap_or(0);
                let sequence = self.repo.next_member_sequence(scheme, floor)?;
                Ok(allocator::format_id(scheme, sequence))
            }
        }
    }

    #[instrument(skip(self, actor, new), fields(actor = %actor.username))]
    pub fn create_member(&self, actor: &Operator, new: NewMember) -> Result<MemberView, LedgerError> {
        require_admin(actor, "adding members")?;
        require_text("name", &new.name)?;
        validate_phone(&new.phone)?;
        let scheme = new
            .scheme_type
            .ok_or_else(|| LedgerError::validation("scheme_type", "is required"))?;
        let num_schemes = new.num_schemes.unwrap_or(1);
        validate_num_schemes(num_schemes)?;

        let settings = self.repo.load_settings()?;
        let member = Member {
            id: self.allocate_member_id(scheme)?,
            name: new.name.trim().to_string(),
            phone: new.phone,
            address: new.address.trim().to_string(),
            total_amount: settings.total_for(scheme, num_schemes),
            num_schemes,
            scheme_type: scheme,
            selected_item: match scheme {
                SchemeType::Dss => Some(new.selected_item.unwrap_or_default()),
                _ => None,
            },
            created_at: Utc::now(),
        };
        let member = self.repo.create_member(&member)?;
        info!(member_id = %member.id, total = %member.total_amount, "member created");
        Ok(MemberView {
            projection: ledger::project(&member.total_amount, &[], self.options.balance_policy),
            member,
        })
    }

    /// Changing `num_schemes` re-prices the member at today's unit price.
    #[instrument(skip(self, actor, patch), fields(actor = %actor.username))]
    pub fn edit_member(&self, actor: &Operator, member_id: &str, patch: MemberPatch) -> Result<MemberView, LedgerError> {
        require_admin(actor, "editing members")?;
        let mut member = self.member(member_id)?;

        if patch.id.as_deref().is_some_and(|id| id != member.id) {
            return Err(LedgerError::validation("id", "cannot be changed"));
        }
        if patch.scheme_type.is_some_and(|s| s != member.scheme_type) {
            return Err(LedgerError::validation("scheme_type", "cannot be changed"));
        }
        if let Some(name) = patch.name {
            require_text("name", &name)?;
            member.name = name.trim().to_string();
        }
        if let Some(phone) = patch.phone {
            validate_phone(&phone)?;
            member.phone = phone;
        }
        if let Some(address) = patch.address {
            member.address = address.trim().to_string();
        }
        if let Some(item) = patch.selected_item {
            if member.scheme_type != SchemeType::Dss {
                return Err(LedgerError::validation("selected_item", "only festival scheme members pick an item"));
            }
            member.selected_item = Some(item);
        }
        if let Some(num_schemes) = patch.num_schemes {
            validate_num_schemes(num_schemes)?;
            let settings = self.repo.load_settings()?;
            member.num_schemes = num_schemes;
            member.total_amount = settings.total_for(member.scheme_type, num_schemes);
        }

        let member = self.repo.update_member(&member)?;
        info!(member_id = %member.id, total = %member.total_amount, "member updated");
        self.view(member)
    }

    /// Payment entries stay behind unless `cascade` is set. Returns how many
    /// entries were removed.
    ///
    /// With `cascade`, entries left behind by an earlier plain delete are
    /// purged even though the member row is already gone.
    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub fn delete_member(&self, actor: &Operator, member_id: &str, cascade: bool) -> Result<usize, LedgerError> {
        require_admin(actor, "deleting members")?;
        let existed = match self.repo.delete_member(member_id) {
            Ok(()) => true,
            Err(LedgerError::NotFound { .. }) if cascade => false,
            Err(e) => return Err(e),
        };
        let removed = if cascade {
            self.repo.delete_payment_entries(member_id)?
        } else {
            0
        };
        if !existed && removed == 0 {
            return Err(LedgerError::not_found("member", member_id));
        }
        info!(member_id, removed_payments = removed, "member deleted");
        Ok(removed)
    }

    /// Members of a scheme, oldest first, optionally narrowed by a
    /// case-insensitive match on name or id.
    pub fn list_members(&self, scheme: SchemeType, search: Option<&str>) -> Result<Vec<MemberView>, LedgerError> {
        self.repo
            .list_members(scheme)?
            .into_iter()
            .filter(|m| search.map_or(true, |q| matches_search(&[&m.name, &m.id], q)))
            .map(|m| self.view(m))
            .collect()
    }

    pub fn member_detail(&self, member_id: &str) -> Result<MemberDetail, LedgerError> {
        let member = self.member(member_id)?;
        let entries = self.repo.list_payment_entries(&member.id)?;
        let projection = ledger::project(&member.total_amount, &entries, self.options.balance_policy);
        Ok(MemberDetail {
            member,
            entries,
            projection,
        })
    }

    pub fn dashboard(&self) -> Result<Dashboard, LedgerError> {
        let members = self.repo.list_all_members()?;
        let counts = SchemeType::ALL
            .into_iter()
            .map(|scheme| {
                let count = members.iter().filter(|m| m.scheme_type == scheme).count();
                (scheme, count as u32)
            })
            .collect();
        let mut newest = members;
        newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let recent = newest
            .into_iter()
            .take(RECENT_MEMBERS)
            .map(|m| self.view(m))
            .collect::<Result<_, _>>()?;
        Ok(Dashboard { counts, recent })
    }

    // ---- payments ----

    #[instrument(skip(self, payment), fields(amount = %payment.amount))]
    pub fn submit_payment(&self, member_id: &str, payment: NewPayment) -> Result<PaymentReceipt, LedgerError> {
        let amount = parse_amount(&payment.amount)?;
        let member = self.member(member_id)?;
        let prior = self.repo.list_payment_entries(&member.id)?;

        let entry = PaymentEntry {
            id: idgen::next(),
            member_id: member.id.clone(),
            balance_after: ledger::balance_after(&member.total_amount, &prior, &amount),
            amount,
            date: payment.date.unwrap_or_else(Utc::now),
            method: payment.method.unwrap_or_default(),
        };
        let entry = self.repo.append_payment_entry(&entry)?;

        let mut entries = prior;
        entries.push(entry.clone());
        let projection = ledger::project(&member.total_amount, &entries, self.options.balance_policy);
        info!(
            member_id = %member.id,
            payment_id = entry.id,
            paid = %projection.paid,
            balance = %projection.balance,
            "payment recorded"
        );
        Ok(PaymentReceipt {
            entry,
            member,
            projection,
        })
    }

    // ---- operators ----

    fn build_operator(&self, new: NewOperator, role: Role) -> Result<Operator, LedgerError> {
        require_text("name", &new.name)?;
        require_text("username", &new.username)?;
        require_text("password", &new.password)?;
        validate_phone(&new.phone)?;
        Ok(Operator {
            id: idgen::next(),
            name: new.name.trim().to_string(),
            username: normalize_username(&new.username),
            password_hash: password::hash_password(&new.password)?,
            phone: new.phone,
            email: non_empty(new.email),
            address: non_empty(new.address),
            role,
            created_at: Utc::now(),
        })
    }

    /// Self-service sign-up. The account is active at once with the role the
    /// registrant asked for, unless Admin self-assignment is switched off.
    #[instrument(skip(self, new), fields(username = %new.username))]
    pub fn register(&self, new: NewOperator) -> Result<Operator, LedgerError> {
        let role = new.role.unwrap_or(Role::Basic);
        if role == Role::Admin && !self.options.allow_self_assigned_admin {
            return Err(LedgerError::Forbidden(
                "administrator accounts must be created by an administrator".to_string(),
            ));
        }
        let operator = self.repo.create_operator(&self.build_operator(new, role)?)?;
        if operator.role == Role::Admin {
            warn!(username = %operator.username, "self-registered administrator");
        }
        info!(operator_id = operator.id, role = operator.role.as_str(), "operator registered");
        Ok(operator)
    }

    /// Same error for an unknown username and for a wrong password.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Operator, LedgerError> {
        let operator = self
            .repo
            .find_operator_by_username(&normalize_username(username))?
            .filter(|op| password::verify_password(password, &op.password_hash))
            .ok_or(LedgerError::InvalidCredentials)?;
        info!(operator_id = operator.id, "operator logged in");
        Ok(operator)
    }

    /// Creates the first administrator when the directory is empty.
    pub fn seed_admin(&self, username: &str, password: &str) -> Result<Option<Operator>, LedgerError> {
        if !self.repo.list_operators()?.is_empty() {
            return Ok(None);
        }
        let admin = self.build_operator(
            NewOperator {
                name: "System Admin".to_string(),
                username: username.to_string(),
                password: password.to_string(),
                phone: "0000000000".to_string(),
                address: Some("System".to_string()),
                ..Default::default()
            },
            Role::Admin,
        )?;
        let admin = self.repo.create_operator(&admin)?;
        info!(username = %admin.username, "seeded initial administrator");
        Ok(Some(admin))
    }

    pub fn operator(&self, operator_id: i64) -> Result<Operator, LedgerError> {
        self.repo
            .find_operator(operator_id)?
            .ok_or_else(|| LedgerError::not_found("operator", operator_id))
    }

    pub fn list_operators(&self, actor: &Operator, search: Option<&str>) -> Result<Vec<Operator>, LedgerError> {
        require_admin(actor, "managing operators")?;
        Ok(self
            .repo
            .list_operators()?
            .into_iter()
            .filter(|op| search.map_or(true, |q| matches_search(&[&op.name], q)))
            .collect())
    }

    #[instrument(skip(self, actor, new), fields(actor = %actor.username, username = %new.username))]
    pub fn create_operator(&self, actor: &Operator, new: NewOperator) -> Result<Operator, LedgerError> {
        require_admin(actor, "managing operators")?;
        let role = new.role.unwrap_or(Role::Basic);
        let operator = self.repo.create_operator(&self.build_operator(new, role)?)?;
        info!(operator_id = operator.id, role = operator.role.as_str(), "operator created");
        Ok(operator)
    }

    #[instrument(skip(self, actor, patch), fields(actor = %actor.username))]
    pub fn update_operator(&self, actor: &Operator, operator_id: i64, patch: OperatorPatch) -> Result<Operator, LedgerError> {
        require_admin(actor, "managing operators")?;
        let mut operator = self.operator(operator_id)?;
        if let Some(name) = patch.name {
            require_text("name", &name)?;
            operator.name = name.trim().to_string();
        }
        if let Some(phone) = patch.phone {
            validate_phone(&phone)?;
            operator.phone = phone;
        }
        if patch.email.is_some() {
            operator.email = non_empty(patch.email);
        }
        if patch.address.is_some() {
            operator.address = non_empty(patch.address);
        }
        if let Some(role) = patch.role {
            operator.role = role;
        }
        if let Some(password) = patch.password {
            require_text("password", &password)?;
            operator.password_hash = password::hash_password(&password)?;
        }
        let operator = self.repo.update_operator(&operator)?;
        info!(operator_id = operator.id, "operator updated");
        Ok(operator)
    }

    #[instrument(skip(self, actor), fields(actor = %actor.username))]
    pub fn delete_operator(&self, actor: &Operator, operator_id: i64) -> Result<(), LedgerError> {
        require_admin(actor, "managing operators")?;
        if actor.id == operator_id {
            return Err(LedgerError::Forbidden("operators cannot delete their own account".to_string()));
        }
        self.repo.delete_operator(operator_id)?;
        info!(operator_id, "operator deleted");
        Ok(())
    }
}

/// Ratio of paid to total, capped at 100; zero totals count as fully paid
/// once anything was paid.
pub fn progress_percent(total: &BigDecimal, paid: &BigDecimal) -> BigDecimal {
    use bigdecimal::{Signed, Zero};
    let hundred = BigDecimal::from(100);
    if total.is_zero() || total.is_negative() {
        return if paid.is_zero() { BigDecimal::from(0) } else { hundred };
    }
    let pct = (paid * &hundred / total).with_scale(2);
    if pct > hundred {
        hundred
    } else {
        pct
    }
}
