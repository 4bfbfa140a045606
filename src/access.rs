//! Sessions and role gating.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::domain::{Operator, Role};
use crate::error::LedgerError;

/// Screens of the operator console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Dashboard,
    Khss,
    Dss,
    Finance,
    AddMember,
    AddOperator,
    UserDetails,
    SchemeSettings,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Dashboard,
        Section::Khss,
        Section::Dss,
        Section::Finance,
        Section::AddMember,
        Section::AddOperator,
        Section::UserDetails,
        Section::SchemeSettings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Khss => "khss",
            Section::Dss => "dss",
            Section::Finance => "finance",
            Section::AddMember => "add-member",
            Section::AddOperator => "add-operator",
            Section::UserDetails => "user-details",
            Section::SchemeSettings => "settings",
        }
    }

    pub fn visible_to(self, role: Role) -> bool {
        match self {
            Section::Dashboard | Section::Khss | Section::Dss | Section::Finance => true,
            Section::AddMember | Section::AddOperator | Section::UserDetails | Section::SchemeSettings => {
                role == Role::Admin
            }
        }
    }
}

pub fn menu(role: Role) -> Vec<Section> {
    Section::ALL.into_iter().filter(|s| s.visible_to(role)).collect()
}

pub fn require_admin(actor: &Operator, action: &str) -> Result<(), LedgerError> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(LedgerError::Forbidden(format!("{action} requires an administrator")))
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub operator: Operator,
    pub opened_at: DateTime<Utc>,
}

/// Logged-in operators by bearer token. Holds a snapshot of the operator taken
/// at login, refreshed when an administrator edits that operator.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn open(&self, operator: Operator) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.lock().insert(
            token.clone(),
            Session {
                operator,
                opened_at: Utc::now(),
            },
        );
        token
    }

    pub fn resolve(&self, token: &str) -> Option<Operator> {
        self.lock().get(token).map(|s| s.operator.clone())
    }

    pub fn close(&self, token: &str) -> Option<Session> {
        self.lock().remove(token)
    }

    pub fn refresh(&self, operator: &Operator) {
        for session in self.lock().values_mut() {
            if session.operator.id == operator.id {
                session.operator = operator.clone();
            }
        }
    }

    /// Ends every session of a deleted operator.
    pub fn close_for(&self, operator_id: i64) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.operator.id != operator_id);
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator(id: i64, role: Role) -> Operator {
        Operator {
            id,
            name: "Kavya".to_string(),
            username: "kavya".to_string(),
            password_hash: String::new(),
            phone: "9123456780".to_string(),
            email: None,
            address: None,
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_menu_by_role() {
        assert_eq!(menu(Role::Admin).len(), Section::ALL.len());
        assert_eq!(
            menu(Role::Basic),
            vec![Section::Dashboard, Section::Khss, Section::Dss, Section::Finance]
        );
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&operator(1, Role::Admin), "editing members").is_ok());
        assert!(matches!(
            require_admin(&operator(2, Role::Basic), "editing members"),
            Err(LedgerError::Forbidden(_))
        ));
    }

    #[test]
    fn test_session_lifecycle() {
        let store = SessionStore::new();
        let token = store.open(operator(1, Role::Basic));
        let other = store.open(operator(1, Role::Basic));
        assert_ne!(token, other);
        assert_eq!(store.resolve(&token).unwrap().role, Role::Basic);

        store.refresh(&operator(1, Role::Admin));
        assert_eq!(store.resolve(&other).unwrap().role, Role::Admin);

        assert_eq!(store.close(&token).unwrap().operator.id, 1);
        assert!(store.close(&token).is_none());
        assert!(store.resolve(&token).is_none());

        assert_eq!(store.close_for(1), 1);
        assert!(store.resolve(&other).is_none());
    }
}
