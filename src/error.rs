use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every failure an operator action can run into.
///
/// Errors are scoped to the request that triggered them; none of them is fatal
/// to the process.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Same error whether the username or the password was wrong.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("a valid session is required")]
    Unauthenticated,

    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Persistence(#[source] BoxError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn persistence(err: impl Into<BoxError>) -> Self {
        Self::Persistence(err.into())
    }

    /// Client mistakes are logged at warn, everything else at error.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Persistence(_) | Self::Internal(_))
    }
}

impl From<DieselError> for LedgerError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::Conflict(info.message().to_string())
            }
            other => Self::persistence(other),
        }
    }
}

impl From<diesel::r2d2::PoolError> for LedgerError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::persistence(err)
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(err)
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::persistence(err)
    }
}

impl From<actix_web::error::BlockingError> for LedgerError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_is_conflict() {
        struct Info;
        impl diesel::result::DatabaseErrorInformation for Info {
            fn message(&self) -> &str {
                "duplicate key value violates unique constraint"
            }
            fn details(&self) -> Option<&str> {
                None
            }
            fn hint(&self) -> Option<&str> {
                None
            }
            fn table_name(&self) -> Option<&str> {
                None
            }
            fn column_name(&self) -> Option<&str> {
                None
            }
            fn constraint_name(&self) -> Option<&str> {
                None
            }
            fn statement_position(&self) -> Option<i32> {
                None
            }
        }

        let err = LedgerError::from(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(Info),
        ));
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert!(err.is_client_error());

        let err = LedgerError::from(DieselError::NotFound);
        assert!(matches!(err, LedgerError::Persistence(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            LedgerError::validation("phone", "must be exactly 10 digits").to_string(),
            "invalid phone: must be exactly 10 digits"
        );
        assert_eq!(
            LedgerError::not_found("member", "KHSS-001").to_string(),
            "member KHSS-001 not found"
        );
    }
}
