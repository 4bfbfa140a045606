//! English and Tamil notification texts. Display only; stored data never
//! depends on the locale.

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ta,
}

impl Locale {
    /// Picks the first supported language of an `Accept-Language` value.
    pub fn from_accept_language(header: &str) -> Self {
        header
            .split(',')
            .filter_map(|part| part.split(';').next())
            .map(|tag| tag.trim().to_ascii_lowercase())
            .find_map(|tag| match tag.split('-').next() {
                Some("ta") => Some(Locale::Ta),
                Some("en") => Some(Locale::En),
                _ => None,
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LoggedIn,
    LoggedOut,
    MemberCreated(String),
    MemberUpdated,
    MemberDeleted,
    PaymentReceived,
    SettingsSaved,
    OperatorSaved,
    OperatorDeleted,
}

impl Notice {
    pub fn text(&self, locale: Locale) -> String {
        match (self, locale) {
            (Notice::LoggedIn, Locale::En) => "Welcome back.".to_string(),
            (Notice::LoggedIn, Locale::Ta) => "மீண்டும் வருக.".to_string(),
            (Notice::LoggedOut, Locale::En) => "Logged out.".to_string(),
            (Notice::LoggedOut, Locale::Ta) => "வெளியேறினீர்கள்.".to_string(),
            (Notice::MemberCreated(id), Locale::En) => format!("Success. ID: {id}"),
            (Notice::MemberCreated(id), Locale::Ta) => format!("வெற்றி. ஐடி: {id}"),
            (Notice::MemberUpdated, Locale::En) => "Member updated.".to_string(),
            (Notice::MemberUpdated, Locale::Ta) => "உறுப்பினர் புதுப்பிக்கப்பட்டார்.".to_string(),
            (Notice::MemberDeleted, Locale::En) => "Member deleted.".to_string(),
            (Notice::MemberDeleted, Locale::Ta) => "உறுப்பினர் நீக்கப்பட்டார்.".to_string(),
            (Notice::PaymentReceived, Locale::En) => "Payment received.".to_string(),
            (Notice::PaymentReceived, Locale::Ta) => "பணம் பெறப்பட்டது.".to_string(),
            (Notice::SettingsSaved, Locale::En) => "Settings saved.".to_string(),
            (Notice::SettingsSaved, Locale::Ta) => "அமைப்புகள் சேமிக்கப்பட்டன.".to_string(),
            (Notice::OperatorSaved, Locale::En) => "Operator saved.".to_string(),
            (Notice::OperatorSaved, Locale::Ta) => "நிர்வாகி சேமிக்கப்பட்டார்.".to_string(),
            (Notice::OperatorDeleted, Locale::En) => "Operator deleted.".to_string(),
            (Notice::OperatorDeleted, Locale::Ta) => "நிர்வாகி நீக்கப்பட்டார்.".to_string(),
        }
    }
}

/// Short operator-facing text for an error; internal details stay in the logs.
pub fn error_text(err: &LedgerError, locale: Locale) -> String {
    match (err, locale) {
        (LedgerError::Validation { field: "amount", .. }, Locale::En) => "Invalid amount.".to_string(),
        (LedgerError::Validation { field: "amount", .. }, Locale::Ta) => "தவறான தொகை.".to_string(),
        (LedgerError::Validation { field: "phone", .. }, Locale::En) => {
            "Phone number must be exactly 10 digits.".to_string()
        }
        (LedgerError::Validation { field: "phone", .. }, Locale::Ta) => {
            "தொலைபேசி எண் சரியாக 10 இலக்கங்களாக இருக்க வேண்டும்.".to_string()
        }
        (LedgerError::Validation { field, reason }, Locale::En) => format!("Invalid {field}: {reason}."),
        (LedgerError::Validation { field, .. }, Locale::Ta) => format!("தவறான உள்ளீடு: {field}."),
        (LedgerError::InvalidCredentials, Locale::En) => "Invalid username or password.".to_string(),
        (LedgerError::InvalidCredentials, Locale::Ta) => "தவறான பயனர் பெயர் அல்லது கடவுச்சொல்.".to_string(),
        (LedgerError::Unauthenticated, Locale::En) => "Please log in.".to_string(),
        (LedgerError::Unauthenticated, Locale::Ta) => "தயவுசெய்து உள்நுழையவும்.".to_string(),
        (LedgerError::Forbidden(_), Locale::En) => "You do not have permission for this action.".to_string(),
        (LedgerError::Forbidden(_), Locale::Ta) => "இந்த செயலுக்கு அனுமதி இல்லை.".to_string(),
        (LedgerError::NotFound { resource, id }, Locale::En) => format!("No {resource} found for {id}."),
        (LedgerError::NotFound { id, .. }, Locale::Ta) => format!("{id} காணப்படவில்லை."),
        (LedgerError::Conflict(reason), Locale::En) => format!("Already exists: {reason}."),
        (LedgerError::Conflict(_), Locale::Ta) => "ஏற்கனவே உள்ளது.".to_string(),
        (LedgerError::Persistence(_) | LedgerError::Internal(_), Locale::En) => {
            "Something went wrong, please try again.".to_string()
        }
        (LedgerError::Persistence(_) | LedgerError::Internal(_), Locale::Ta) => {
            "பிழை ஏற்பட்டது, மீண்டும் முயற்சிக்கவும்.".to_string()
        }
    }
}
