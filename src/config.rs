use std::path::PathBuf;
use std::str::FromStr;

use crate::allocator::MemberIdPolicy;
use crate::book::BookOptions;
use crate::database::StorageConfig;
use crate::ledger::BalancePolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has unsupported value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub storage: StorageConfig,
    pub log_level: tracing::Level,
    pub book: BookOptions,
    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    /// Reads the process environment after loading `.env`, if any.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let storage = match var("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageConfig::Local {
                path: var("LOCAL_STORE_PATH").map(PathBuf::from),
            },
            "postgres" => StorageConfig::Postgres {
                database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let defaults = BookOptions::default();
        let book = BookOptions {
            balance_policy: parse_or(var("BALANCE_POLICY"), "BALANCE_POLICY", defaults.balance_policy)?,
            member_id_policy: parse_or(var("MEMBER_ID_POLICY"), "MEMBER_ID_POLICY", defaults.member_id_policy)?,
            allow_self_assigned_admin: parse_or(
                var("ALLOW_SELF_ASSIGNED_ADMIN"),
                "ALLOW_SELF_ASSIGNED_ADMIN",
                defaults.allow_self_assigned_admin,
            )?,
        };

        Ok(Self {
            bind_address: var("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            storage,
            log_level: parse_or(var("LOG_LEVEL"), "LOG_LEVEL", tracing::Level::INFO)?,
            book,
            admin_username: var("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password: var("ADMIN_PASSWORD").unwrap_or_else(|| "admin123".to_string()),
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.to_ascii_lowercase().parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}
