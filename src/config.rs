use std::fmt;

use crate::errors::{SnowflakeError, SnowflakeResult};

pub const DEFAULT_ROLE: &str = "ACCOUNTADMIN";
pub const DEFAULT_WAREHOUSE: &str = "COMPUTE_WH";
pub const DEFAULT_DATABASE: &str = "TASTY_BYTES_SAMPLE_DATA";
pub const DEFAULT_SCHEMA: &str = "RAW_POS";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings exactly as found in the environment
///
/// Nothing is validated here; [`ConnectionSettings::resolve`] turns this into a
/// [`ConnectionConfig`] or names the first missing required value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub account: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub timeout_secs: Option<u64>,
    pub host: Option<String>,
}

impl ConnectionSettings {
    /// Read the `SNOWFLAKE_*` variables, loading a `.env` file first if there is one
    pub fn from_env() -> ConnectionSettings {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any key lookup, treating empty values as unset
    pub fn from_lookup<F>(lookup: F) -> ConnectionSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        ConnectionSettings {
            account: get("SNOWFLAKE_ACCOUNT"),
            user: get("SNOWFLAKE_USER"),
            password: get("SNOWFLAKE_PASSWORD"),
            role: get("SNOWFLAKE_ROLE"),
            warehouse: get("SNOWFLAKE_WAREHOUSE"),
            database: get("SNOWFLAKE_DATABASE"),
            schema: get("SNOWFLAKE_SCHEMA"),
            timeout_secs: get("SNOWFLAKE_TIMEOUT_SECS").and_then(|value| match value.parse() {
                Ok(secs) => Some(secs),
                Err(_) => {
                    log::warn!("Ignoring SNOWFLAKE_TIMEOUT_SECS={:?}, not a number", value);
                    None
                }
            }),
            host: get("SNOWFLAKE_HOST"),
        }
    }

    /// Check the required values and apply defaults for the rest
    pub fn resolve(&self) -> SnowflakeResult<ConnectionConfig> {
        let account = self
            .account
            .clone()
            .ok_or(SnowflakeError::MissingSetting("SNOWFLAKE_ACCOUNT"))?;
        let user = self
            .user
            .clone()
            .ok_or(SnowflakeError::MissingSetting("SNOWFLAKE_USER"))?;
        let password = self
            .password
            .clone()
            .ok_or(SnowflakeError::MissingSetting("SNOWFLAKE_PASSWORD"))?;
        Ok(ConnectionConfig {
            account,
            user,
            password,
            role: self.role.clone().unwrap_or_else(|| DEFAULT_ROLE.into()),
            warehouse: self
                .warehouse
                .clone()
                .unwrap_or_else(|| DEFAULT_WAREHOUSE.into()),
            database: self
                .database
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE.into()),
            schema: self.schema.clone().unwrap_or_else(|| DEFAULT_SCHEMA.into()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            host: self.host.clone(),
        })
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("timeout_secs", &self.timeout_secs)
            .field("host", &self.host)
            .finish()
    }
}

/// Everything needed to open a session, with defaults already applied
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    /// Server-side statement timeout; the HTTP client waits 15 seconds longer
    pub timeout_secs: u64,
    /// Overrides the `<account>.snowflakecomputing.com` address, e.g. for an emulator
    pub host: Option<String>,
}

impl ConnectionConfig {
    /// Base URL of the account, without a trailing slash
    pub fn host(&self) -> String {
        match &self.host {
            Some(host) => host.trim_end_matches('/').to_owned(),
            None => format!(
                "https://{}.snowflakecomputing.com",
                self.account.to_ascii_lowercase()
            ),
        }
    }

    /// The same configuration pointed at a different account identifier
    pub fn with_account(&self, account: &str) -> ConnectionConfig {
        ConnectionConfig {
            account: account.to_owned(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"********")
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("timeout_secs", &self.timeout_secs)
            .field("host", &self.host)
            .finish()
    }
}

/// Account identifier spellings worth trying when the given one is rejected
///
/// `ORG-ACCOUNT` yields itself, `ORG`, `ACCOUNT` and `ORG.ACCOUNT`.
pub fn account_candidates(account: &str) -> Vec<String> {
    let mut candidates = vec![account.to_owned()];
    if account.contains('-') {
        let mut parts = account.split('-');
        candidates.extend(parts.next().map(str::to_owned));
        // Only the segment between the first and second dash
        candidates.extend(parts.next().map(str::to_owned));
        candidates.push(account.replace('-', "."));
    }
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|candidate| !candidate.is_empty() && seen.insert(candidate.clone()));
    candidates
}
