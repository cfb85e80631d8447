//! Opening sessions from environment-derived settings.
//!
//! Both entry points swallow failures: the cause is logged and the caller
//! gets `None`, so a missing password or a rejected login never aborts the
//! process by itself.

use crate::config::{account_candidates, ConnectionSettings};
use crate::warehouse::Backend;

/// Open one session, or `None` if the settings are incomplete or the login fails
///
/// Incomplete settings are rejected before `backend` is touched.
pub async fn connect<B: Backend>(backend: &B, settings: &ConnectionSettings) -> Option<B::Session> {
    let config = match settings.resolve() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Error connecting to Snowflake: {}", e);
            return None;
        }
    };
    match backend.open(&config).await {
        Ok(session) => {
            log::info!("Successfully connected to Snowflake!");
            Some(session)
        }
        Err(e) => {
            log::error!("Error connecting to Snowflake: {}", e);
            None
        }
    }
}

/// Try each spelling of the account identifier until one logs in
///
/// Returns the session together with the account form that worked.
pub async fn connect_with_fallback<B: Backend>(
    backend: &B,
    settings: &ConnectionSettings,
) -> Option<(B::Session, String)> {
    let config = match settings.resolve() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Error connecting to Snowflake: {}", e);
            return None;
        }
    };
    for account in account_candidates(&config.account) {
        log::info!("Trying account format: {}", account);
        match backend.open(&config.with_account(&account)).await {
            Ok(session) => {
                log::info!("Connected with account format: {}", account);
                return Some((session, account));
            }
            Err(e) => log::warn!("Failed with {}: {}", account, e),
        }
    }
    log::error!("All connection attempts failed. Please check your credentials.");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_DATABASE, DEFAULT_SCHEMA};
    use crate::warehouse::stub::StubBackend;

    fn settings(account: Option<&str>, user: Option<&str>, password: Option<&str>) -> ConnectionSettings {
        ConnectionSettings {
            account: account.map(String::from),
            user: user.map(String::from),
            password: password.map(String::from),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_required_settings_never_reach_the_network() {
        let backend = StubBackend::accepting(&["ACCT"]);
        let incomplete = [
            settings(None, Some("u"), Some("p")),
            settings(Some("ACCT"), None, Some("p")),
            settings(Some("ACCT"), Some("u"), None),
            settings(None, None, None),
        ];
        for settings in &incomplete {
            assert!(connect(&backend, settings).await.is_none());
            assert!(connect_with_fallback(&backend, settings).await.is_none());
        }
        assert!(backend.attempts().is_empty());
    }

    #[tokio::test]
    async fn complete_settings_log_in_exactly_once_with_defaults() {
        let backend = StubBackend::accepting(&["ACCT"]);
        let session = connect(&backend, &settings(Some("ACCT"), Some("u"), Some("p"))).await;
        assert!(session.is_some());

        let attempts = backend.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].role, "ACCOUNTADMIN");
        assert_eq!(attempts[0].warehouse, "COMPUTE_WH");
        assert_eq!(attempts[0].database, DEFAULT_DATABASE);
        assert_eq!(attempts[0].schema, DEFAULT_SCHEMA);
    }

    #[tokio::test]
    async fn rejected_login_returns_none() {
        let backend = StubBackend::accepting(&[]);
        let session = connect(&backend, &settings(Some("ACCT"), Some("u"), Some("p"))).await;
        assert!(session.is_none());
        assert_eq!(backend.attempts().len(), 1);
    }

    #[tokio::test]
    async fn fallback_walks_account_spellings_in_order() {
        let backend = StubBackend::accepting(&["RNB123"]);
        let (_, account) =
            connect_with_fallback(&backend, &settings(Some("CFZ-RNB123"), Some("u"), Some("p")))
                .await
                .unwrap();
        assert_eq!(account, "RNB123");
        let tried: Vec<_> = backend.attempts().into_iter().map(|c| c.account).collect();
        assert_eq!(tried, vec!["CFZ-RNB123", "CFZ", "RNB123"]);
    }

    #[tokio::test]
    async fn fallback_gives_up_after_every_spelling() {
        let backend = StubBackend::accepting(&[]);
        let result =
            connect_with_fallback(&backend, &settings(Some("CFZ-RNB123"), Some("u"), Some("p"))).await;
        assert!(result.is_none());
        assert_eq!(backend.attempts().len(), 4);
    }
}
