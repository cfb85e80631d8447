use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::errors::SnowflakeResult;
use crate::result::ResultSet;
use crate::session::{Session, SnowflakeClient};

/// Anything that can run SQL text and hand back rows
///
/// [`Session`] is the real implementation; tests plug in canned responses.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn execute(&self, sql: &str) -> SnowflakeResult<ResultSet>;

    /// End the session. Consumes the handle so it cannot be used afterwards.
    async fn close(self) -> SnowflakeResult<()>
    where
        Self: Sized;
}

/// Opens sessions from a resolved configuration
#[async_trait]
pub trait Backend: Send + Sync {
    type Session: Warehouse;

    async fn open(&self, config: &ConnectionConfig) -> SnowflakeResult<Self::Session>;
}

#[async_trait]
impl Warehouse for Session {
    async fn execute(&self, sql: &str) -> SnowflakeResult<ResultSet> {
        self.query(sql).await
    }

    async fn close(self) -> SnowflakeResult<()> {
        Session::close(self).await
    }
}

/// Password login against a real account (or anything speaking its protocol)
#[derive(Debug, Default, Clone, Copy)]
pub struct SnowflakeBackend;

#[async_trait]
impl Backend for SnowflakeBackend {
    type Session = Session;

    async fn open(&self, config: &ConnectionConfig) -> SnowflakeResult<Session> {
        SnowflakeClient::new(config.clone())?.login().await
    }
}

#[cfg(test)]
pub(crate) mod stub {
    //! In-memory stand-ins for the service

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::cells::RawCell;
    use crate::errors::SnowflakeError;
    use crate::result::Column;

    /// Answers statements from a script, in order, and records what it was sent
    #[derive(Default)]
    pub struct StubWarehouse {
        answers: Mutex<VecDeque<SnowflakeResult<ResultSet>>>,
        sent: Mutex<Vec<String>>,
        pub closed: Arc<AtomicUsize>,
    }

    impl StubWarehouse {
        pub fn new() -> StubWarehouse {
            StubWarehouse::default()
        }

        pub fn returns(self, result: ResultSet) -> StubWarehouse {
            self.answers.lock().unwrap().push_back(Ok(result));
            self
        }

        pub fn fails(self, message: &str) -> StubWarehouse {
            self.answers
                .lock()
                .unwrap()
                .push_back(Err(SnowflakeError::ServerError {
                    code: "000604".into(),
                    message: message.into(),
                }));
            self
        }

        pub fn executed(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Warehouse for StubWarehouse {
        async fn execute(&self, sql: &str) -> SnowflakeResult<ResultSet> {
            self.sent.lock().unwrap().push(sql.to_owned());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ResultSet::empty()))
        }

        async fn close(self) -> SnowflakeResult<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Counts login attempts and accepts only the listed accounts
    #[derive(Default)]
    pub struct StubBackend {
        pub accepted_accounts: Vec<String>,
        attempts: Mutex<Vec<ConnectionConfig>>,
    }

    impl StubBackend {
        pub fn accepting(accounts: &[&str]) -> StubBackend {
            StubBackend {
                accepted_accounts: accounts.iter().map(|a| a.to_string()).collect(),
                attempts: Mutex::new(Vec::new()),
            }
        }

        pub fn attempts(&self) -> Vec<ConnectionConfig> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Backend for StubBackend {
        type Session = StubWarehouse;

        async fn open(&self, config: &ConnectionConfig) -> SnowflakeResult<StubWarehouse> {
            self.attempts.lock().unwrap().push(config.clone());
            if self.accepted_accounts.contains(&config.account) {
                Ok(StubWarehouse::new())
            } else {
                Err(SnowflakeError::LoginFailed {
                    code: "390100".into(),
                    message: format!("Incorrect account {}", config.account),
                })
            }
        }
    }

    /// One-column result with the given raw values
    pub fn single_column(name: &str, data_type: RawCell, values: &[&str]) -> ResultSet {
        ResultSet::new(
            vec![Column::new(name, data_type)],
            values.iter().map(|v| vec![Some(v.to_string())]).collect(),
        )
    }
}
