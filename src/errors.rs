use serde::{de::DeserializeOwned, Deserialize};

#[derive(thiserror::Error, Debug)]
pub enum SnowflakeError {
    #[error("Missing required setting {0}. Please check your environment or .env file.")]
    MissingSetting(&'static str),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("Snowflake server error: {code}: {message}")]
    ServerError { code: String, message: String },
    #[error("Snowflake login failed: {code}: {message}")]
    LoginFailed { code: String, message: String },
    #[error(transparent)]
    JSONError(#[from] serde_json::Error),
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(&'static str),
    #[error(transparent)]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid playbook: {0}")]
    Playbook(String),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub type SnowflakeResult<T> = Result<T, SnowflakeError>;

/// Coarse classification used when reporting a failure to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Connection,
    Statement,
}

impl SnowflakeError {
    pub fn kind(&self) -> ErrorKind {
        use SnowflakeError::*;
        match self {
            MissingSetting(_) | InvalidHeaderValue(_) | Io(_) | Yaml(_) | Playbook(_)
            | Regex(_) => ErrorKind::Configuration,
            Request(_) | LoginFailed { .. } => ErrorKind::Connection,
            ServerError { .. } | JSONError(_) | UnsupportedFeature(_) => ErrorKind::Statement,
        }
    }
}

/// The envelope every `/session` and `/queries` endpoint answers with
///
/// `data` stays untyped until `success` is known, because failed
/// responses carry a different payload than successful ones.
#[derive(Deserialize, Debug)]
pub struct SnowflakeWireResult {
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub success: bool,
    pub code: Option<String>,
    pub message: Option<String>,
}

impl SnowflakeWireResult {
    /// Convert from the custom wire format to a standard result
    pub fn into_result<T: DeserializeOwned>(self) -> SnowflakeResult<T> {
        if !self.success {
            return Err(SnowflakeError::ServerError {
                code: self.code.unwrap_or_default(),
                message: self.message.unwrap_or_else(|| "unknown error".into()),
            });
        }
        match self.data {
            Some(data) => Ok(serde_json::from_value(data)?),
            None => Err(SnowflakeError::ServerError {
                code: self.code.unwrap_or_default(),
                message: "response did not contain any data".into(),
            }),
        }
    }

    /// Like [`SnowflakeWireResult::into_result`] but reports a login failure
    pub fn into_login_result<T: DeserializeOwned>(self) -> SnowflakeResult<T> {
        self.into_result().map_err(|e| match e {
            SnowflakeError::ServerError { code, message } => {
                SnowflakeError::LoginFailed { code, message }
            }
            other => other,
        })
    }
}
