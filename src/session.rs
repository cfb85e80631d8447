use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConnectionConfig;
use crate::errors::{SnowflakeError, SnowflakeResult, SnowflakeWireResult};
use crate::result::{Column, ResultSet, StringTable};

const CLIENT_APP_ID: &str = env!("CARGO_PKG_NAME");
const CLIENT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Response codes meaning "still running, ask again"
const QUERY_IN_PROGRESS: &str = "333333";
const QUERY_IN_PROGRESS_ASYNC: &str = "333334";
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// HTTP side of a connection: knows where the account lives and how to log in
#[derive(Debug, Clone)]
pub struct SnowflakeClient {
    config: ConnectionConfig,
    http: reqwest::Client,
}

impl SnowflakeClient {
    pub fn new(config: ConnectionConfig) -> SnowflakeResult<SnowflakeClient> {
        use reqwest::header::*;

        let mut headers = HeaderMap::with_capacity(3);
        headers.append(CONTENT_TYPE, "application/json".parse()?);
        headers.append(ACCEPT, "application/json".parse()?);
        headers.append(
            USER_AGENT,
            concat!(env!("CARGO_PKG_NAME"), '/', env!("CARGO_PKG_VERSION")).parse()?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs + 15))
            .build()?;
        Ok(SnowflakeClient { config, http })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Authenticate with user and password, returning a live session
    ///
    /// This is the only request made before a session exists, and it is made exactly once.
    pub async fn login(&self) -> SnowflakeResult<Session> {
        let config = &self.config;
        let body = WireLoginRequest {
            data: WireLoginData {
                client_app_id: CLIENT_APP_ID,
                client_app_version: CLIENT_APP_VERSION,
                account_name: account_name(&config.account),
                login_name: &config.user,
                password: &config.password,
                session_parameters: HashMap::from([("QUERY_RESULT_FORMAT", "JSON")]),
            },
        };
        log::debug!(
            "Logging in to {} as {} (role {}, warehouse {})",
            config.host(),
            config.user,
            config.role,
            config.warehouse
        );
        let request_id = uuid::Uuid::new_v4().to_string();
        let login = self
            .http
            .post(format!("{}/session/v1/login-request", config.host()))
            .query(&[
                ("databaseName", config.database.as_str()),
                ("schemaName", config.schema.as_str()),
                ("warehouse", config.warehouse.as_str()),
                ("roleName", config.role.as_str()),
                ("request_id", request_id.as_str()),
            ])
            .json(&body)
            .send()
            .await?
            .json::<SnowflakeWireResult>()
            .await?
            .into_login_result::<WireLoginResponse>()?;

        log::info!(
            "Connected to {} as {}",
            config.account,
            login.display_user_name.as_deref().unwrap_or(&config.user)
        );
        Ok(Session {
            host: config.host(),
            token: login.token,
            http: self.http.clone(),
            sequence: AtomicU64::new(0),
            server_version: login.server_version,
        })
    }
}

/// The login endpoint wants the bare account locator, without any region suffix
///
/// `AAA00000.us-east-1` becomes `AAA00000`.
fn account_name(account: &str) -> &str {
    account.split('.').next().unwrap_or(account)
}

/// An authenticated session
///
/// Statements run one at a time in the order they are submitted.
/// Close the session with [`Session::close`] when done; dropping it only
/// abandons the token until the service expires it.
#[derive(Debug)]
pub struct Session {
    host: String,
    token: String,
    http: reqwest::Client,
    sequence: AtomicU64,
    server_version: Option<String>,
}

impl Session {
    /// Version reported by the service at login, if it sent one
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    fn authorization(&self) -> String {
        format!("Snowflake Token=\"{}\"", self.token)
    }

    /// Execute one SQL statement and collect every row of its result
    pub async fn query(&self, sql: &str) -> SnowflakeResult<ResultSet> {
        let body = WireQueryRequest {
            sql_text: sql,
            async_exec: false,
            sequence_id: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            is_internal: false,
        };
        log::debug!("Sending statement: {}", sql);
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut data: WireQueryData = self
            .http
            .post(format!("{}/queries/v1/query-request", self.host))
            .query(&[("requestId", request_id.as_str())])
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(&body)
            .send()
            .await?
            .json::<SnowflakeWireResult>()
            .await?
            .into_query_result()?;

        while let Some(url) = data.pending_result_url() {
            log::debug!("Query {} still running", data.query_id);
            tokio::time::sleep(POLL_INTERVAL).await;
            data = self
                .http
                .get(format!("{}{}", self.host, url))
                .header(reqwest::header::AUTHORIZATION, self.authorization())
                .send()
                .await?
                .json::<SnowflakeWireResult>()
                .await?
                .into_query_result()?;
        }

        self.hydrate(data).await
    }

    /// Turn the first response into a full result, downloading any extra chunks
    async fn hydrate(&self, data: WireQueryData) -> SnowflakeResult<ResultSet> {
        if data.in_progress {
            return Err(still_running(&data.query_id));
        }
        if let Some(format) = &data.query_result_format {
            if !format.eq_ignore_ascii_case("json") {
                return Err(SnowflakeError::UnsupportedFeature(
                    "result formats other than JSON",
                ));
            }
        }
        let mut rows = data.rowset.unwrap_or_default();
        let total: usize = rows.len() + data.chunks.iter().map(|c| c.row_count).sum::<usize>();
        rows.reserve(total - rows.len());

        // Chunks are fetched one after another and appended in the order listed.
        let chunk_headers = chunk_headers(&data.chunk_headers, data.qrmk.as_deref());
        for (index, chunk) in data.chunks.iter().enumerate() {
            rows.extend(self.fetch_chunk(index, chunk, &chunk_headers).await?);
        }

        Ok(ResultSet::new(data.rowtype.unwrap_or_default(), rows))
    }

    async fn fetch_chunk(
        &self,
        index: usize,
        chunk: &WireChunk,
        headers: &[(String, String)],
    ) -> SnowflakeResult<StringTable> {
        log::debug!("Fetching result chunk {} ({} rows)", index + 1, chunk.row_count);
        let mut request = self.http.get(&chunk.url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let body = request.send().await?.error_for_status()?.text().await?;
        parse_chunk(&body)
    }

    /// Log out and invalidate the token
    pub async fn close(self) -> SnowflakeResult<()> {
        let response = self
            .http
            .post(format!("{}/session", self.host))
            .query(&[("delete", "true")])
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await?
            .json::<SnowflakeWireResult>()
            .await?;
        if !response.success {
            return Err(SnowflakeError::ServerError {
                code: response.code.unwrap_or_default(),
                message: response
                    .message
                    .unwrap_or_else(|| "failed to close session".into()),
            });
        }
        log::info!("Session closed");
        Ok(())
    }
}

/// Chunk downloads authenticate with the headers the service hands out,
/// or with the customer key when it only sends `qrmk`
fn chunk_headers(
    headers: &Option<HashMap<String, String>>,
    qrmk: Option<&str>,
) -> Vec<(String, String)> {
    match (headers, qrmk) {
        (Some(headers), _) if !headers.is_empty() => headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        (_, Some(qrmk)) => vec![
            (
                "x-amz-server-side-encryption-customer-algorithm".into(),
                "AES256".into(),
            ),
            (
                "x-amz-server-side-encryption-customer-key".into(),
                qrmk.into(),
            ),
        ],
        _ => Vec::new(),
    }
}

/// A statement the service reports as running but gives no way to wait for
fn still_running(query_id: &str) -> SnowflakeError {
    SnowflakeError::ServerError {
        code: QUERY_IN_PROGRESS.into(),
        message: format!("query {query_id} is still running and no result url was given"),
    }
}

/// Chunks are a comma separated run of JSON arrays without the enclosing brackets
fn parse_chunk(body: &str) -> SnowflakeResult<StringTable> {
    let body = body.trim().trim_end_matches(',');
    if body.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&format!("[{body}]"))?)
}

impl SnowflakeWireResult {
    /// Like [`SnowflakeWireResult::into_result`], but an in-progress answer is not a failure
    fn into_query_result(self) -> SnowflakeResult<WireQueryData> {
        let in_progress = matches!(
            self.code.as_deref(),
            Some(QUERY_IN_PROGRESS) | Some(QUERY_IN_PROGRESS_ASYNC)
        );
        if in_progress {
            let mut data: WireQueryData = match self.data {
                Some(data) => serde_json::from_value(data)?,
                None => {
                    return Err(SnowflakeError::ServerError {
                        code: self.code.unwrap_or_default(),
                        message: "query in progress without a result url".into(),
                    })
                }
            };
            if data.get_result_url.is_none() {
                return Err(still_running(&data.query_id));
            }
            data.in_progress = true;
            Ok(data)
        } else {
            self.into_result()
        }
    }
}

//
// Wire types
//

#[derive(Serialize, Debug)]
struct WireLoginRequest<'a> {
    data: WireLoginData<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct WireLoginData<'a> {
    client_app_id: &'a str,
    client_app_version: &'a str,
    account_name: &'a str,
    login_name: &'a str,
    password: &'a str,
    session_parameters: HashMap<&'a str, &'a str>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireLoginResponse {
    token: String,
    // master_token: String,
    display_user_name: Option<String>,
    server_version: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireQueryRequest<'a> {
    sql_text: &'a str,
    async_exec: bool,
    sequence_id: u64,
    is_internal: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct WireQueryData {
    #[serde(default)]
    query_id: String,
    rowtype: Option<Vec<Column>>,
    rowset: Option<StringTable>,
    query_result_format: Option<String>,
    #[serde(default)]
    chunks: Vec<WireChunk>,
    chunk_headers: Option<HashMap<String, String>>,
    qrmk: Option<String>,
    get_result_url: Option<String>,
    #[serde(skip)]
    in_progress: bool,
}

impl WireQueryData {
    fn pending_result_url(&self) -> Option<&str> {
        if self.in_progress {
            self.get_result_url.as_deref()
        } else {
            None
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireChunk {
    url: String,
    row_count: usize,
    // uncompressed_size: usize,
}
