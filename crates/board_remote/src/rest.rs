use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::types::{ErrorKind, RemoteError};

pub(crate) const API_KEY_HEADER: &str = "apikey";

const ENV_BACKEND_URL: &str = "STUDIOBOARD_BACKEND_URL";
const ENV_API_KEY: &str = "STUDIOBOARD_API_KEY";

#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub base_url: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl RemoteSettings {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Reads the backend endpoint and project key from the environment.
    pub fn from_env() -> Result<Self, RemoteError> {
        let base_url = std::env::var(ENV_BACKEND_URL).map_err(|_| {
            RemoteError::new(ErrorKind::MissingConfig, format!("{ENV_BACKEND_URL} not set"))
        })?;
        let api_key = std::env::var(ENV_API_KEY).map_err(|_| {
            RemoteError::new(ErrorKind::MissingConfig, format!("{ENV_API_KEY} not set"))
        })?;
        Ok(Self::new(base_url, api_key))
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, RemoteError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|err| RemoteError::new(ErrorKind::InvalidUrl, err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::new(ErrorKind::InvalidUrl, "base url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Ordering directive for a row fetch, rendered into the `order` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Ascending,
    Descending,
}

/// Declarative shape of one table read: equality filter, ordering, page cap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowQuery {
    pub filter: Option<(String, String)>,
    pub order: Option<(String, SortDir)>,
    pub limit: Option<usize>,
}

impl RowQuery {
    pub fn ordered(column: impl Into<String>, dir: SortDir) -> Self {
        Self {
            order: Some((column.into(), dir)),
            ..Self::default()
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = Some((column.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The backend's observable CRUD contract, one method per operation shape.
#[async_trait::async_trait]
pub trait Api: Send + Sync {
    async fn fetch_rows(
        &self,
        table: &str,
        query: &RowQuery,
    ) -> Result<Vec<serde_json::Value>, RemoteError>;

    async fn update_row(
        &self,
        table: &str,
        record_id: &str,
        delta: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError>;

    async fn insert_row(
        &self,
        table: &str,
        row: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError>;
}

#[derive(Debug, Clone)]
pub struct RestApi {
    settings: RemoteSettings,
    bearer: Option<String>,
    client: reqwest::Client,
}

impl RestApi {
    pub fn new(settings: RemoteSettings) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|err| RemoteError::new(ErrorKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            bearer: None,
            client,
        })
    }

    /// Attaches a signed-in session; its token replaces the project key as
    /// the bearer credential.
    pub fn with_session(mut self, access_token: impl Into<String>) -> Self {
        self.bearer = Some(access_token.into());
        self
    }

    fn table_url(&self, table: &str, query: &RowQuery) -> Result<reqwest::Url, RemoteError> {
        let mut url = self.settings.endpoint(&["rest", "v1", table])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some((column, value)) = &query.filter {
                pairs.append_pair(column, &format!("eq.{value}"));
            }
            if let Some((column, dir)) = &query.order {
                let dir = match dir {
                    SortDir::Ascending => "asc",
                    SortDir::Descending => "desc",
                };
                pairs.append_pair("order", &format!("{column}.{dir}"));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.bearer.as_deref().unwrap_or(&self.settings.api_key);
        request
            .header(API_KEY_HEADER, &self.settings.api_key)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    fn json_body(
        &self,
        request: reqwest::RequestBuilder,
        body: &serde_json::Value,
    ) -> Result<reqwest::RequestBuilder, RemoteError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|err| RemoteError::new(ErrorKind::Decode, err.to_string()))?;
        Ok(request
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .body(bytes))
    }
}

#[async_trait::async_trait]
impl Api for RestApi {
    async fn fetch_rows(
        &self,
        table: &str,
        query: &RowQuery,
    ) -> Result<Vec<serde_json::Value>, RemoteError> {
        let url = self.table_url(table, query)?;
        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_rows(response).await
    }

    async fn update_row(
        &self,
        table: &str,
        record_id: &str,
        delta: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        let mut url = self.table_url(table, &RowQuery::default())?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{record_id}"));
        let request = self.json_body(self.authed(self.client.patch(url)), &delta)?;
        let response = request.send().await.map_err(map_reqwest_error)?;
        let mut rows = read_rows(response).await?;
        if rows.is_empty() {
            // PostgREST reports an update matching nothing as an empty
            // representation, not as an error status.
            return Err(RemoteError::new(
                ErrorKind::NotFound,
                format!("{table} row {record_id} matched no rows"),
            ));
        }
        Ok(rows.remove(0))
    }

    async fn insert_row(
        &self,
        table: &str,
        row: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        let url = self.table_url(table, &RowQuery::default())?;
        let request = self.json_body(self.authed(self.client.post(url)), &row)?;
        let response = request.send().await.map_err(map_reqwest_error)?;
        let mut rows = read_rows(response).await?;
        if rows.is_empty() {
            return Err(RemoteError::new(
                ErrorKind::Decode,
                format!("{table} insert returned no representation"),
            ));
        }
        Ok(rows.remove(0))
    }
}

async fn read_rows(response: reqwest::Response) -> Result<Vec<serde_json::Value>, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status));
    }
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|err| RemoteError::new(ErrorKind::Decode, err.to_string()))?;
    match value {
        serde_json::Value::Array(rows) => Ok(rows),
        // Singular representations come back as a bare object.
        object @ serde_json::Value::Object(_) => Ok(vec![object]),
        other => Err(RemoteError::new(
            ErrorKind::Decode,
            format!("expected rows, got {other}"),
        )),
    }
}

pub(crate) fn status_error(status: reqwest::StatusCode) -> RemoteError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return RemoteError::new(ErrorKind::AuthRejected, status.to_string());
    }
    RemoteError::new(ErrorKind::HttpStatus(status.as_u16()), status.to_string())
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        return RemoteError::new(ErrorKind::Timeout, err.to_string());
    }
    RemoteError::new(ErrorKind::Network, err.to_string())
}
