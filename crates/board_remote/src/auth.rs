use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::rest::{map_reqwest_error, status_error, RemoteSettings, API_KEY_HEADER};
use crate::types::{ErrorKind, RemoteError};

/// A signed-in backend session. The token is attached as the bearer
/// credential on every subsequent call; how it was minted is the backend's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
}

/// Exchanges email and password for a session via the backend's token
/// endpoint.
pub async fn sign_in(
    settings: &RemoteSettings,
    email: &str,
    password: &str,
) -> Result<Session, RemoteError> {
    let mut url = settings.endpoint(&["auth", "v1", "token"])?;
    url.query_pairs_mut().append_pair("grant_type", "password");

    let body = serde_json::to_vec(&PasswordGrant { email, password })
        .map_err(|err| RemoteError::new(ErrorKind::Decode, err.to_string()))?;
    let client = reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| RemoteError::new(ErrorKind::Network, err.to_string()))?;

    let response = client
        .post(url)
        .header(API_KEY_HEADER, &settings.api_key)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(map_reqwest_error)?;

    let status = response.status();
    if status.is_client_error() {
        return Err(RemoteError::new(ErrorKind::AuthRejected, status.to_string()));
    }
    if !status.is_success() {
        return Err(status_error(status));
    }
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    let token: TokenResponse = serde_json::from_slice(&bytes)
        .map_err(|err| RemoteError::new(ErrorKind::Decode, err.to_string()))?;

    Ok(Session {
        access_token: token.access_token,
        user_id: token.user.id,
        expires_at: Utc::now() + Duration::seconds(token.expires_in),
    })
}

/// Blocking wrapper for shell startup, before any runtime exists.
pub fn sign_in_blocking(
    settings: &RemoteSettings,
    email: &str,
    password: &str,
) -> Result<Session, RemoteError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|err| RemoteError::new(ErrorKind::Network, err.to_string()))?;
    runtime.block_on(sign_in(settings, email, password))
}
