//! Google Sheets Datastore
//!
//! Thin client over the Sheets v4 values API plus the storefront-facing
//! store built on top of it (catalog reads, order rows, stock updates,
//! contact upserts, store profile). The spreadsheet is the system of
//! record; this process never caches rows beyond a single query.

mod store;

pub use store::SheetsStore;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const OAUTH_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Refresh the cached token this long before its actual expiry.
const TOKEN_EXPIRY_SLACK: i64 = 60;
/// Lifetime requested for the signed assertion.
const ASSERTION_LIFETIME: i64 = 3600;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("sheets request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service account auth failed: {0}")]
    Auth(String),

    #[error("sheets API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected sheets payload: {0}")]
    Malformed(String),
}

/// The fields of a Google service-account key file this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let key = serde_json::from_str(&raw)?;
        Ok(key)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Authenticated client for one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    spreadsheet_id: String,
    key: ServiceAccountKey,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: String, key: ServiceAccountKey) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            spreadsheet_id,
            key,
            base_url: SHEETS_API_BASE.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Point at a different API root (test servers).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Current access token, minting a fresh one via the signed-JWT grant
    /// when the cache is empty or close to expiry.
    async fn access_token(&self) -> Result<String, SheetsError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at - ChronoDuration::seconds(TOKEN_EXPIRY_SLACK) > Utc::now()
        {
            return Ok(token.value.clone());
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: OAUTH_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME,
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| SheetsError::Auth(format!("invalid private key: {e}")))?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| SheetsError::Auth(format!("failed to sign assertion: {e}")))?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!(
                "token endpoint returned {status}: {message}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SheetsError::Auth(format!("bad token response: {e}")))?;

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in),
        });
        Ok(value)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.base_url,
            self.spreadsheet_id,
            urlencoding::encode(range),
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(SheetsError::Api { status: status.as_u16(), message })
    }

    /// Read a range as rows of cell strings. Empty ranges come back as an
    /// empty vec (the API omits `values` entirely).
    pub async fn values_get(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.values_url(range))
            .bearer_auth(token)
            .send()
            .await?;
        let body: ValueRange = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Malformed(e.to_string()))?;
        Ok(body.values)
    }

    /// Append rows after the last row of the range's table.
    pub async fn values_append(
        &self,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsError> {
        let token = self.access_token().await?;
        let url = format!("{}:append?valueInputOption=USER_ENTERED", self.values_url(range));
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "values": rows }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Overwrite the cells of a range.
    pub async fn values_update(
        &self,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsError> {
        let token = self.access_token().await?;
        let url = format!("{}?valueInputOption=USER_ENTERED", self.values_url(range));
        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "values": rows }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
