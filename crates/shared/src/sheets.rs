use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::ConfigError;
use crate::config_env::optional_trimmed_env;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TableSpec {
    pub title: &'static str,
    pub headers: &'static [&'static str],
}

/// Fixed per-table column schemas; `ensure_tables` creates any missing tab
/// and (re)writes each header row at startup.
pub const TABLES: &[TableSpec] = &[
    TableSpec {
        title: "Offers",
        headers: &[
            "created_at",
            "source_url",
            "network",
            "offer_name",
            "vertical",
            "geo",
            "payout",
            "currency",
            "allowed_sources",
            "restrictions",
            "status",
            "notes",
        ],
    },
    TableSpec {
        title: "Hypotheses",
        headers: &[
            "created_at",
            "offer_name",
            "platform",
            "audience",
            "angle",
            "content_type",
            "status",
            "priority",
            "notes",
        ],
    },
    TableSpec {
        title: "Creatives",
        headers: &[
            "created_at",
            "hypothesis_ref",
            "format",
            "hook",
            "primary_text",
            "cta",
            "landing_outline",
            "notes",
        ],
    },
    TableSpec {
        title: "Campaigns",
        headers: &[
            "created_at",
            "platform",
            "offer_name",
            "utm",
            "budget",
            "spend",
            "clicks",
            "conversions",
            "revenue",
            "roi",
            "status",
            "notes",
        ],
    },
    TableSpec {
        title: "Landings",
        headers: &["created_at", "topic", "slug", "url", "status", "notes"],
    },
    TableSpec {
        title: "UTM_Templates",
        headers: &[
            "created_at",
            "base_url",
            "utm_source",
            "utm_medium",
            "utm_campaign",
            "utm_content",
            "full_url",
            "notes",
        ],
    },
    TableSpec {
        title: "Tasks",
        headers: &["created_at", "type", "title", "payload", "status", "notes"],
    },
];

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("GOOGLE_SERVICE_ACCOUNT_JSON_B64 is not valid base64")]
    CredentialBase64,
    #[error("GOOGLE_SERVICE_ACCOUNT_JSON_B64 does not decode to valid json: {0}")]
    CredentialJson(String),
    #[error("failed to sign service account assertion: {0}")]
    Assertion(String),
    #[error("google token request failed: {0}")]
    Token(String),
    #[error("sheets request failed: {0}")]
    Transport(String),
    #[error("sheets api error status={status}: {message}")]
    Api { status: u16, message: String },
    #[error("sheets response payload was invalid: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub service_account_json_b64: String,
}

impl SheetsConfig {
    /// `Ok(None)` when the integration is disabled (neither variable set);
    /// an error when exactly one of the pair is present.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let spreadsheet_id = optional_trimmed_env("GOOGLE_SHEET_ID");
        let service_account = optional_trimmed_env("GOOGLE_SERVICE_ACCOUNT_JSON_B64");

        match (spreadsheet_id, service_account) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingVar(
                "GOOGLE_SERVICE_ACCOUNT_JSON_B64".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingVar("GOOGLE_SHEET_ID".to_string())),
            (Some(spreadsheet_id), Some(service_account_json_b64)) => Ok(Some(Self {
                spreadsheet_id,
                service_account_json_b64,
            })),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Append-only client for the spreadsheet record store.
pub struct SheetsClient {
    client: reqwest::Client,
    api_base: String,
    token_url: String,
    spreadsheet_id: String,
    key: ServiceAccountKey,
    cached_token: Mutex<Option<CachedToken>>,
}

impl SheetsClient {
    pub fn connect(config: &SheetsConfig) -> Result<Self, SheetsError> {
        let raw_key = BASE64
            .decode(config.service_account_json_b64.as_bytes())
            .map_err(|_| SheetsError::CredentialBase64)?;
        let key: ServiceAccountKey = serde_json::from_slice(&raw_key)
            .map_err(|err| SheetsError::CredentialJson(err.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|err| SheetsError::Config(ConfigError::HttpClient(err.to_string())))?;

        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            token_url: TOKEN_URL.to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            key,
            cached_token: Mutex::new(None),
        })
    }

    pub fn with_endpoints(mut self, api_base: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.token_url = token_url.into();
        self
    }

    /// Creates any missing tab, then writes every tab's header row.
    pub async fn ensure_tables(&self) -> Result<(), SheetsError> {
        let existing = self.existing_sheet_titles().await?;

        let missing: Vec<&TableSpec> = TABLES
            .iter()
            .filter(|table| !existing.iter().any(|title| title == table.title))
            .collect();

        if !missing.is_empty() {
            let requests: Vec<_> = missing
                .iter()
                .map(|table| json!({ "addSheet": { "properties": { "title": table.title } } }))
                .collect();

            let url = format!("{}/{}:batchUpdate", self.api_base, self.spreadsheet_id);
            let body = json!({ "requests": requests });
            self.send_checked(self.client.post(url).json(&body)).await?;
        }

        for table in TABLES {
            let url = format!(
                "{}/{}/values/{}!A1?valueInputOption=RAW",
                self.api_base, self.spreadsheet_id, table.title
            );
            let body = json!({ "values": [table.headers] });
            self.send_checked(self.client.put(url).json(&body)).await?;
        }

        Ok(())
    }

    /// One call, one appended row.
    pub async fn append_row(&self, table: &str, values: &[String]) -> Result<(), SheetsError> {
        let url = format!(
            "{}/{}/values/{table}!A:Z:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.api_base, self.spreadsheet_id
        );
        let body = json!({ "values": [values] });
        self.send_checked(self.client.post(url).json(&body)).await
    }

    async fn existing_sheet_titles(&self) -> Result<Vec<String>, SheetsError> {
        #[derive(Deserialize)]
        struct SpreadsheetMeta {
            #[serde(default)]
            sheets: Vec<SheetMeta>,
        }

        #[derive(Deserialize)]
        struct SheetMeta {
            properties: Option<SheetProperties>,
        }

        #[derive(Deserialize)]
        struct SheetProperties {
            title: Option<String>,
        }

        let url = format!(
            "{}/{}?fields=sheets.properties.title",
            self.api_base, self.spreadsheet_id
        );
        let payload = self.send_checked_text(self.client.get(url)).await?;
        let meta: SpreadsheetMeta = serde_json::from_str(&payload)
            .map_err(|err| SheetsError::InvalidPayload(err.to_string()))?;

        Ok(meta
            .sheets
            .into_iter()
            .filter_map(|sheet| sheet.properties.and_then(|p| p.title))
            .collect())
    }

    async fn send_checked(&self, request: reqwest::RequestBuilder) -> Result<(), SheetsError> {
        self.send_checked_text(request).await.map(|_| ())
    }

    async fn send_checked_text(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<String, SheetsError> {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| SheetsError::Transport(err.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|err| SheetsError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message: api_error_message(&payload),
            });
        }

        Ok(payload)
    }

    async fn access_token(&self) -> Result<String, SheetsError> {
        let mut cached = self.cached_token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref()
            && token.expires_at - chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now
        {
            return Ok(token.access_token.clone());
        }

        let assertion = self.signed_assertion(now)?;

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let response = self
            .client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", &assertion)])
            .send()
            .await
            .map_err(|err| SheetsError::Token(err.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|err| SheetsError::Token(err.to_string()))?;

        if !status.is_success() {
            return Err(SheetsError::Token(format!(
                "status={} message={}",
                status.as_u16(),
                api_error_message(&payload)
            )));
        }

        let token: TokenResponse = serde_json::from_str(&payload)
            .map_err(|err| SheetsError::InvalidPayload(err.to_string()))?;

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: now + chrono::Duration::seconds(token.expires_in),
        });

        Ok(access_token)
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, SheetsError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_url,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|err| SheetsError::Assertion(err.to_string()))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|err| SheetsError::Assertion(err.to_string()))
    }
}

fn api_error_message(payload: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: Option<ErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorEnvelope>(payload)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|details| details.message)
        .unwrap_or_else(|| payload.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::TABLES;

    #[test]
    fn every_table_starts_with_created_at() {
        for table in TABLES {
            assert_eq!(
                table.headers.first(),
                Some(&"created_at"),
                "table {} must lead with created_at",
                table.title
            );
        }
    }

    #[test]
    fn expected_tables_are_declared_once() {
        let titles: Vec<&str> = TABLES.iter().map(|t| t.title).collect();
        for expected in [
            "Offers",
            "Hypotheses",
            "Creatives",
            "Campaigns",
            "Landings",
            "UTM_Templates",
            "Tasks",
        ] {
            assert_eq!(
                titles.iter().filter(|t| **t == expected).count(),
                1,
                "table {expected} must appear exactly once"
            );
        }
    }
}
