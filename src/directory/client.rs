//! HTTP-backed directory client for the club CRM.
//!
//! Executes one contact query per identifier against the CRM's REST query
//! endpoint, with automatic pagination. Logging never includes query
//! contents or the access token; credentials wrap the token in a
//! [`SecretString`] so it cannot leak through `Debug`.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::directory::{DirectoryLookup, DirectoryRecord};
use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// User agent string for all directory requests.
const CLIENT_USER_AGENT: &str = "Turnstile/0.1.0";

/// Request timeout in seconds. Lookups are small; anything slower than this
/// is a stuck connection.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default CRM REST API version.
const DEFAULT_API_VERSION: &str = "v57.0";

/// Contact fields fetched for every lookup.
const CONTACT_FIELDS: &str =
    "Id, Name, Account.Name, marketing_allowed__c, Phone, Email, Birthdate";

// ─────────────────────────────────────────────────────────────────────────────
// Internal Wire Types (match the CRM JSON exactly)
// ─────────────────────────────────────────────────────────────────────────────

/// Mirrors the CRM query response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQueryResponse {
    /// Total matches across all pages; unused, the pagination loop follows
    /// `done`/`next_records_url` instead.
    #[allow(dead_code)]
    total_size: u64,
    /// Whether this is the last page of results.
    done: bool,
    /// Relative URL of the next page, present when `done` is false.
    next_records_url: Option<String>,
    records: Vec<WireContact>,
}

#[derive(Debug, Deserialize)]
struct WireContact {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Account")]
    account: Option<WireAccount>,
    #[serde(rename = "marketing_allowed__c")]
    marketing_allowed: Option<bool>,
    #[serde(rename = "Phone")]
    phone: Option<String>,
    #[serde(rename = "Email")]
    email: Option<String>,
    #[serde(rename = "Birthdate")]
    birthdate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    #[serde(rename = "Name")]
    name: Option<String>,
}

/// The CRM returns errors as an array of error objects.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDirectoryError {
    message: String,
    error_code: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// DirectoryCredentials
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials for the CRM instance.
///
/// The access token is wrapped in a [`SecretString`] to prevent accidental
/// exposure through `Debug` or logging. Obtaining the token is the caller's
/// concern.
#[derive(Clone)]
pub struct DirectoryCredentials {
    /// Instance base URL (e.g. `https://club.example.com`).
    pub instance_url: String,
    /// Bearer token for the query endpoint.
    pub access_token: SecretString,
    /// REST API version (e.g. `v57.0`).
    pub api_version: String,
}

impl DirectoryCredentials {
    pub fn new(instance_url: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            instance_url: instance_url.into(),
            access_token,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl std::fmt::Debug for DirectoryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryCredentials")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DirectoryClient
// ─────────────────────────────────────────────────────────────────────────────

/// Reqwest-backed [`DirectoryLookup`] implementation.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    creds: DirectoryCredentials,
}

impl DirectoryClient {
    /// Creates a client with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client fails to initialize.
    pub fn new(creds: DirectoryCredentials) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, creds })
    }

    /// The per-identifier contact query.
    fn contact_query(identifier: i64) -> String {
        format!(
            "SELECT {} FROM Contact WHERE HJBC_ID__c = '{}'",
            CONTACT_FIELDS, identifier
        )
    }

    /// Joins a path against the instance URL.
    fn instance_url(&self, path: &str) -> Result<Url, AppError> {
        let base = Url::parse(&self.creds.instance_url)
            .map_err(|_| AppError::Internal("Invalid instance URL".to_string()))?;
        base.join(path)
            .map_err(|_| AppError::Internal(format!("Invalid path: {}", path)))
    }

    /// Builds the initial query URL with the SOQL properly encoded.
    fn query_url(&self, soql: &str) -> Result<Url, AppError> {
        let path = format!("/services/data/{}/query", self.creds.api_version);
        let mut url = self.instance_url(&path)?;
        url.query_pairs_mut().append_pair("q", soql);
        Ok(url)
    }

    /// Fetches all contact records for one identifier, following pagination.
    async fn lookup_contacts(&self, identifier: i64) -> Result<Vec<DirectoryRecord>, AppError> {
        let soql = Self::contact_query(identifier);
        let mut next_url = Some(self.query_url(&soql)?);
        let mut records = Vec::new();
        let mut page_count = 0u32;

        while let Some(url) = next_url.take() {
            page_count += 1;
            let page = self.fetch_page(url).await?;

            records.extend(
                page.records
                    .into_iter()
                    .map(|wire| into_record(identifier, wire)),
            );

            if page.done {
                break;
            }
            if let Some(relative) = page.next_records_url {
                next_url = Some(self.instance_url(&relative)?);
            }
        }

        info!(
            "[DIR] Lookup complete: {} record(s), {} page(s)",
            records.len(),
            page_count
        );
        Ok(records)
    }

    /// Executes one page request with timing and error mapping.
    ///
    /// The URL query string carries the SOQL, so only the path is logged.
    async fn fetch_page(&self, url: Url) -> Result<WireQueryResponse, AppError> {
        let start = Instant::now();
        let path = url.path().to_string();

        let result = self
            .http
            .get(url)
            .bearer_auth(self.creds.access_token.expose_secret())
            .send()
            .await;
        let duration_ms = start.elapsed().as_millis();

        let response = match result {
            Ok(response) => response,
            Err(_) => {
                warn!("[DIR] GET {} FAILED {}ms", path, duration_ms);
                return Err(AppError::ConnectionFailed(
                    "Connection to directory failed".to_string(),
                ));
            }
        };

        let status = response.status();
        info!("[DIR] GET {} {} {}ms", path, status.as_u16(), duration_ms);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("Unable to read error body"));

            if let Ok(errors) = serde_json::from_str::<Vec<WireDirectoryError>>(&body) {
                if let Some(first) = errors.first() {
                    return Err(AppError::DirectoryError(format!(
                        "[{}] {}",
                        first.error_code, first.message
                    )));
                }
            }
            return Err(AppError::DirectoryError(format!(
                "HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::DirectoryError(format!("Failed to parse response: {}", e)))
    }
}

/// Converts a wire contact to a [`DirectoryRecord`], tagging it with the
/// identifier it was looked up by.
fn into_record(identifier: i64, wire: WireContact) -> DirectoryRecord {
    DirectoryRecord {
        identifier,
        name: wire.name.unwrap_or_else(|| "N/A".to_string()),
        account: wire.account.and_then(|a| a.name),
        consent: wire.marketing_allowed,
        phone: wire.phone,
        email: wire.email,
        birthdate: wire
            .birthdate
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
    }
}

impl DirectoryLookup for DirectoryClient {
    fn lookup<'a>(
        &'a self,
        identifier: i64,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<DirectoryRecord>, AppError>> + Send + 'a>,
    > {
        Box::pin(self.lookup_contacts(identifier))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(instance_url: &str) -> DirectoryClient {
        DirectoryClient::new(DirectoryCredentials::new(
            instance_url,
            SecretString::from("test_token".to_string()),
        ))
        .unwrap()
    }

    fn contact_json(name: &str, consent: Option<bool>) -> serde_json::Value {
        serde_json::json!({
            "Id": "003xx000001",
            "Name": name,
            "Account": { "Name": "Hapoel Community" },
            "marketing_allowed__c": consent,
            "Phone": "050-0000000",
            "Email": "fan@example.com",
            "Birthdate": "1990-06-01"
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Record mapping
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn maps_contact_fields_onto_directory_record() {
        let server = MockServer::start().await;
        let client = test_client(&server.uri());

        let body = serde_json::json!({
            "totalSize": 1,
            "done": true,
            "records": [contact_json("Dana Levi", Some(true))]
        });

        Mock::given(method("GET"))
            .and(path("/services/data/v57.0/query"))
            .and(query_param(
                "q",
                DirectoryClient::contact_query(4821).as_str(),
            ))
            .and(bearer_token("test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let records = client.lookup(4821).await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.identifier, 4821);
        assert_eq!(record.name, "Dana Levi");
        assert_eq!(record.account.as_deref(), Some("Hapoel Community"));
        assert_eq!(record.consent, Some(true));
        assert_eq!(
            record.birthdate,
            NaiveDate::from_ymd_opt(1990, 6, 1)
        );
    }

    #[tokio::test]
    async fn null_consent_and_account_stay_absent() {
        let server = MockServer::start().await;
        let client = test_client(&server.uri());

        let body = serde_json::json!({
            "totalSize": 1,
            "done": true,
            "records": [{
                "Name": "Avi Cohen",
                "Account": null,
                "marketing_allowed__c": null,
                "Phone": null,
                "Email": null,
                "Birthdate": null
            }]
        });

        Mock::given(method("GET"))
            .and(path("/services/data/v57.0/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let records = client.lookup(7).await.unwrap();
        let record = &records[0];
        assert_eq!(record.account, None);
        assert_eq!(record.consent, None);
        assert_eq!(record.birthdate, None);
    }

    #[tokio::test]
    async fn unparseable_birthdate_becomes_none() {
        let server = MockServer::start().await;
        let client = test_client(&server.uri());

        let body = serde_json::json!({
            "totalSize": 1,
            "done": true,
            "records": [{ "Name": "X", "Birthdate": "06/01/1990?" }]
        });

        Mock::given(method("GET"))
            .and(path("/services/data/v57.0/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let records = client.lookup(7).await.unwrap();
        assert_eq!(records[0].birthdate, None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pagination
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn follows_next_records_url_until_done() {
        let server = MockServer::start().await;
        let client = test_client(&server.uri());

        let page1 = serde_json::json!({
            "totalSize": 2,
            "done": false,
            "nextRecordsUrl": "/services/data/v57.0/query/01gxx-2000",
            "records": [contact_json("First", Some(true))]
        });
        let page2 = serde_json::json!({
            "totalSize": 2,
            "done": true,
            "records": [contact_json("Second", Some(false))]
        });

        Mock::given(method("GET"))
            .and(path("/services/data/v57.0/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&page1))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/data/v57.0/query/01gxx-2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&page2))
            .expect(1)
            .mount(&server)
            .await;

        let records = client.lookup(1).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "First");
        assert_eq!(records[1].name, "Second");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Error mapping
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn crm_error_array_maps_to_directory_error() {
        let server = MockServer::start().await;
        let client = test_client(&server.uri());

        let body = serde_json::json!([{
            "message": "No such column 'HJBC_ID__c'",
            "errorCode": "INVALID_FIELD"
        }]);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&body))
            .mount(&server)
            .await;

        let err = client.lookup(1).await.unwrap_err();
        match &err {
            AppError::DirectoryError(msg) => {
                assert!(msg.contains("INVALID_FIELD"), "got: {}", msg);
                assert!(msg.contains("No such column"), "got: {}", msg);
            }
            other => panic!("Expected DirectoryError, got {:?}", other),
        }
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn non_json_http_error_keeps_status_code() {
        let server = MockServer::start().await;
        let client = test_client(&server.uri());

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let err = client.lookup(1).await.unwrap_err();
        match err {
            AppError::DirectoryError(msg) => assert!(msg.contains("500"), "got: {}", msg),
            other => panic!("Expected DirectoryError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_a_connection_failure() {
        // Port 1 on loopback; nothing listens there.
        let client = test_client("http://127.0.0.1:1");

        let err = client.lookup(1).await.unwrap_err();
        assert!(
            matches!(err, AppError::ConnectionFailed(_)),
            "got {:?}",
            err
        );
        assert!(!err.is_fatal());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Credentials
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn credentials_debug_redacts_token() {
        let creds = DirectoryCredentials::new(
            "https://club.example.com",
            SecretString::from("super_secret_token".to_string()),
        );
        let debug_output = format!("{:?}", creds);
        assert!(!debug_output.contains("super_secret_token"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("club.example.com"));
    }

    #[test]
    fn contact_query_embeds_identifier() {
        let soql = DirectoryClient::contact_query(4821);
        assert!(soql.contains("'4821'"));
        assert!(soql.contains("marketing_allowed__c"));
        assert!(soql.contains("FROM Contact"));
    }
}
