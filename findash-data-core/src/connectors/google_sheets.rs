//! Spreadsheet connector: one authenticated session, many independently fetched sheet ranges.
//!
//! Transport goes through the [`SheetsApi`] seam. [`HttpSheetsApi`] talks to the Sheets v4
//! REST API with either an OAuth2 bearer token or an API key taken from the environment.
//!
//! Failure isolation happens per sheet: a sheet that fails to fetch is logged and left out
//! of the result, its siblings are still attempted. `fetch()` itself only fails when the
//! initial connection does.

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{optional_scalar_string, scalar_string, SourceEntry};
use crate::contract::Connector;
use crate::envelope::{Envelope, Record};
use crate::error::ConnectorError;

pub const SOURCE_TYPE: &str = "google_sheets";
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_SHEETS_ACCESS_TOKEN";
pub const API_KEY_ENV: &str = "GOOGLE_SHEETS_API_KEY";
pub const API_BASE_ENV: &str = "GOOGLE_SHEETS_API_BASE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetsSettings {
    #[serde(deserialize_with = "scalar_string")]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub sheets: Vec<SheetSpec>,
}

/// One sheet range to fetch. `name` and `range` are required at fetch time, not at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SheetSpec {
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub range: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub output_key: Option<String>,
}

impl SheetSpec {
    /// Name, range and output key, or `None` when a locator is missing or blank.
    fn locate(&self) -> Option<(&str, &str, &str)> {
        let name = self.name.as_deref().filter(|s| !s.is_empty())?;
        let range = self.range.as_deref().filter(|s| !s.is_empty())?;
        let output_key = self.output_key.as_deref().unwrap_or(name);
        Some((name, range, output_key))
    }
}

/// Rows as returned by the API, first row being the header.
pub type SheetRows = Vec<Vec<Value>>;

/// Transport for the spreadsheet connector.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Authenticates and checks that the spreadsheet exists and is accessible.
    async fn open_spreadsheet(&self, spreadsheet_id: &str) -> Result<(), ConnectorError>;

    /// Fetches the values of an A1 range such as `Revenue!A1:F100`.
    async fn get_values(&self, spreadsheet_id: &str, range: &str)
        -> Result<SheetRows, ConnectorError>;
}

#[derive(Clone)]
pub enum SheetsCredentials {
    BearerToken(String),
    ApiKey(String),
}

impl std::fmt::Debug for SheetsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetsCredentials::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
            SheetsCredentials::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

impl SheetsCredentials {
    /// Bearer token wins over API key when both are set. Blank values count as unset.
    pub fn from_env() -> Option<Self> {
        let non_blank = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        if let Some(token) = non_blank(ACCESS_TOKEN_ENV) {
            return Some(SheetsCredentials::BearerToken(token));
        }
        non_blank(API_KEY_ENV).map(SheetsCredentials::ApiKey)
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: SheetRows,
}

/// Sheets v4 REST client.
#[derive(Debug, Clone)]
pub struct HttpSheetsApi {
    client: Client,
    base_url: String,
    credentials: Option<SheetsCredentials>,
}

impl HttpSheetsApi {
    pub fn new(base_url: impl Into<String>, credentials: Option<SheetsCredentials>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            credentials,
        }
    }

    /// Reads credentials and the optional base URL override from the environment.
    /// Missing credentials only surface on `open_spreadsheet`.
    pub fn from_env() -> Self {
        let base_url = env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(base_url, SheetsCredentials::from_env())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ConnectorError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ConnectorError::Configuration(format!("invalid Sheets API base URL {}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ConnectorError::Configuration(format!(
                    "Sheets API base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized_get(&self, url: Url) -> Result<reqwest::RequestBuilder, ConnectorError> {
        let request = self.client.get(url);
        match &self.credentials {
            Some(SheetsCredentials::BearerToken(token)) => Ok(request.bearer_auth(token)),
            Some(SheetsCredentials::ApiKey(key)) => Ok(request.query(&[("key", key)])),
            None => Err(ConnectorError::Connection(format!(
                "Google Sheets credentials not found: set {ACCESS_TOKEN_ENV} or {API_KEY_ENV}"
            ))),
        }
    }
}

#[async_trait]
impl SheetsApi for HttpSheetsApi {
    async fn open_spreadsheet(&self, spreadsheet_id: &str) -> Result<(), ConnectorError> {
        let url = self.url(&["v4", "spreadsheets", spreadsheet_id])?;
        let response = self
            .authorized_get(url)?
            .query(&[("fields", "spreadsheetId")])
            .send()
            .await
            .map_err(|e| ConnectorError::Connection(format!("Google Sheets connection failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &format!("spreadsheet {spreadsheet_id}"), &body))
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<SheetRows, ConnectorError> {
        let url = self.url(&["v4", "spreadsheets", spreadsheet_id, "values", range])?;
        let response = self
            .authorized_get(url)?
            .send()
            .await
            .map_err(|e| ConnectorError::Fetch(format!("HTTP error fetching {range}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &format!("range {range}"), &body));
        }

        let range_values: ValueRange = response
            .json()
            .await
            .map_err(|e| ConnectorError::Fetch(format!("invalid response for {range}: {e}")))?;
        Ok(range_values.values)
    }
}

/// 404 is NotFound, 401/403 are Connection (credentials or sharing), anything else is Fetch.
fn status_error(status: StatusCode, target: &str, body: &str) -> ConnectorError {
    match status {
        StatusCode::NOT_FOUND => ConnectorError::NotFound(format!("{target} not found")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ConnectorError::Connection(format!("HTTP {status} for {target}: {body}"))
        }
        _ => ConnectorError::Fetch(format!("HTTP {status} for {target}: {body}")),
    }
}

pub struct GoogleSheetsConnector {
    settings: SheetsSettings,
    api: Arc<dyn SheetsApi>,
    connected: bool,
}

impl GoogleSheetsConnector {
    pub fn new(settings: SheetsSettings, api: Arc<dyn SheetsApi>) -> Self {
        Self {
            settings,
            api,
            connected: false,
        }
    }

    pub fn from_entry(entry: &SourceEntry, api: Arc<dyn SheetsApi>) -> Result<Self, ConnectorError> {
        let settings: SheetsSettings = entry.settings()?;
        if settings.spreadsheet_id.trim().is_empty() {
            return Err(ConnectorError::Configuration(format!(
                "source '{}': spreadsheet_id is required",
                entry.name
            )));
        }
        Ok(Self::new(settings, api))
    }

    pub fn settings(&self) -> &SheetsSettings {
        &self.settings
    }

    async fn fetch_sheet(&self, name: &str, range: &str, output_key: &str) -> Result<Envelope, ConnectorError> {
        let full_range = format!("{name}!{range}");
        info!(spreadsheet_id = %self.settings.spreadsheet_id, range = %full_range, "Fetching range");

        let rows = self
            .api
            .get_values(&self.settings.spreadsheet_id, &full_range)
            .await?;
        if rows.is_empty() {
            warn!(range = %full_range, "No data found");
        }
        let data = rows_to_records(rows);
        info!(sheet = name, rows = data.len(), "Fetched rows from sheet");
        Ok(Envelope::sheet(&self.settings.spreadsheet_id, name, output_key, data))
    }
}

#[async_trait]
impl Connector for GoogleSheetsConnector {
    fn source_type(&self) -> &'static str {
        SOURCE_TYPE
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    async fn connect(&mut self) -> Result<(), ConnectorError> {
        let spreadsheet_id = &self.settings.spreadsheet_id;
        if let Err(e) = self.api.open_spreadsheet(spreadsheet_id).await {
            error!(error = %e, spreadsheet_id = %spreadsheet_id, "Failed to connect to Google Sheets");
            return Err(e);
        }
        self.connected = true;
        info!(spreadsheet_id = %spreadsheet_id, "Connected to Google Sheets API");
        Ok(())
    }

    async fn fetch(&mut self) -> Result<Vec<Envelope>, ConnectorError> {
        self.ensure_connected().await?;

        let mut envelopes = Vec::new();
        for spec in &self.settings.sheets {
            let Some((name, range, output_key)) = spec.locate() else {
                warn!(sheet = ?spec, "Skipping sheet config - missing name or range");
                continue;
            };
            match self.fetch_sheet(name, range, output_key).await {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => {
                    error!(error = %e, sheet = name, "Failed to fetch sheet");
                    if let ConnectorError::Connection(_) = e {
                        error!(
                            sheet = name,
                            "Permission denied. Make sure the spreadsheet is shared with the account behind the credentials"
                        );
                    }
                }
            }
        }
        Ok(envelopes)
    }

}

/// First row is the header. Short rows are right-padded with empty strings, long rows
/// are cut to header length.
pub fn rows_to_records(rows: SheetRows) -> Vec<Record> {
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let header: Vec<String> = header.iter().map(header_name).collect();

    rows.map(|row| {
        let mut cells = row.into_iter();
        header
            .iter()
            .map(|column| {
                let value = cells.next().unwrap_or_else(|| Value::String(String::new()));
                (column.clone(), value)
            })
            .collect()
    })
    .collect()
}

fn header_name(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
