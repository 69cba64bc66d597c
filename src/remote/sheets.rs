//! Google Sheets v4 client.
//!
//! Uses the values API: one metadata request to find the last tab, one
//! `values.get` to read it and one `values.update` to overwrite it. The access
//! token is supplied by the caller; obtaining it is outside this module.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::table::Row;

use super::{RemoteDocument, RemoteStore, RemoteTab};

/// Default Sheets API base URL.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

const USER_AGENT: &str = concat!("tabsync/", env!("CARGO_PKG_VERSION"));

static URL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("valid spreadsheet url regex")
});

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{10,}$").expect("valid spreadsheet id regex"));

/// Extract the spreadsheet id from a full URL or accept a bare id.
pub fn parse_locator(locator: &str) -> Result<String> {
    let locator = locator.trim();
    if let Some(captures) = URL_ID.captures(locator) {
        return Ok(captures[1].to_string());
    }
    if BARE_ID.is_match(locator) {
        return Ok(locator.to_string());
    }
    Err(SyncError::InvalidLocator(locator.to_string()))
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Row],
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Sheets API client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    base_url: String,
    token: String,
    http: reqwest::blocking::Client,
}

impl SheetsClient {
    pub fn new(base_url: Option<&str>, token: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SyncError::Config(format!("HTTP client error: {e}")))?;
        Ok(Self {
            base_url: base_url
                .unwrap_or(SHEETS_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            token: token.to_string(),
            http,
        })
    }

    fn spreadsheet_url(&self, id: &str) -> String {
        format!("{}/spreadsheets/{id}", self.base_url)
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::blocking::Response> {
        let response = self
            .http
            .get(with_query(url, query)?)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| SyncError::Http(format!("GET {url}: {e}")))?;
        check_status(response)
    }

    fn put_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &T,
    ) -> Result<reqwest::blocking::Response> {
        let response = self
            .http
            .put(with_query(url, query)?)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .map_err(|e| SyncError::Http(format!("PUT {url}: {e}")))?;
        check_status(response)
    }
}

fn with_query(url: &str, query: &[(&str, &str)]) -> Result<reqwest::Url> {
    reqwest::Url::parse_with_params(url, query)
        .map_err(|e| SyncError::Http(format!("invalid URL {url}: {e}")))
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(SyncError::RateLimited(message));
    }
    Err(SyncError::Remote {
        status: status.as_u16(),
        message,
    })
}

/// A1 range covering a whole tab.
fn tab_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

impl RemoteStore for SheetsClient {
    type Document = SheetsDocument;

    fn open(&self, locator: &str) -> Result<SheetsDocument> {
        let id = parse_locator(locator)?;
        let response = self.get(
            &self.spreadsheet_url(&id),
            &[("fields", "sheets.properties(title,index)")],
        )?;
        let meta: SpreadsheetMeta = response
            .json()
            .map_err(|e| SyncError::Http(format!("parse spreadsheet metadata: {e}")))?;
        debug!(spreadsheet = %id, tabs = meta.sheets.len(), "Opened spreadsheet");
        Ok(SheetsDocument {
            client: self.clone(),
            id,
            tabs: meta.sheets.into_iter().map(|s| s.properties).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SheetsDocument {
    client: SheetsClient,
    id: String,
    tabs: Vec<SheetProperties>,
}

impl RemoteDocument for SheetsDocument {
    type Tab = SheetsTab;

    fn last_tab(&self) -> Result<SheetsTab> {
        let last = self
            .tabs
            .iter()
            .max_by_key(|t| t.index)
            .ok_or_else(|| SyncError::Remote {
                status: 404,
                message: format!("spreadsheet {} has no tabs", self.id),
            })?;
        Ok(SheetsTab {
            client: self.client.clone(),
            spreadsheet_id: self.id.clone(),
            title: last.title.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SheetsTab {
    client: SheetsClient,
    spreadsheet_id: String,
    title: String,
}

impl SheetsTab {
    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.client.spreadsheet_url(&self.spreadsheet_id),
            urlencoding::encode(range)
        )
    }
}

impl RemoteTab for SheetsTab {
    fn title(&self) -> &str {
        &self.title
    }

    fn read_all(&self) -> Result<Vec<Vec<String>>> {
        let range = tab_range(&self.title);
        let response = self.client.get(
            &self.values_url(&range),
            &[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "FORMATTED_VALUE"),
            ],
        )?;
        let values: ValueRange = response
            .json()
            .map_err(|e| SyncError::Http(format!("parse values for {}: {e}", self.title)))?;
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(value_text).collect())
            .collect())
    }

    fn write(&self, grid: &[Row]) -> Result<()> {
        let range = format!("{}!A1", tab_range(&self.title));
        let body = ValueUpdate {
            range: &range,
            major_dimension: "ROWS",
            values: grid,
        };
        self.client.put_json(
            &self.values_url(&range),
            &[("valueInputOption", "USER_ENTERED")],
            &body,
        )?;
        debug!(tab = %self.title, rows = grid.len(), "Wrote values");
        Ok(())
    }
}

fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(true) => "TRUE".to_string(),
        serde_json::Value::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}
