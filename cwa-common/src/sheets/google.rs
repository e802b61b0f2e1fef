//! Google Sheets REST v4 backend
//!
//! Requests carry an OAuth2 bearer token. With a service-account key the token
//! is minted by `gcp_auth` and refreshed before it expires; a fixed access
//! token is accepted for short local runs. All writes use `valueInputOption=RAW` so annotated text is never parsed as
//! a formula.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    display_value, quote_title, RowValues, SheetError, SheetResult, Spreadsheet, Worksheet,
};

const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const USER_AGENT: &str = concat!("cwa-annotate/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// OAuth2 scope for reading and writing spreadsheets
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Where bearer tokens come from
#[derive(Clone)]
pub enum GoogleAuth {
    /// Service-account credentials; a cached token is reused until it nears expiry
    ServiceAccount(Arc<dyn TokenProvider>),
    /// Fixed token; Google expires these after about an hour
    AccessToken(String),
}

impl GoogleAuth {
    /// Load a service-account JSON key file
    pub fn service_account_key(path: &Path) -> SheetResult<Self> {
        let account = CustomServiceAccount::from_file(path).map_err(|e| {
            SheetError::Auth(format!("service account key {}: {}", path.display(), e))
        })?;
        Ok(GoogleAuth::ServiceAccount(Arc::new(account)))
    }

    /// Token for the next request
    async fn bearer_token(&self) -> SheetResult<String> {
        match self {
            GoogleAuth::AccessToken(token) => Ok(token.clone()),
            GoogleAuth::ServiceAccount(provider) => provider
                .token(&[SPREADSHEETS_SCOPE])
                .await
                .map(|token| token.as_str().to_string())
                .map_err(|e| SheetError::Auth(e.to_string())),
        }
    }
}

impl fmt::Debug for GoogleAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoogleAuth::ServiceAccount(_) => f.write_str("ServiceAccount(..)"),
            GoogleAuth::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

/// Connection settings for [`GoogleSheetsClient`]
#[derive(Debug, Clone)]
pub struct GoogleSheetsConfig {
    /// API root, e.g. `https://sheets.googleapis.com/v4`
    pub api_base_url: String,
    pub auth: GoogleAuth,
    /// Per-request timeout
    pub timeout: Duration,
}

impl GoogleSheetsConfig {
    pub fn new(auth: GoogleAuth) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddSheetReply {
    add_sheet: SheetEntry,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Spreadsheet backed by one Google Sheets document
pub struct GoogleSheetsClient {
    http_client: reqwest::Client,
    base_url: Url,
    auth: GoogleAuth,
    spreadsheet_id: String,
}

impl GoogleSheetsClient {
    /// Open the spreadsheet with the given document id
    ///
    /// No request is made here; an invalid id or credential surfaces on first use.
    pub fn open(spreadsheet_id: &str, config: GoogleSheetsConfig) -> SheetResult<Self> {
        if spreadsheet_id.trim().is_empty() {
            return Err(SheetError::Config("spreadsheet id is empty".to_string()));
        }
        if let GoogleAuth::AccessToken(token) = &config.auth {
            if token.trim().is_empty() {
                return Err(SheetError::Config("access token is empty".to_string()));
            }
        }

        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| SheetError::Config(format!("invalid API base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SheetError::Config(format!(
                "API base URL cannot be a base: {}",
                config.api_base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| SheetError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            auth: config.auth,
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    /// Build `<base>/spreadsheets/<id><suffix>/<segments...>` with each segment percent-encoded
    fn endpoint(&self, suffix: &str, segments: &[&str]) -> SheetResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SheetError::Config("API base URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            path.push("spreadsheets");
            path.push(&format!("{}{}", self.spreadsheet_id, suffix));
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> SheetResult<reqwest::Response> {
        tracing::debug!(method = %method, url = %url, "Sheets API request");

        let token = self.auth.bearer_token().await?;
        let mut request = self
            .http_client
            .request(method, url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SheetError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SheetError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn batch_update(&self, requests: Value) -> SheetResult<BatchUpdateResponse> {
        let url = self.endpoint(":batchUpdate", &[])?;
        self.send(Method::POST, url, &[], Some(json!({ "requests": requests })))
            .await?
            .json()
            .await
            .map_err(|e| SheetError::Parse(e.to_string()))
    }

    async fn get_values(&self, range: &str, major_dimension: &str) -> SheetResult<Vec<Vec<String>>> {
        let url = self.endpoint("", &["values", range])?;
        let body: ValueRange = self
            .send(Method::GET, url, &[("majorDimension", major_dimension)], None)
            .await?
            .json()
            .await
            .map_err(|e| SheetError::Parse(e.to_string()))?;

        Ok(body
            .values
            .iter()
            .map(|row| row.iter().map(display_value).collect())
            .collect())
    }
}

/// Convert a 1-based column index into its A1 letters (1 → A, 27 → AA)
pub(crate) fn column_letters(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[async_trait]
impl Spreadsheet for GoogleSheetsClient {
    async fn worksheet(&self, title: &str) -> SheetResult<Worksheet> {
        let url = self.endpoint("", &[])?;
        let metadata: SpreadsheetMetadata = self
            .send(
                Method::GET,
                url,
                &[("fields", "sheets.properties(sheetId,title)")],
                None,
            )
            .await?
            .json()
            .await
            .map_err(|e| SheetError::Parse(e.to_string()))?;

        metadata
            .sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == title)
            .map(|sheet| Worksheet {
                title: sheet.properties.title,
                sheet_id: sheet.properties.sheet_id,
            })
            .ok_or_else(|| SheetError::WorksheetNotFound(title.to_string()))
    }

    async fn add_worksheet(&self, title: &str, rows: u32, cols: u32) -> SheetResult<Worksheet> {
        let response = self
            .batch_update(json!([{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": cols }
                    }
                }
            }]))
            .await?;

        let reply = response
            .replies
            .into_iter()
            .next()
            .ok_or_else(|| SheetError::Parse("addSheet returned no reply".to_string()))?;
        let reply: AddSheetReply =
            serde_json::from_value(reply).map_err(|e| SheetError::Parse(e.to_string()))?;

        tracing::info!(title = %title, sheet_id = reply.add_sheet.properties.sheet_id, "Created worksheet");

        Ok(Worksheet {
            title: reply.add_sheet.properties.title,
            sheet_id: reply.add_sheet.properties.sheet_id,
        })
    }

    async fn col_values(&self, worksheet: &Worksheet, column: u32) -> SheetResult<Vec<String>> {
        if column == 0 {
            return Err(SheetError::Parse("column index is 1-based".to_string()));
        }
        let letters = column_letters(column);
        let range = format!("{}!{}:{}", quote_title(&worksheet.title), letters, letters);
        let mut columns = self.get_values(&range, "COLUMNS").await?;
        Ok(if columns.is_empty() {
            Vec::new()
        } else {
            columns.swap_remove(0)
        })
    }

    async fn get_all_values(&self, worksheet: &Worksheet) -> SheetResult<Vec<Vec<String>>> {
        self.get_values(&quote_title(&worksheet.title), "ROWS").await
    }

    async fn insert_row(
        &self,
        worksheet: &Worksheet,
        values: RowValues,
        index: u32,
    ) -> SheetResult<()> {
        if index == 0 {
            return Err(SheetError::Parse("row index is 1-based".to_string()));
        }

        self.batch_update(json!([{
            "insertDimension": {
                "range": {
                    "sheetId": worksheet.sheet_id,
                    "dimension": "ROWS",
                    "startIndex": index - 1,
                    "endIndex": index
                },
                "inheritFromBefore": false
            }
        }]))
        .await?;

        let range = format!("{}!A{}", quote_title(&worksheet.title), index);
        let url = self.endpoint("", &["values", &range])?;
        self.send(
            Method::PUT,
            url,
            &[("valueInputOption", "RAW")],
            Some(json!({ "values": [values] })),
        )
        .await?;
        Ok(())
    }

    async fn append_rows(&self, worksheet: &Worksheet, rows: Vec<RowValues>) -> SheetResult<()> {
        let count = rows.len();
        let range = format!("{}!A1:append", quote_title(&worksheet.title));
        let url = self.endpoint("", &["values", &range])?;
        self.send(
            Method::POST,
            url,
            &[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")],
            Some(json!({ "values": rows })),
        )
        .await?;

        tracing::debug!(title = %worksheet.title, rows = count, "Appended rows");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_token(token: &str) -> GoogleAuth {
        GoogleAuth::AccessToken(token.to_string())
    }

    fn client(base: &str) -> GoogleSheetsClient {
        let mut config = GoogleSheetsConfig::new(static_token("token"));
        config.api_base_url = base.to_string();
        GoogleSheetsClient::open("doc123", config).unwrap()
    }

    #[test]
    fn test_open_rejects_empty_id_and_token() {
        assert!(matches!(
            GoogleSheetsClient::open(" ", GoogleSheetsConfig::new(static_token("token"))),
            Err(SheetError::Config(_))
        ));
        assert!(matches!(
            GoogleSheetsClient::open("doc", GoogleSheetsConfig::new(static_token(""))),
            Err(SheetError::Config(_))
        ));
    }

    #[test]
    fn test_missing_service_account_key_is_auth_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = GoogleAuth::service_account_key(&dir.path().join("key.json"));
        assert!(matches!(result, Err(SheetError::Auth(msg)) if msg.contains("key.json")));
    }

    #[test]
    fn test_malformed_service_account_key_is_auth_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(&path, r#"{"type": "service_account"}"#).unwrap();
        assert!(matches!(
            GoogleAuth::service_account_key(&path),
            Err(SheetError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_static_token_is_sent_as_is() {
        assert_eq!(static_token("abc").bearer_token().await.unwrap(), "abc");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = GoogleSheetsConfig::new(static_token("secret-token"));
        assert!(!format!("{:?}", config).contains("secret-token"));
    }

    #[test]
    fn test_endpoint_metadata_and_batch_update() {
        let client = client("https://sheets.googleapis.com/v4");
        assert_eq!(
            client.endpoint("", &[]).unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/doc123"
        );
        assert_eq!(
            client.endpoint(":batchUpdate", &[]).unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/doc123:batchUpdate"
        );
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash_and_encodes_ranges() {
        let client = client("http://localhost:8080/v4/");
        let url = client
            .endpoint("", &["values", "'my sheet'!A1:append"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v4/spreadsheets/doc123/values/'my%20sheet'!A1:append"
        );
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(3), "C");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
    }

    #[test]
    fn test_metadata_deserializes_sheet_list() {
        let metadata: SpreadsheetMetadata = serde_json::from_str(
            r#"{"sheets":[{"properties":{"sheetId":0,"title":"allowed_users_Checkworthiness"}},
                          {"properties":{"sheetId":917,"title":"anna"}}]}"#,
        )
        .unwrap();
        assert_eq!(metadata.sheets.len(), 2);
        assert_eq!(metadata.sheets[1].properties.sheet_id, 917);
        assert_eq!(metadata.sheets[1].properties.title, "anna");
    }

    #[test]
    fn test_value_range_without_values_is_empty() {
        let range: ValueRange =
            serde_json::from_str(r#"{"range":"'anna'!A1:Z1000","majorDimension":"ROWS"}"#).unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn test_add_sheet_reply_deserializes() {
        let reply: AddSheetReply = serde_json::from_value(json!({
            "addSheet": {"properties": {"sheetId": 42, "title": "bo", "index": 3}}
        }))
        .unwrap();
        assert_eq!(reply.add_sheet.properties.sheet_id, 42);
    }
}
