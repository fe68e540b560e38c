//! Google Sheets REST client.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::worksheet::{quote_title, RangeUpdate, Worksheet};
use crate::error::Error;

const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Store values exactly as sent
const RAW: &str = "RAW";
/// Parse values as if typed into the UI
const USER_ENTERED: &str = "USER_ENTERED";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// One worksheet of a spreadsheet, accessed with a bearer token
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    endpoint: String,
    spreadsheet_id: String,
    title: String,
    token: String,
}

impl SheetsClient {
    /// Create a new client for one worksheet
    pub fn new(spreadsheet_id: &str, title: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("territorio/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: SHEETS_ENDPOINT.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            title: title.to_string(),
            token: token.to_string(),
        })
    }

    /// Point the client at another API root (proxies, emulators)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{endpoint}/{spreadsheet_id}/{segments...}`, each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).context("Invalid Sheets endpoint")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Sheets endpoint cannot be a base URL"))?
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.url(&["values", range])?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Sheets read request failed")?;

        let body = check(response).await?.text().await.map_err(Error::from)?;
        Ok(parse_values(&body)?)
    }

    async fn send_batch(&self, updates: &[RangeUpdate], value_input: &str) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let url = self.url(&["values:batchUpdate"])?;
        debug!("Sending {} range updates ({})", updates.len(), value_input);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&batch_body(updates, value_input))
            .send()
            .await
            .context("Sheets batch update failed")?;

        check(response).await?;
        Ok(())
    }
}

/// Map a non-2xx response to [`Error::Sheets`]
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(sheets_error(status, &body).into())
}

fn sheets_error(status: StatusCode, body: &str) -> Error {
    Error::Sheets {
        status: status.as_u16(),
        body: body.trim().to_string(),
    }
}

/// Rows of a `ValueRange` response; a range with no data has no `values` key
fn parse_values(body: &str) -> crate::error::Result<Vec<Vec<String>>> {
    let range: ValueRange = serde_json::from_str(body)?;
    Ok(range.values)
}

/// First cell of each row, empty rows kept in place
fn first_cells(rows: Vec<Vec<String>>) -> Vec<String> {
    rows.into_iter()
        .map(|r| r.into_iter().next().unwrap_or_default())
        .collect()
}

fn batch_body(updates: &[RangeUpdate], value_input: &str) -> Value {
    json!({
        "valueInputOption": value_input,
        "data": updates,
    })
}

#[async_trait]
impl Worksheet for SheetsClient {
    fn title(&self) -> &str {
        &self.title
    }

    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        self.get_values(&quote_title(&self.title)).await
    }

    async fn read_column(&self, column: &str) -> Result<Vec<String>> {
        let range = format!("{}!{}:{}", quote_title(&self.title), column, column);
        let rows = self.get_values(&range).await?;
        Ok(first_cells(rows))
    }

    async fn batch_update(&self, updates: &[RangeUpdate]) -> Result<()> {
        self.send_batch(updates, RAW).await
    }

    async fn batch_update_entered(&self, updates: &[RangeUpdate]) -> Result<()> {
        self.send_batch(updates, USER_ENTERED).await
    }

    async fn append_row(&self, values: &[String]) -> Result<()> {
        let range = format!("{}!A1:append", quote_title(&self.title));
        let mut url = self.url(&["values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", RAW)
            .append_pair("insertDataOption", "INSERT_ROWS");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": [values] }))
            .send()
            .await
            .context("Sheets append failed")?;

        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_ranges() {
        let client = SheetsClient::new("abc123", "Hoja 1", "t").unwrap();
        let url = client
            .url(&["values", &format!("{}!A:A", quote_title("Hoja 1"))])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/'Hoja%201'!A:A"
        );
    }

    #[test]
    fn test_custom_endpoint() {
        let client = SheetsClient::new("id", "Datos", "t")
            .unwrap()
            .with_endpoint("http://localhost:8080/v4/spreadsheets/");
        let url = client.url(&["values:batchUpdate"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v4/spreadsheets/id/values:batchUpdate"
        );
        assert_eq!(client.title(), "Datos");
    }

    #[test]
    fn test_error_status_maps_to_sheets_error() {
        let err = sheets_error(
            StatusCode::FORBIDDEN,
            "{\"error\": {\"message\": \"The caller does not have permission\"}}\n",
        );
        match &err {
            Error::Sheets { status, body } => {
                assert_eq!(*status, 403);
                assert!(body.ends_with('}'));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("status 403"));
        assert!(err.to_string().contains("does not have permission"));
    }

    #[test]
    fn test_parse_values() {
        let body = r#"{"range": "'Datos'!A1:B3", "majorDimension": "ROWS",
            "values": [["Fecha", "Nombre"], [], ["05-03-2024"]]}"#;
        let rows = parse_values(body).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_empty());

        // Empty ranges omit `values`
        assert!(parse_values(r#"{"range": "'Datos'!Z1:Z9"}"#).unwrap().is_empty());
        assert!(matches!(parse_values("<html>"), Err(Error::Json(_))));
    }

    #[test]
    fn test_column_keeps_empty_rows_in_place() {
        let rows = vec![
            vec!["Fecha".to_string()],
            vec![],
            vec!["06-03-2024".to_string()],
        ];
        assert_eq!(first_cells(rows), vec!["Fecha", "", "06-03-2024"]);
    }

    #[test]
    fn test_batch_body_value_input() {
        let updates = vec![RangeUpdate {
            range: "'Datos'!E2:G2".to_string(),
            values: vec![vec!["Pan".into(), "Producto".into(), "1500".into()]],
        }];

        let raw = batch_body(&updates, RAW);
        assert_eq!(raw["valueInputOption"], "RAW");
        assert_eq!(raw["data"][0]["range"], "'Datos'!E2:G2");
        assert_eq!(raw["data"][0]["values"][0][2], "1500");

        let entered = batch_body(&updates, USER_ENTERED);
        assert_eq!(entered["valueInputOption"], "USER_ENTERED");
    }
}
