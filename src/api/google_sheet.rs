//! Implements the `Sheet` trait using the `sheets::Client` to read a Google sheet.

use crate::api::{pad_rows, Sheet, TokenProvider};
use crate::Result;
use anyhow::Context;
use sheets::types::{DateTimeRenderOption, Dimension, ValueRenderOption};
use sheets::ClientError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

/// Implements the `Sheet` trait using the `sheets::Client`. It takes a `TokenProvider`, which
/// refreshes the access token before each request when needed.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    timeout: Duration,
    token_provider: TokenProvider,
}

impl GoogleSheet {
    pub(super) fn new(
        spreadsheet_id: impl Into<String>,
        timeout: Duration,
        token_provider: TokenProvider,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            timeout,
            token_provider,
        }
    }

    /// Creates a new sheets client with a fresh access token.
    async fn client(&mut self) -> Result<sheets::Client> {
        let access_token = self.token_provider.token_with_refresh().await?;

        // The sheets crate wants OAuth client details too, but only the access token is used for
        // API calls. Refresh is handled by `TokenProvider`.
        Ok(sheets::Client::new(
            String::new(),
            String::new(),
            String::new(),
            access_token.to_string(),
            String::new(),
        ))
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn get(&mut self, sheet_name: &str) -> Result<Vec<Vec<String>>> {
        trace!("get for {sheet_name}");
        let client = self.client().await?;
        let spreadsheets = client.spreadsheets();
        let range = a1_range(sheet_name);
        let request = spreadsheets.values_get(
            &self.spreadsheet_id,
            &range,
            DateTimeRenderOption::FormattedString,
            Dimension::Rows,
            ValueRenderOption::FormattedValue,
        );
        let response = fetch_with_timeout(self.timeout, sheet_name, request).await?;
        let rows = response.body.values;
        debug!("Fetched {} rows from {sheet_name}", rows.len());
        Ok(pad_rows(rows))
    }
}

/// Awaits a sheets request, giving up after `timeout`.
async fn fetch_with_timeout<T>(
    timeout: Duration,
    sheet_name: &str,
    request: impl Future<Output = std::result::Result<T, ClientError>>,
) -> Result<T> {
    tokio::time::timeout(timeout, request)
        .await
        .with_context(|| {
            format!(
                "Timed out after {}s fetching the {sheet_name} sheet",
                timeout.as_secs()
            )
        })?
        .map_err(map_client_error)
        .with_context(|| format!("Failed to fetch {sheet_name} sheet data"))
}

/// Every column of the tab. Tab names are quoted so that names with spaces work.
fn a1_range(sheet_name: &str) -> String {
    format!("'{}'!A:ZZ", sheet_name.replace('\'', "''"))
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a1_range() {
        assert_eq!("'Sheet1'!A:ZZ", a1_range("Sheet1"));
        assert_eq!("'Net Worth'!A:ZZ", a1_range("Net Worth"));
        assert_eq!("'Bob''s'!A:ZZ", a1_range("Bob's"));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let request = std::future::pending::<std::result::Result<(), ClientError>>();
        let err = fetch_with_timeout(Duration::from_millis(10), "Sheet1", request)
            .await
            .unwrap_err();
        assert_eq!("Timed out after 0s fetching the Sheet1 sheet", err.to_string());
    }

    #[tokio::test]
    async fn test_fetch_maps_client_errors() {
        let request = async { Err::<(), _>(ClientError::EmptyRefreshToken) };
        let err = fetch_with_timeout(Duration::from_secs(5), "Sheet1", request)
            .await
            .unwrap_err();
        assert_eq!("Failed to fetch Sheet1 sheet data", err.to_string());
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert_eq!("EmptyRefreshToken", chain[1]);
    }

    #[tokio::test]
    async fn test_fetch_returns_response() {
        let request = async { Ok::<_, ClientError>(vec!["Date".to_string()]) };
        let rows = fetch_with_timeout(Duration::from_secs(5), "Sheet1", request)
            .await
            .unwrap();
        assert_eq!(vec!["Date".to_string()], rows);
    }
}
