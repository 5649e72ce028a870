//! Access to the spreadsheet that holds the balance sheet.
//!
//! The `Sheet` trait is the seam between the pipeline and Google: `GoogleSheet` talks to the
//! Sheets API, while `TestSheet` serves seeded in-memory data so that the whole program can run
//! without network access.

mod files;
mod google_sheet;
mod oauth;
mod test_sheet;

use crate::{Config, Result};
use google_sheet::GoogleSheet;
use tracing::debug;

pub(crate) use oauth::TokenProvider;
pub(crate) use test_sheet::TestSheet;
#[cfg(test)]
pub(crate) use test_sheet::TestSheetState;

/// Read-only access is all that is needed to produce a report.
pub(crate) const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets.readonly"];

/// When this environment variable is set and non-empty, `Mode::from_env` returns `Mode::Test`.
pub const TEST_MODE_ENV: &str = "BALANCE_SHEET_IN_TEST_MODE";

/// Fetches the raw cell values of a tab.
#[async_trait::async_trait]
pub(crate) trait Sheet: Send {
    /// Returns every row of `sheet_name` as displayed in the spreadsheet, starting at cell `A1`.
    async fn get(&mut self, sheet_name: &str) -> Result<Vec<Vec<String>>>;
}

/// Selects where the sheet data comes from.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Google,
    Test,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Constructs the `Sheet` implementation for `mode`.
pub(crate) async fn sheet(config: &Config, mode: Mode) -> Result<Box<dyn Sheet>> {
    debug!("Using {mode:?} sheet");
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Ok(Box::new(GoogleSheet::new(
                config.spreadsheet_id(),
                config.fetch_timeout(),
                token_provider,
            )))
        }
        Mode::Test => Ok(Box::new(TestSheet::new(config.spreadsheet_id()))),
    }
}

/// The Sheets API drops trailing empty cells from each row. Pads every row that is shorter than
/// the widest of the first two rows (the group row and the header) so that the grid is rectangular
/// again. Longer rows are left alone.
pub(crate) fn pad_rows(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = rows.iter().take(2).map(Vec::len).max().unwrap_or(0);
    for row in rows.iter_mut() {
        if row.len() < width {
            row.resize(width, String::new());
        }
    }
    rows
}
