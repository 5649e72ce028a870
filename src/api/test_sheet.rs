//! Implements the very simple `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.

use crate::api::{pad_rows, Sheet};
use crate::Result;
use anyhow::Context;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Mutex, OnceLock};

/// The tabs of one spreadsheet, keyed by tab name.
pub(crate) type TestSheetState = HashMap<String, Vec<Vec<String>>>;

/// State shared by every `TestSheet` with the same spreadsheet id, so that a test can seed data
/// that the command under test will later read.
static STATES: OnceLock<Mutex<HashMap<String, TestSheetState>>> = OnceLock::new();

fn states() -> &'static Mutex<HashMap<String, TestSheetState>> {
    STATES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// An implementation of the `Sheet` trait that does not use Google sheets. Unless other data has
/// been stored for its spreadsheet id, it is seeded with a small balance sheet in `Sheet1`.
pub(crate) struct TestSheet {
    spreadsheet_id: String,
}

impl TestSheet {
    pub(crate) fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// Returns a copy of the data this sheet serves.
    #[cfg(test)]
    pub(crate) fn get_state(&self) -> TestSheetState {
        let stored = match states().lock() {
            Ok(map) => map.get(&self.spreadsheet_id).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&self.spreadsheet_id).cloned(),
        };
        stored.unwrap_or_else(default_data)
    }

    /// Replaces the data this sheet serves.
    #[cfg(test)]
    pub(crate) fn set_state(&self, state: TestSheetState) {
        let mut map = match states().lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.insert(self.spreadsheet_id.clone(), state);
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn get(&mut self, sheet_name: &str) -> Result<Vec<Vec<String>>> {
        let stored = {
            let map = states()
                .lock()
                .map_err(|_| anyhow::anyhow!("The test sheet state is poisoned"))?;
            map.get(&self.spreadsheet_id).cloned()
        };
        let state = stored.unwrap_or_else(default_data);
        let rows = state
            .get(sheet_name)
            .with_context(|| format!("Sheet '{sheet_name}' not found"))?
            .clone();
        Ok(pad_rows(rows))
    }
}

/// Provides the seed data from this module.
fn default_data() -> TestSheetState {
    let mut map = HashMap::new();
    if let Ok(rows) = load_csv(BALANCE_SHEET_DATA) {
        map.insert(BALANCE_SHEET.to_string(), rows);
    }
    map
}

/// Loads data from a CSV-formatted string.
pub(crate) fn load_csv(csv_data: &str) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result.context("Unable to parse CSV seed data")?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// The tab holding the seed data.
pub(crate) const BALANCE_SHEET: &str = "Sheet1";

/// Seed balance sheet. The first row groups columns, the second is the header, and the last row
/// is an in-progress month without a date.
const BALANCE_SHEET_DATA: &str = r##"Balances,,,,,,
Date,Checking,Savings,Brokerage,Credit Card,Total,Notes
01/31/2024,"$4,210.55","$12,000.00","$31,250.10",-$812.40,"$46,648.25",
02/29/2024,"$3,980.12","$12,400.00","$32,102.77",-$640.18,"$47,842.71",bonus deposited
03/31/2024,"$4,502.90","$12,800.00","$31,877.03","-$1,120.55","$48,059.38",
04/30/2024,"$4,120.00","$13,200.00","$33,015.64",-$455.00,"$49,880.64",
05/31/2024,"$3,760.33","$13,600.00","$34,210.87",-$702.91,"$50,868.29",car repair
06/30/2024,"$4,890.41","$14,000.00","$33,644.20",-$388.12,"$52,146.49",
07/31/2024,"$5,102.76","$14,400.00","$35,120.45",-$915.30,"$53,707.91",
08/31/2024,"$4,655.18","$14,800.00","$36,002.91",-$530.77,"$54,927.32",
,"$4,900.00","$15,200.00","$36,400.00",,,
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{shape, PipelineConfig};

    #[tokio::test]
    async fn test_seed_data_shapes() {
        let mut sheet = TestSheet::new("test_seed_data_shapes");
        let grid = sheet.get(BALANCE_SHEET).await.unwrap();
        assert_eq!(11, grid.len());
        assert!(grid.iter().all(|row| row.len() == 7));

        let config = PipelineConfig::default().with_liability_columns(["Credit Card"]);
        let shaped = shape(&grid, &config).unwrap();
        assert_eq!(9, shaped.data_rows());
        assert_eq!(8, shaped.table().len());
        assert_eq!(1, shaped.provisional_rows());
        assert!(shaped.skipped().is_empty());
        for row in shaped.table().rows() {
            let accounts: f64 = ["Checking", "Savings", "Brokerage", "Credit Card"]
                .iter()
                .map(|name| row.amount(name).unwrap())
                .sum();
            let total = row.amount("Total").unwrap();
            assert!((accounts - total).abs() < 0.005, "{}", row.date());
        }
        assert_eq!(
            vec!["Checking", "Savings", "Brokerage"],
            shaped.breakdown().categories()
        );
    }

    #[tokio::test]
    async fn test_missing_tab() {
        let mut sheet = TestSheet::new("test_missing_tab");
        let err = sheet.get("Nope").await.unwrap_err();
        assert!(err.to_string().contains("'Nope' not found"));
    }

    #[tokio::test]
    async fn test_set_state_is_shared() {
        let writer = TestSheet::new("test_set_state_is_shared");
        let mut state = TestSheetState::new();
        state.insert(
            "Other".to_string(),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]],
        );
        writer.set_state(state);

        let mut reader = TestSheet::new("test_set_state_is_shared");
        let rows = reader.get("Other").await.unwrap();
        assert_eq!(vec!["c".to_string(), String::new()], rows[1]);
        assert!(reader.get(BALANCE_SHEET).await.is_err());
        assert!(writer.get_state().contains_key("Other"));
    }
}
