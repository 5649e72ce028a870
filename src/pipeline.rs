//! The shaping pipeline: raw grid in, typed tables out.
//!
//! ```text
//! grid ─► header extraction ─► row filtering ─► cell parsing ─► derived series ─► long reshape
//! ```
//!
//! Header and empty-input problems are fatal. Problems with a single row (wrong cell count, bad
//! date, bad currency cell) drop that row, are logged, and are returned in `Shaped::skipped`.

use crate::error::ShapeError;
use crate::model::{
    extract, is_provisional, AssetBreakdownLongTable, BalanceSheetRow, BalanceSheetTable,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use tracing::{debug, info, trace, warn};

const DEFAULT_DATE_COLUMN: &str = "Date";
const DEFAULT_FREE_TEXT_COLUMN: &str = "Notes";
const DEFAULT_TOTAL_COLUMN: &str = "Total";
const DEFAULT_ROLLING_WINDOW: usize = 6;

/// Names the columns of the sheet and sizes the trailing mean.
///
/// Example (as it appears in `config.json`):
/// ```json
/// {
///   "date_column": "Date",
///   "free_text_columns": ["Notes"],
///   "total_column": "Total",
///   "liability_columns": ["Student Loans", "Credit Cards"],
///   "rolling_window_size": 6
/// }
/// ```
/// Every field is optional and falls back to the values shown, except `liability_columns` which
/// defaults to empty. A `rolling_window_size` of zero is rejected.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    date_column: String,
    free_text_columns: BTreeSet<String>,
    total_column: String,
    liability_columns: BTreeSet<String>,
    rolling_window_size: NonZeroUsize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            free_text_columns: BTreeSet::from([DEFAULT_FREE_TEXT_COLUMN.to_string()]),
            total_column: DEFAULT_TOTAL_COLUMN.to_string(),
            liability_columns: BTreeSet::new(),
            rolling_window_size: NonZeroUsize::new(DEFAULT_ROLLING_WINDOW)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl PipelineConfig {
    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = name.into();
        self
    }

    pub fn with_free_text_columns<S, I>(mut self, names: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.free_text_columns = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_total_column(mut self, name: impl Into<String>) -> Self {
        self.total_column = name.into();
        self
    }

    pub fn with_liability_columns<S, I>(mut self, names: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.liability_columns = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rolling_window_size(mut self, size: NonZeroUsize) -> Self {
        self.rolling_window_size = size;
        self
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn total_column(&self) -> &str {
        &self.total_column
    }

    pub fn free_text_columns(&self) -> &BTreeSet<String> {
        &self.free_text_columns
    }

    pub fn liability_columns(&self) -> &BTreeSet<String> {
        &self.liability_columns
    }

    pub fn rolling_window_size(&self) -> NonZeroUsize {
        self.rolling_window_size
    }

    pub fn is_free_text(&self, column: &str) -> bool {
        self.free_text_columns.contains(column)
    }

    pub fn is_liability(&self, column: &str) -> bool {
        self.liability_columns.contains(column)
    }
}

/// The result of a successful shaping run.
#[derive(Debug, Clone, PartialEq)]
pub struct Shaped {
    table: BalanceSheetTable,
    breakdown: AssetBreakdownLongTable,
    data_rows: usize,
    provisional_rows: usize,
    skipped: Vec<ShapeError>,
}

impl Shaped {
    pub fn table(&self) -> &BalanceSheetTable {
        &self.table
    }

    pub fn breakdown(&self) -> &AssetBreakdownLongTable {
        &self.breakdown
    }

    /// Number of candidate data rows in the grid (everything after the header row).
    pub fn data_rows(&self) -> usize {
        self.data_rows
    }

    /// Rows dropped because their date cell was blank.
    pub fn provisional_rows(&self) -> usize {
        self.provisional_rows
    }

    /// Rows dropped because of a row-level error, in grid order.
    pub fn skipped(&self) -> &[ShapeError] {
        &self.skipped
    }

    /// Count of skipped rows per error kind.
    pub fn skipped_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.skipped {
            *counts.entry(e.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// Shapes the raw grid fetched from the sheet.
///
/// `grid` is row-major; row 0 holds column group labels, row 1 the header and the rest the data
/// rows, oldest first. Input order is preserved.
///
/// # Errors
/// - `ShapeError::EmptyInput` if there is no data row after the header.
/// - `ShapeError::MalformedHeader` if the header has blank or duplicate names or lacks the
///   configured date or total column.
pub fn shape<R, S>(grid: &[R], config: &PipelineConfig) -> Result<Shaped, ShapeError>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let (header, data) = extract(grid, config)?;
    debug!("Header has {} columns", header.len());
    for (ix, name, kind) in header.columns() {
        trace!("Column {ix} '{name}' is {kind}");
    }

    let mut rows = Vec::with_capacity(data.len());
    let mut provisional_rows = 0;
    let mut skipped = Vec::new();

    for (offset, cells) in data.iter().enumerate() {
        // Index into the raw grid, which includes the label and header rows.
        let row_ix = offset + 2;
        let cells = cells.as_ref();
        if is_provisional(&header, cells) {
            debug!("Dropping row {row_ix} which has no date");
            provisional_rows += 1;
            continue;
        }
        match BalanceSheetRow::parse(&header, row_ix, cells) {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!("Skipping row: {e}");
                skipped.push(e);
            }
        }
    }

    let table = BalanceSheetTable::new(header, rows, config.rolling_window_size());
    let breakdown = AssetBreakdownLongTable::new(&table, config);

    info!(
        "Shaped {} of {} data rows ({} provisional, {} skipped)",
        table.len(),
        data.len(),
        provisional_rows,
        skipped.len()
    );

    Ok(Shaped {
        table,
        breakdown,
        data_rows: data.len(),
        provisional_rows,
        skipped,
    })
}
