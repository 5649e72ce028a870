//! Writes report files into the plots directory and prunes old copies.
//!
//! Every file is named `{YYYY-MM-DD}-{name}`. Running a report twice on the same day overwrites
//! that day's files; after each write only the newest `output_copies` files of that name are kept.

use crate::model::{AssetBreakdownLongTable, BalanceSheetTable, ColumnKind, Series};
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the CSV export of the shaped table.
pub const BALANCE_SHEET_CSV: &str = "balance-sheet.csv";

/// File name of the CSV export of the long-format asset breakdown.
pub const ASSET_BREAKDOWN_CSV: &str = "asset-breakdown.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Writes dated output files and rotates old ones.
///
/// The `Output` struct is immutable and owns copies of the paths and settings it needs.
#[derive(Debug, Clone)]
pub struct Output {
    dir: PathBuf,
    copies: u32,
    date: NaiveDate,
}

impl Output {
    /// Writes into the configured plots directory, dating files with `date`.
    pub fn new(config: &Config, date: NaiveDate) -> Self {
        Self::with_dir(config.plots(), config.output_copies(), date)
    }

    pub fn with_dir(dir: impl Into<PathBuf>, copies: u32, date: NaiveDate) -> Self {
        Self {
            dir: dir.into(),
            copies,
            date,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path `name` is written to today.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}-{name}", self.date.format(DATE_FORMAT)))
    }

    /// Writes `contents` to today's copy of `name`, then deletes the oldest copies beyond
    /// `output_copies`. Returns the path written.
    pub async fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        utils::make_dir(&self.dir).await?;
        let path = self.path(name);
        utils::write(&path, contents).await?;
        debug!("Wrote {}", path.display());
        self.rotate(name).await?;
        Ok(path)
    }

    /// Deletes old copies of `name`, keeping only the newest `copies` files.
    async fn rotate(&self, name: &str) -> Result<()> {
        let mut files: Vec<(NaiveDate, PathBuf)> = Vec::new();

        let mut dir = utils::read_dir(&self.dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let file_name = entry.file_name();
            if let Some(date) = parse_dated_name(&file_name.to_string_lossy(), name) {
                files.push((date, entry.path()));
            }
        }

        files.sort();

        // Never delete the file that was just written
        let keep = (self.copies as usize).max(1);
        let to_delete = files.len().saturating_sub(keep);
        for (_, path) in files.into_iter().take(to_delete) {
            debug!("Removing old output {}", path.display());
            utils::remove(&path).await?;
        }
        Ok(())
    }
}

/// Returns the date of a file named `{YYYY-MM-DD}-{name}`, or `None` if the file name does not
/// have that form.
fn parse_dated_name(file_name: &str, name: &str) -> Option<NaiveDate> {
    let date = file_name.strip_suffix(name)?.strip_suffix('-')?;
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Renders the shaped table as CSV: the sheet's columns in sheet order followed by the derived
/// series. Undefined values are empty cells.
pub fn balance_sheet_csv(table: &BalanceSheetTable) -> Result<String> {
    let header = table.header();
    let derived = [Series::Change, Series::PercentChange, Series::MeanChange];

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut titles: Vec<String> = header.names().to_vec();
    titles.extend(derived.iter().map(|s| table.label(*s)));
    writer.write_record(&titles)?;

    let series: Vec<Vec<Option<f64>>> = derived.iter().map(|s| table.series(*s)).collect();
    for (i, row) in table.rows().iter().enumerate() {
        let mut record: Vec<String> = header
            .columns()
            .map(|(_, name, kind)| match kind {
                ColumnKind::Date => row.date().format(DATE_FORMAT).to_string(),
                ColumnKind::Currency => {
                    row.amount(name).map(|v| v.to_string()).unwrap_or_default()
                }
                ColumnKind::FreeText => row.text(name).unwrap_or_default().to_string(),
            })
            .collect();
        record.extend(
            series
                .iter()
                .map(|s| s[i].map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    into_string(writer)
}

/// Renders the long table as CSV with `date,series,value` records.
pub fn asset_breakdown_csv(breakdown: &AssetBreakdownLongTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["date", "series", "value"])?;
    for point in breakdown.data() {
        writer.write_record([
            point.x.format(DATE_FORMAT).to_string(),
            point.series.clone(),
            point.y.to_string(),
        ])?;
    }
    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Unable to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

/// Opens `path` with the system's default application.
pub fn open(path: &Path) -> Result<()> {
    open::that(path).with_context(|| format!("Unable to open {}", path.display()))
}
