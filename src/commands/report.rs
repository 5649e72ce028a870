//! The `balance-sheet report` command: fetch, shape, chart and export.

use crate::api::{self, Mode};
use crate::chart::Chart;
use crate::commands::Out;
use crate::model::Series;
use crate::output::{self, Output, ASSET_BREAKDOWN_CSV, BALANCE_SHEET_CSV};
use crate::pipeline::shape;
use crate::{Config, Result};
use anyhow::Context;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Switches for the `report` command.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReportOptions {
    /// Open the net worth chart when done.
    pub open: bool,
    /// Also write the CSV exports.
    pub csv: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            open: false,
            csv: true,
        }
    }
}

/// What a report run did.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportSummary {
    /// Rows after the header, as fetched.
    pub data_rows: usize,
    /// Rows in the shaped table.
    pub rows_kept: usize,
    /// Rows without a date, which are not yet complete.
    pub provisional_rows: usize,
    /// Rows dropped because a cell could not be parsed, counted by error kind.
    pub skipped: BTreeMap<String, usize>,
    pub latest_date: Option<NaiveDate>,
    pub latest_total: Option<f64>,
    pub latest_change: Option<f64>,
    pub files: Vec<PathBuf>,
}

/// Fetches the balance sheet, shapes it, and writes the charts (and CSV exports) dated today.
pub async fn report(
    config: Config,
    mode: Mode,
    options: ReportOptions,
) -> Result<Out<ReportSummary>> {
    let today = Local::now().date_naive();
    report_on(&config, mode, options, today).await
}

async fn report_on(
    config: &Config,
    mode: Mode,
    options: ReportOptions,
    today: NaiveDate,
) -> Result<Out<ReportSummary>> {
    let mut sheet = api::sheet(config, mode).await?;
    let grid = sheet.get(config.sheet_name()).await?;
    info!("Fetched {} rows from '{}'", grid.len(), config.sheet_name());

    let shaped = shape(&grid, config.pipeline())
        .with_context(|| format!("Unable to shape the '{}' sheet", config.sheet_name()))?;
    let table = shaped.table();

    let output = Output::new(config, today);
    let mut files = Vec::new();
    for chart in Chart::ALL {
        let svg = chart.render(table, shaped.breakdown())?;
        files.push(output.write(chart.file_name(), svg).await?);
    }
    if options.csv {
        let csv = output::balance_sheet_csv(table)?;
        files.push(output.write(BALANCE_SHEET_CSV, csv).await?);
        let csv = output::asset_breakdown_csv(shaped.breakdown())?;
        files.push(output.write(ASSET_BREAKDOWN_CSV, csv).await?);
    }

    if options.open {
        let net_worth = output.path(Chart::NetWorth.file_name());
        if let Err(e) = output::open(&net_worth) {
            warn!("{e:#}");
        }
    }

    let summary = ReportSummary {
        data_rows: shaped.data_rows(),
        rows_kept: table.len(),
        provisional_rows: shaped.provisional_rows(),
        skipped: shaped
            .skipped_by_kind()
            .into_iter()
            .map(|(kind, n)| (kind.to_string(), n))
            .collect(),
        latest_date: table.rows().last().map(|r| r.date()),
        latest_total: table.totals().last().copied(),
        latest_change: table.series(Series::Change).last().copied().flatten(),
        files,
    };
    let skipped: usize = summary.skipped.values().sum();
    let message = format!(
        "Charted {} rows ({} provisional, {} skipped) into {}",
        summary.rows_kept,
        summary.provisional_rows,
        skipped,
        output.dir().display()
    );
    Ok(Out::new(message, summary))
}
