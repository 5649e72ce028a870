//! The shaped balance sheet and the series derived from its total column.

use crate::model::{BalanceSheetRow, Header};
use chrono::NaiveDate;
use serde::Serialize;
use std::num::NonZeroUsize;

/// Name of the period-over-period change series.
pub const CHANGE: &str = "Change";
/// Name of the percent change series.
pub const PERCENT_CHANGE: &str = "PercentChange";
/// Name of the trailing mean of `Change` series.
pub const MEAN_CHANGE: &str = "SixPeriodMeanChange";

/// Derived values for one row. `None` means undefined, which is never the same as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Derived {
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
    pub mean_change: Option<f64>,
}

/// A series that can be charted from the table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    Total,
    Change,
    PercentChange,
    MeanChange,
}

/// An `{x, y}` record handed to the charting code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: NaiveDate,
    pub y: f64,
}

/// The validated rows of the balance sheet in input order, with their derived series.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSheetTable {
    header: Header,
    rows: Vec<BalanceSheetRow>,
    derived: Vec<Derived>,
    window: NonZeroUsize,
}

impl BalanceSheetTable {
    /// Builds the table and computes the derived series over `rows`, which must already be in
    /// chronological order. Consecutive rows are adjacent periods regardless of calendar distance.
    pub fn new(header: Header, rows: Vec<BalanceSheetRow>, window: NonZeroUsize) -> Self {
        let totals: Vec<f64> = rows
            .iter()
            .map(|r| r.amount(header.total_column()).unwrap_or(f64::NAN))
            .collect();
        let change = change(&totals);
        let percent_change = percent_change(&totals);
        let mean_change = trailing_mean(&change, window);
        let derived = change
            .into_iter()
            .zip(percent_change)
            .zip(mean_change)
            .map(|((change, percent_change), mean_change)| Derived {
                change,
                percent_change,
                mean_change,
            })
            .collect();
        Self {
            header,
            rows,
            derived,
            window,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn rows(&self) -> &[BalanceSheetRow] {
        &self.rows
    }

    pub fn derived(&self) -> &[Derived] {
        &self.derived
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn window(&self) -> NonZeroUsize {
        self.window
    }

    pub fn totals(&self) -> Vec<f64> {
        self.column(self.header.total_column())
    }

    /// The amounts of a currency column, one per row. Empty if the column is not a currency column.
    pub fn column(&self, name: &str) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.amount(name)).collect()
    }

    /// The value of `series` for every row, `None` where undefined.
    pub fn series(&self, series: Series) -> Vec<Option<f64>> {
        match series {
            Series::Total => self.totals().into_iter().map(Some).collect(),
            Series::Change => self.derived.iter().map(|d| d.change).collect(),
            Series::PercentChange => self.derived.iter().map(|d| d.percent_change).collect(),
            Series::MeanChange => self.derived.iter().map(|d| d.mean_change).collect(),
        }
    }

    /// The defined values of `series` as `{x: date, y: value}` records.
    pub fn points(&self, series: Series) -> Vec<Point> {
        self.rows
            .iter()
            .zip(self.series(series))
            .filter_map(|(row, y)| y.map(|y| Point { x: row.date(), y }))
            .collect()
    }

    /// The label a series is shown with. The trailing mean is named after its window.
    pub fn label(&self, series: Series) -> String {
        match series {
            Series::Total => self.header.total_column().to_string(),
            Series::Change => CHANGE.to_string(),
            Series::PercentChange => PERCENT_CHANGE.to_string(),
            Series::MeanChange => mean_change_label(self.window),
        }
    }
}

/// `SixPeriodMeanChange` for the default window, `{n}PeriodMeanChange` otherwise.
pub fn mean_change_label(window: NonZeroUsize) -> String {
    if window.get() == 6 {
        MEAN_CHANGE.to_string()
    } else {
        format!("{window}PeriodMeanChange")
    }
}

/// First difference: `out[i] = totals[i] - totals[i - 1]`, undefined for the first row.
pub fn change(totals: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(totals.len());
    if !totals.is_empty() {
        out.push(None);
    }
    out.extend(totals.windows(2).map(|w| Some(w[1] - w[0])));
    out
}

/// `out[i] = totals[i] / totals[i - 1] - 1` when the previous total is not negative, otherwise
/// undefined. A previous total of zero would not give a finite ratio and is left undefined too.
pub fn percent_change(totals: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(totals.len());
    if !totals.is_empty() {
        out.push(None);
    }
    out.extend(totals.windows(2).map(|w| {
        let (previous, current) = (w[0], w[1]);
        if previous >= 0.0 {
            Some(current / previous - 1.0).filter(|v| v.is_finite())
        } else {
            None
        }
    }));
    out
}

/// Trailing, non-centered mean over `window` values ending at each index. Defined only where every
/// value in the window is defined.
pub fn trailing_mean(values: &[Option<f64>], window: NonZeroUsize) -> Vec<Option<f64>> {
    let w = window.get();
    (0..values.len())
        .map(|i| {
            if i + 1 < w {
                return None;
            }
            let span = &values[i + 1 - w..=i];
            let sum = span.iter().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
            Some(sum / w as f64)
        })
        .collect()
}
