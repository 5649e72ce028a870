//! Long format reshape of the asset columns, used for the category colored area chart.

use crate::model::table::{CHANGE, MEAN_CHANGE, PERCENT_CHANGE};
use crate::model::{BalanceSheetTable, ColumnKind};
use crate::pipeline::PipelineConfig;
use chrono::NaiveDate;
use serde::Serialize;

/// An `{x, y, series}` record: the amount held in one asset category on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownPoint {
    pub x: NaiveDate,
    pub y: f64,
    pub series: String,
}

/// One record per (row, asset category) pair, row by row, categories in sheet order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssetBreakdownLongTable {
    categories: Vec<String>,
    data: Vec<BreakdownPoint>,
}

impl AssetBreakdownLongTable {
    /// Pivots every currency column that is not excluded into long format. Excluded are the total,
    /// the derived series names and the configured liability columns.
    pub fn new(table: &BalanceSheetTable, config: &PipelineConfig) -> Self {
        let header = table.header();
        let categories: Vec<String> = header
            .columns()
            .filter(|(_, name, kind)| {
                *kind == ColumnKind::Currency
                    && *name != header.total_column()
                    && !is_derived_name(name)
                    && !config.is_liability(name)
            })
            .map(|(_, name, _)| name.to_string())
            .collect();

        let mut data = Vec::with_capacity(table.len() * categories.len());
        for row in table.rows() {
            for category in &categories {
                if let Some(amount) = row.amount(category) {
                    data.push(BreakdownPoint {
                        x: row.date(),
                        y: amount,
                        series: category.clone(),
                    });
                }
            }
        }

        Self { categories, data }
    }

    /// The asset category columns, in sheet order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn data(&self) -> &[BreakdownPoint] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The records of a single category, in row order.
    pub fn category<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a BreakdownPoint> {
        self.data.iter().filter(move |p| p.series == name)
    }
}

fn is_derived_name(name: &str) -> bool {
    name == CHANGE || name == PERCENT_CHANGE || name == MEAN_CHANGE
}
