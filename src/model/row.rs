use crate::error::ShapeError;
use crate::model::amount::parse_currency;
use crate::model::date::parse_date;
use crate::model::{ColumnKind, Header};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One dated record of the balance sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BalanceSheetRow {
    date: NaiveDate,
    currency_fields: BTreeMap<String, f64>,
    free_text_fields: BTreeMap<String, String>,
}

impl BalanceSheetRow {
    /// Parses the cells of the data row found at index `row` of the raw grid.
    ///
    /// The row must have exactly one cell per header column, a parseable date, and a parseable
    /// amount in every currency column. The first problem found is returned.
    pub fn parse<S>(header: &Header, row: usize, cells: &[S]) -> Result<Self, ShapeError>
    where
        S: AsRef<str>,
    {
        if cells.len() != header.len() {
            return Err(ShapeError::RowShape {
                row,
                expected: header.len(),
                found: cells.len(),
            });
        }

        let date_cell = cells[header.date_index()].as_ref();
        let date = parse_date(date_cell).ok_or_else(|| ShapeError::DateParse {
            row,
            value: date_cell.to_string(),
        })?;

        let mut currency_fields = BTreeMap::new();
        let mut free_text_fields = BTreeMap::new();
        for (ix, name, kind) in header.columns() {
            let cell = cells[ix].as_ref();
            match kind {
                ColumnKind::Date => {}
                ColumnKind::FreeText => {
                    free_text_fields.insert(name.to_string(), cell.to_string());
                }
                ColumnKind::Currency => {
                    let value = parse_currency(cell).map_err(|_| ShapeError::CurrencyParse {
                        row,
                        column: name.to_string(),
                        value: cell.to_string(),
                    })?;
                    currency_fields.insert(name.to_string(), value);
                }
            }
        }

        Ok(Self {
            date,
            currency_fields,
            free_text_fields,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The parsed amount of a currency column.
    pub fn amount(&self, column: &str) -> Option<f64> {
        self.currency_fields.get(column).copied()
    }

    /// The text of a free-text column.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.free_text_fields.get(column).map(|s| s.as_str())
    }

    pub fn currency_fields(&self) -> &BTreeMap<String, f64> {
        &self.currency_fields
    }

    pub fn free_text_fields(&self) -> &BTreeMap<String, String> {
        &self.free_text_fields
    }
}

/// True when the row's date cell is blank or absent. Such rows are placeholders for the period in
/// progress and are dropped without being counted as errors.
pub(crate) fn is_provisional<S>(header: &Header, cells: &[S]) -> bool
where
    S: AsRef<str>,
{
    cells
        .get(header.date_index())
        .map(|cell| cell.as_ref().trim().is_empty())
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;

    fn header() -> Header {
        Header::new(
            ["Date", "Notes", "Checking", "Total"],
            &PipelineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_row() {
        let row =
            BalanceSheetRow::parse(&header(), 2, &["01/01/2024", "paid", "$1,100.50", "$100"])
                .unwrap();
        assert_eq!(row.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(row.amount("Checking"), Some(1100.5));
        assert_eq!(row.amount("Total"), Some(100.0));
        assert_eq!(row.amount("Notes"), None);
        assert_eq!(row.text("Notes"), Some("paid"));
        assert_eq!(row.currency_fields().len(), 2);
    }

    #[test]
    fn test_short_row() {
        let err = BalanceSheetRow::parse(&header(), 5, &["01/01/2024", "", "$1.00"]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::RowShape {
                row: 5,
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_bad_date() {
        let err = BalanceSheetRow::parse(&header(), 3, &["someday", "", "$1.00", "$1.00"])
            .unwrap_err();
        assert_eq!(
            err,
            ShapeError::DateParse {
                row: 3,
                value: "someday".into()
            }
        );
    }

    #[test]
    fn test_bad_currency_names_the_column() {
        let err = BalanceSheetRow::parse(&header(), 4, &["01/01/2024", "", "abc", "$1.00"])
            .unwrap_err();
        assert_eq!(
            err,
            ShapeError::CurrencyParse {
                row: 4,
                column: "Checking".into(),
                value: "abc".into()
            }
        );
    }

    #[test]
    fn test_blank_currency_cell_is_not_zero() {
        let err =
            BalanceSheetRow::parse(&header(), 4, &["01/01/2024", "", "", "$1.00"]).unwrap_err();
        assert!(matches!(err, ShapeError::CurrencyParse { .. }));
    }

    #[test]
    fn test_is_provisional() {
        let header = header();
        assert!(is_provisional(&header, &["", "", "", ""]));
        assert!(is_provisional(&header, &["  ", "note", "$1", "$1"]));
        assert!(is_provisional::<&str>(&header, &[]));
        assert!(!is_provisional(&header, &["1/1/2024"]));
    }
}
