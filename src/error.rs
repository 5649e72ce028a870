//! Error types.
//!
//! Application code uses `anyhow` through the `Result` alias. The shaping pipeline has its own
//! `ShapeError` so that callers can tell the fatal header and input conditions apart from the
//! row-level conditions that only cause a row to be skipped.

use thiserror::Error;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while turning a raw grid into a `BalanceSheetTable`.
///
/// `MalformedHeader` and `EmptyInput` abort the run. The others are recorded against a single row
/// (identified by its index in the raw grid) and that row is left out of the table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ShapeError {
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Row {row} has {found} cells but the header has {expected} columns")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row}, column '{column}': unable to parse '{value}' as a currency amount")]
    CurrencyParse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row}: unable to parse '{value}' as a date")]
    DateParse { row: usize, value: String },

    #[error("Expected a group label row, a header row and at least one data row, got {rows} rows")]
    EmptyInput { rows: usize },
}

impl ShapeError {
    /// Fatal errors abort shaping before any derived series is computed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShapeError::MalformedHeader(_) | ShapeError::EmptyInput { .. }
        )
    }

    /// The raw grid row index for row-level errors.
    pub fn row(&self) -> Option<usize> {
        match self {
            ShapeError::RowShape { row, .. }
            | ShapeError::CurrencyParse { row, .. }
            | ShapeError::DateParse { row, .. } => Some(*row),
            ShapeError::MalformedHeader(_) | ShapeError::EmptyInput { .. } => None,
        }
    }

    /// A short, stable name for the kind of error, used when summarizing skipped rows.
    pub fn kind(&self) -> &'static str {
        match self {
            ShapeError::MalformedHeader(_) => "malformed_header",
            ShapeError::RowShape { .. } => "row_shape",
            ShapeError::CurrencyParse { .. } => "currency_parse",
            ShapeError::DateParse { .. } => "date_parse",
            ShapeError::EmptyInput { .. } => "empty_input",
        }
    }
}
