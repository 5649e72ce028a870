//! Types that represent the shaped balance sheet, such as `BalanceSheetTable` and
//! `AssetBreakdownLongTable`, and the parsers for individual cells.
mod amount;
mod breakdown;
mod date;
mod header;
mod row;
mod table;

pub use amount::{parse_currency, AmountError};
pub use breakdown::{AssetBreakdownLongTable, BreakdownPoint};
pub use date::parse_date;
pub use header::{ColumnKind, Header};
pub use row::BalanceSheetRow;
pub use table::{
    change, mean_change_label, percent_change, trailing_mean, BalanceSheetTable, Derived, Point,
    Series, CHANGE, MEAN_CHANGE, PERCENT_CHANGE,
};

pub(crate) use header::extract;
pub(crate) use row::is_provisional;
