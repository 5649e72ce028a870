//! Shapes a balance sheet kept in a Google Sheet into a typed table with derived change series,
//! and charts it.
//!
//! The data path is pure: `pipeline::shape` takes the raw grid of cell strings and returns the
//! shaped table, the long-format asset breakdown, and the rows it had to skip. Fetching, charting
//! and file output live around it.

mod api;
pub mod args;
pub mod chart;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod output;
pub mod pipeline;
mod utils;


pub use api::{Mode, TEST_MODE_ENV};
pub use config::Config;
pub use error::{Error, Result, ShapeError};
