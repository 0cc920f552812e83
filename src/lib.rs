//! Fetches public health statistics, keeps every version of them on disk and
//! extracts the data tables of the Montréal page into CSV files.

pub mod app;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod infra;
pub mod observability;
pub mod pipeline;

pub use error::{Result, ScraperError};
