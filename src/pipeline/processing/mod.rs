// Turning cached documents into processed tables

pub mod cell;
pub mod tables;

pub use cell::normalize_cell;
pub use tables::{extract, TableOutcome, TableSchema};
