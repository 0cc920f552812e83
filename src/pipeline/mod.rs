// Ingestion pipeline: locking, fetching, versioned storage and table extraction

pub mod ingestion;
pub mod lock;
pub mod orchestrator;
pub mod processing;
pub mod status;
pub mod storage;

pub use orchestrator::{Pipeline, RunOptions, RunReport, SourceOutcome, StorageLayout};
