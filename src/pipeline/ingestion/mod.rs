pub mod fetcher;

pub use fetcher::{FetchPolicy, Fetcher};
