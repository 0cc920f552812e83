pub mod versioned;

pub use versioned::{SaveOutcome, VersionedStore};
