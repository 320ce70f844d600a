// Transaction Insights - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod fetcher;
pub mod queries;
pub mod report;
pub mod source;
pub mod transaction;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use fetcher::TransactionDataFetcher;
pub use report::{write_transactions_csv, InsightReport};
pub use source::{
    parse_transactions, parse_transactions_reader, records_digest, source_digest,
    CachedSource, InMemorySource, JsonFileSource, LoadError, RecordSource,
};
pub use transaction::Transaction;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
