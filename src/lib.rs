// Coins Explorer - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod logging;
pub mod config;
pub mod record;         // Data model + fixed-point parsing
pub mod temporal;       // Inclusive day spans per calendar year
pub mod dialect;        // Semicolon CSV dialect shared by all datasets
pub mod wages;          // Year -> hourly wage table
pub mod reconciliation; // Quantity splits across linked records
pub mod normalize;      // Value in hourly wages
pub mod ingest;         // Coins + wages -> RecordSet
pub mod export;         // RecordSet -> CSV
pub mod attributes;     // Field registry by external name
pub mod filter;         // Query-driven record selection
pub mod cache;          // Cached datasets with periodic refresh

#[cfg(feature = "server")]
pub mod api;            // HTTP surface (axum)

// Re-export commonly used types
pub use error::{CoinsError, Result};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use config::{CacheConfig, Config, DataConfig, ServerConfig};
pub use record::{format_date, parse_date, parse_decimal, round_half_up, Record};
pub use temporal::DaySpan;
pub use wages::WageTable;
pub use reconciliation::{LinkGraph, QuantityReconciler, QuantitySplit, ReconciliationReport};
pub use normalize::{average_wage, normalize_values, value_in_hourly_wages};
pub use ingest::{ingest, ingest_with_stats, IngestStats, RecordSet};
pub use export::{records_to_csv_string, write_records, EXPORT_HEADERS};
pub use attributes::{FieldAccessor, FieldKind, FieldRegistry, FieldValue};
pub use filter::{Criterion, DateRange, FilterOutcome, FilterQuery, RangeMode, RecordsFilter};
pub use cache::{CacheState, CachedResource, Dataset, DatasetSource, Datasets, FileSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
