// Ledger Reconciliation - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod schema;         // Source layouts - typed field maps
pub mod parser;         // CSV → positional records
pub mod classify;       // Gateway normalization + match keys
pub mod temporal;       // Ambiguous date handling
pub mod filter;         // Field / date-range filtering
pub mod reconciliation; // Aggregator
pub mod difference;     // Orphan extraction per bucket
pub mod export;         // Spreadsheet-friendly CSV
pub mod report;         // Combined gateway / action view
pub mod session;        // Caller-owned current files + fetch generations
pub mod config;
pub mod db;             // SQLite local ledger store
pub mod client;         // Local-data HTTP client

#[cfg(feature = "server")]
pub mod api;            // Local-data HTTP API

// Re-export commonly used types
pub use error::{ReconError, Result};
pub use schema::{cell, FieldMap, Source, INPLAY_FIELDS, LOCAL_FIELDS, LOCAL_HEADERS};
pub use parser::{load_ledger, load_ledgers, parse_ledger, parse_ledger_str, LedgerFile, Record};
pub use classify::{classify, match_key, normalize_gateway, Classification, UNKNOWN, VOUCHER_GATEWAY};
pub use temporal::{epoch_sentinel, parse_ambiguous_date, parse_row_date, DateConvention};
pub use filter::{filter_files, filter_rows, DateRange, FieldMatch, FilterField, FilterOptions};
pub use reconciliation::{aggregate, composite_key, BucketStats, CurrencyAmounts, RowCounts, Stats, TotalRows};
pub use difference::{difference_details, DifferenceDetails, Selector};
pub use export::{export_to_path, to_csv_string};
pub use session::{ComparisonSession, FetchOutcome, FetchRequest};
pub use config::Config;
pub use db::{get_local_data, insert_lines, setup_database, verify_count};
pub use client::LocalDataClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
