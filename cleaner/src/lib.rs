//! # Basic cleaning - price filtering and date normalization for dataset artifacts
//!
//! Loads a versioned CSV artifact, keeps the rows whose `price` lies within
//! an inclusive range, normalizes `last_review` to dates, and publishes the
//! result as a new artifact version.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Artifact   │────▶│   Parser    │────▶│  Transform  │────▶│  Artifact   │
//! │  name:vN    │     │  (auto-enc) │     │ (range+date)│     │  name:vN+1  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use basic_cleaning::{open_store, run_cleaning, CleaningConfig, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = open_store(&StoreConfig::from_env()).unwrap();
//!     let config = CleaningConfig {
//!         input_artifact: "sample.csv:latest".into(),
//!         output_artifact: "clean_sample.csv".into(),
//!         output_type: "clean_sample".into(),
//!         output_description: "Data with outliers and null values removed".into(),
//!         min_price: 10.0,
//!         max_price: 350.0,
//!     };
//!     let report = run_cleaning(store.as_ref(), &config, std::path::Path::new(".")).await.unwrap();
//!     println!("Kept {} rows", report.stats.kept_rows);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Dataset, artifact and run models
//! - [`parser`] - CSV reading and writing with encoding detection
//! - [`transform`] - Price filter and date normalization
//! - [`config`] - Job parameters and store selection
//! - [`store`] - Local and HTTP artifact stores
//! - [`job`] - The cleaning job
//! - [`api`] - HTTP artifact server and logging

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Configuration
pub mod config;

// Artifact stores
pub mod store;

// Job
pub mod job;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ArtifactError, ArtifactResult, DatasetError, DatasetResult, JobError, JobResult, ServerError,
    ServerResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Alias, Artifact, ArtifactFile, ArtifactManifest, ArtifactRef, Cell, Dataset, LocalArtifact,
    RunRecord, RunStatus,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_encoding, parse_bytes, parse_csv, parse_csv_file, to_csv_string,
    write_csv, write_csv_file, ParseResult,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{clean_dataset, filter_range, normalize_dates, CleanResult, CleanStats, PriceRange};

// =============================================================================
// Re-exports - Config, stores, job
// =============================================================================

pub use config::{CleaningConfig, StoreConfig};
pub use job::{run_cleaning, CleaningReport, TempOutput, OUTPUT_FILE_NAME};
pub use store::{open_store, ArtifactStore, HttpArtifactStore, LocalArtifactStore};
