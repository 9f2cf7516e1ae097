//! # libretto-core
//!
//! Core library for exporting media-server libraries (movies, TV shows, music)
//! to CSV.
//!
//! This crate provides:
//! - An authenticated HTTP client with timeouts and bounded retries
//! - Page-by-page traversal of a library section
//! - Normalization of heterogeneous item metadata into fixed per-type schemas
//! - Atomic CSV output that never leaves a half-written file behind
//! - A per-output run lock so two exports never write the same file
//!
//! ## Modules
//!
//! - [`catalog`] - Library sections, pages, raw items and the [`Catalog`] trait
//! - [`client`] - HTTP transport
//! - [`config`] - Configuration file handling
//! - [`error`] - Error types and Result alias
//! - [`export`] - Export jobs and batch export
//! - [`guard`] - Run lock
//! - [`normalize`] - Per-type schemas and extraction rules
//! - [`paginate`] - Pagination engine
//! - [`records`] - Reading exports back for importers
//! - [`sink`] - CSV output
//!
//! ## Example
//!
//! ```no_run
//! use libretto_core::{Exporter, PlexClient};
//! use std::path::Path;
//!
//! # async fn run() -> libretto_core::Result<()> {
//! let client = PlexClient::new("http://localhost:32400", "my-token")?;
//! let exporter = Exporter::new(client);
//! let summary = exporter
//!     .export_library_by_name("Movies", Path::new("exports/Movies.csv"))
//!     .await?;
//! println!("Exported {} rows", summary.rows_written);
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod guard;
pub mod normalize;
pub mod paginate;
pub mod records;
pub mod sink;
pub mod utils;

// Re-export key types for convenience

// Error types
pub use error::{Error, Result};

// Catalog and transport
pub use catalog::{Catalog, ContentType, LibrarySection, Page, RawItem};
pub use client::{ClientOptions, PlexClient};

// Configuration
pub use config::Config;

// Pipeline
pub use export::{BatchSummary, ExportOptions, ExportSummary, Exporter, LibraryOutcome};
pub use guard::RunGuard;
pub use normalize::{normalize, NormalizedRow, Schema};
pub use paginate::Paginator;
pub use records::{read_movie_records, read_show_records, ImportCandidate};
pub use sink::CsvSink;
