//! # Docket - Court Cause-List Ingestion
//!
//! This crate discovers a court's published cause lists on its listing page,
//! downloads them, turns each document into structured court, bench and case
//! records through a document-understanding API, and upserts the records into
//! a normalized libsql database.
//!
//! ## Features
//!
//! - Heuristic link classification driven by a per-court profile
//! - Rate-limited, retrying downloads with URL and content dedupe
//! - Two-pass extraction (document → markdown → JSON) with lenient parsing
//!   and a manual fallback for malformed output
//! - Idempotent natural-key upserts: re-running a date adds no rows
//! - Bounded worker pools for downloads and structuring
//! - Rule-based case tagging
//!
//! ## Example
//!
//! ```rust,no_run
//! use docket::extract::{GeminiConfig, GeminiExtractor};
//! use docket::fetcher::{Fetcher, FetcherConfig};
//! use docket::pipeline::{Pipeline, PipelineConfig};
//! use docket::profile::CourtProfile;
//! use docket::store::Repository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = GeminiExtractor::new(GeminiConfig::from_env()?)?;
//!     let fetcher = Fetcher::new(FetcherConfig::default())?;
//!     let repo = Repository::new_from_path("docket.db").await?;
//!
//!     let pipeline = Pipeline::new(
//!         CourtProfile::default(),
//!         fetcher,
//!         extractor,
//!         repo,
//!         PipelineConfig::default(),
//!     );
//!     let today = chrono::Local::now().date_naive();
//!     let report = pipeline.run(&[today]).await;
//!     println!("persisted {} documents", report.totals().persisted);
//!     Ok(())
//! }
//! ```

mod error;
pub mod http;

pub mod classifier;
pub mod extract;
pub mod fetcher;
pub mod pipeline;
pub mod profile;
pub mod store;
pub mod structurer;
pub mod tagging;

pub use error::{Error, Result};
