//! # tgpp-fetch
//!
//! Fetch 3GPP specification archives from the public FTP mirror, unzip
//! them, and convert the contained documents to PDF through a hosted
//! [Gotenberg](https://gotenberg.dev) instance.
//!
//! ## Why this crate?
//!
//! 3GPP publishes each release as hundreds of zipped Word documents spread
//! over per-series FTP directories. Reading them means downloading every
//! archive, unzipping it, and pushing each `.doc` through a converter —
//! tedious to do by hand and easy to get wrong halfway through. This crate
//! runs the whole pipeline end to end and reports exactly which files made
//! it and which did not.
//!
//! ## Pipeline Overview
//!
//! ```text
//! release id
//!  │
//!  ├─ 1. List      walk Rel-<n> on the FTP mirror, collect the archives
//!  ├─ 2. Download  stage each archive under downloads/<release>/
//!  ├─ 3. Extract   unzip into extracted/<release>/ (blocking pool)
//!  ├─ 4. Convert   POST each document to Gotenberg, write pdfs/<release>/
//!  └─ 5. Report    per-file outcomes + aggregate stats
//! ```
//!
//! A failure below the listing stage never aborts the run: it becomes a
//! [`FileOutcome`] in the final [`FetchReport`] and the pipeline moves on
//! to the next file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tgpp_fetch::{fetch_release, FetchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FetchConfig::builder()
//!         .release("17")
//!         .endpoint("http://localhost:3000")
//!         .build()?;
//!     let report = fetch_release(&config).await?;
//!     println!(
//!         "{} PDFs written, {} failures",
//!         report.stats.converted, report.stats.failed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tgpp-fetch` binary (clap + anyhow + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! tgpp-fetch = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FetchConfig, FetchConfigBuilder};
pub use error::{FetchError, FileError};
pub use fetch::{fetch_release, fetch_release_sync, list_release};
pub use output::{FetchReport, FetchStats, FileOutcome, Stage};
pub use progress::{FetchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use source::{FtpSource, RemoteEntry, SpecSource};
