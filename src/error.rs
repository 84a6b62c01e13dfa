//! Error types for the tgpp-fetch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`FetchError`] — **Fatal**: the run cannot proceed at all (server
//!   unreachable, release absent, bad configuration). Returned as
//!   `Err(FetchError)` from the top-level `fetch_release`/`list_release`
//!   functions.
//!
//! * [`FileError`] — **Non-fatal**: a single file failed (interrupted
//!   transfer, corrupt archive, rejected conversion) but the remaining files
//!   are fine. Stored inside [`crate::output::FileOutcome`] so callers can
//!   inspect partial success rather than losing the whole run to one bad
//!   file.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first file failure via [`crate::output::FetchReport::into_result`], or
//! log and inspect the accumulated outcomes after the run.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the tgpp-fetch library.
///
/// File-level failures use [`FileError`] and are stored in
/// [`crate::output::FileOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum FetchError {
    // ── Remote errors ─────────────────────────────────────────────────────
    /// The FTP server could not be reached or the session was refused.
    #[error("Cannot reach FTP server '{host}': {reason}\nCheck your network connection and the --ftp-host value.")]
    ConnectionFailed { host: String, reason: String },

    /// The server is up but the release directory does not exist.
    #[error("Release '{release}' not found on the server (looked in '{path}')\nCheck the release number; recent releases are 16, 17, 18.")]
    ReleaseNotFound { release: String, path: String },

    // ── Local errors ──────────────────────────────────────────────────────
    /// A working directory could not be created.
    #[error("Failed to prepare working directory '{path}': {source}")]
    WorkdirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed or a required value is missing.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Aggregate errors ──────────────────────────────────────────────────
    /// Some files succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::FetchReport::into_result`] when the
    /// caller wants to treat any file failure as an error.
    #[error("{failed}/{total} files failed during the run")]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        total: usize,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single file.
///
/// Stored alongside [`crate::output::FileOutcome`] when a file fails at some
/// stage. The overall run continues with the remaining files.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The FTP transfer failed or was interrupted; any partial local file
    /// has been removed.
    #[error("Transfer of '{name}' failed: {detail}")]
    TransferFailed { name: String, detail: String },

    /// The downloaded archive could not be opened as a zip container.
    #[error("Archive '{name}' is corrupt or not a zip file: {detail}")]
    CorruptArchive { name: String, detail: String },

    /// The conversion service returned a non-success status or was
    /// unreachable.
    #[error("Conversion of '{name}' failed after {attempts} attempt(s): {detail}")]
    ConversionFailed {
        name: String,
        attempts: u32,
        detail: String,
    },

    /// The document could not be read, or the output could not be written.
    #[error("Local I/O error for '{name}': {detail}")]
    LocalIo { name: String, detail: String },
}

impl FileError {
    /// The filename this error is about.
    pub fn name(&self) -> &str {
        match self {
            FileError::TransferFailed { name, .. }
            | FileError::CorruptArchive { name, .. }
            | FileError::ConversionFailed { name, .. }
            | FileError::LocalIo { name, .. } => name,
        }
    }
}
