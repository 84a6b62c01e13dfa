//! Result types produced by a pipeline run.
//!
//! Stage-boundary failures are data, not control flow: every file processed
//! by any stage yields a [`FileOutcome`] carrying either its byte count or a
//! [`FileError`]. The orchestrator accumulates outcomes into a
//! [`FetchReport`] so one bad file never aborts the rest of the run, and
//! callers get the full picture afterwards instead of the first exception.

use crate::error::{FetchError, FileError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The pipeline stage a [`FileOutcome`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// FTP transfer into the staging directory.
    Download,
    /// Unzipping a staged archive.
    Extract,
    /// Document-to-PDF conversion via the hosted service.
    Convert,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Download => write!(f, "download"),
            Stage::Extract => write!(f, "extract"),
            Stage::Convert => write!(f, "convert"),
        }
    }
}

/// The tagged result of processing one file at one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Filename the stage operated on.
    pub name: String,

    /// Which stage produced this outcome.
    pub stage: Stage,

    /// Bytes written by the stage (0 on failure; for the extract stage this
    /// is the number of files produced, not bytes).
    pub bytes: u64,

    /// Wall-clock time the stage spent on this file.
    pub duration_ms: u64,

    /// `None` on success; the per-file error otherwise.
    pub error: Option<FileError>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Shorthand for a successful outcome.
    pub(crate) fn ok(name: impl Into<String>, stage: Stage, bytes: u64, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            stage,
            bytes,
            duration_ms,
            error: None,
        }
    }

    /// Shorthand for a failed outcome.
    pub(crate) fn failed(stage: Stage, duration_ms: u64, error: FileError) -> Self {
        Self {
            name: error.name().to_string(),
            stage,
            bytes: 0,
            duration_ms,
            error: Some(error),
        }
    }
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchStats {
    /// Remote archive entries found by the lister.
    pub listed: usize,
    /// Archives staged successfully.
    pub downloaded: usize,
    /// Archives unzipped successfully.
    pub extracted: usize,
    /// Convertible documents produced by extraction.
    pub documents: usize,
    /// Documents converted to PDF successfully.
    pub converted: usize,
    /// Total failed outcomes across all stages.
    pub failed: usize,
    /// Wall-clock duration of the whole run.
    pub total_duration_ms: u64,
    /// Time spent in the download stage.
    pub download_duration_ms: u64,
    /// Time spent in the conversion stage.
    pub convert_duration_ms: u64,
}

/// Everything a run produced: per-file outcomes plus aggregate stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReport {
    /// The release this run processed.
    pub release: String,
    /// One entry per file per stage, in processing order.
    pub outcomes: Vec<FileOutcome>,
    /// Aggregate counters.
    pub stats: FetchStats,
}

impl FetchReport {
    /// Iterate over the failed outcomes only.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Whether every processed file succeeded (an empty run counts as
    /// success).
    pub fn is_complete_success(&self) -> bool {
        self.stats.failed == 0
    }

    /// Treat any file failure as a hard error.
    ///
    /// Returns `Err(FetchError::PartialFailure)` if at least one outcome
    /// failed; otherwise returns the report unchanged.
    pub fn into_result(self) -> Result<FetchReport, FetchError> {
        let failed = self.stats.failed;
        if failed > 0 {
            let total = self.outcomes.len();
            Err(FetchError::PartialFailure {
                succeeded: total - failed,
                failed,
                total,
            })
        } else {
            Ok(self)
        }
    }
}
