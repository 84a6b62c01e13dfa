//! Top-level run orchestration.
//!
//! [`fetch_release`] sequences the four stages — list, download, extract,
//! convert — for one release. Failures below the lister are per-file data:
//! each becomes a [`FileOutcome`] in the returned [`FetchReport`] and the
//! run continues with the remaining files. Only the lister is fatal, since
//! without a listing there is nothing to process.

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::output::{FetchReport, FetchStats, FileOutcome, Stage};
use crate::pipeline::convert::{self, ConverterClient};
use crate::pipeline::{download, extract, list};
use crate::source::{FtpSource, RemoteEntry, SpecSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Fetch, extract, and convert every specification archive of a release.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(FetchReport)` on success, even if some files failed
/// (check `report.stats.failed`, or call [`FetchReport::into_result`]).
///
/// # Errors
/// Returns `Err(FetchError)` only for fatal errors:
/// - no conversion endpoint configured
/// - working directories cannot be created
/// - the server is unreachable or the release does not exist
pub async fn fetch_release(config: &FetchConfig) -> Result<FetchReport, FetchError> {
    let total_start = Instant::now();
    info!("Starting fetch of release {}", config.release);

    // Build the converter first: a missing endpoint should fail before any
    // network or disk work happens.
    let converter = ConverterClient::new(config)?;
    let source = resolve_source(config);

    // ── Working directories ──────────────────────────────────────────────
    let staging_root = config.downloads_dir.join(&config.release);
    let extract_root = config.extracted_dir.join(&config.release);
    let pdf_root = config.pdfs_dir.join(&config.release);
    for dir in [&staging_root, &extract_root, &pdf_root] {
        std::fs::create_dir_all(dir).map_err(|e| FetchError::WorkdirFailed {
            path: dir.clone(),
            source: e,
        })?;
    }

    // ── Stage 1: list ────────────────────────────────────────────────────
    let entries = list::list_entries(&source, &config.release).await?;
    let mut stats = FetchStats {
        listed: entries.len(),
        ..FetchStats::default()
    };

    if entries.is_empty() {
        info!("Release {} has no archives; nothing to do", config.release);
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        if let Some(ref cb) = config.progress_callback {
            cb.on_fetch_complete(&stats);
        }
        return Ok(FetchReport {
            release: config.release.clone(),
            outcomes: Vec::new(),
            stats,
        });
    }

    let mut outcomes: Vec<FileOutcome> = Vec::new();

    // ── Stage 2: download ────────────────────────────────────────────────
    let download_start = Instant::now();
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Download, entries.len());
    }

    let mut staged: Vec<(PathBuf, RemoteEntry)> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(Stage::Download, &entry.name, i + 1, entries.len());
        }
        let start = Instant::now();
        match download::download_entry(&source, entry, &staging_root).await {
            Ok((path, bytes)) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_complete(Stage::Download, &entry.name, bytes);
                }
                outcomes.push(FileOutcome::ok(
                    &entry.name,
                    Stage::Download,
                    bytes,
                    start.elapsed().as_millis() as u64,
                ));
                staged.push((path, entry.clone()));
            }
            Err(e) => {
                warn!("{e}");
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_error(Stage::Download, &entry.name, e.to_string());
                }
                outcomes.push(FileOutcome::failed(
                    Stage::Download,
                    start.elapsed().as_millis() as u64,
                    e,
                ));
            }
        }
    }
    stats.downloaded = staged.len();
    stats.download_duration_ms = download_start.elapsed().as_millis() as u64;

    // ── Stage 3: extract ─────────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Extract, staged.len());
    }

    // (document path, PDF destination) pairs for the conversion stage.
    let mut documents: Vec<(PathBuf, PathBuf)> = Vec::new();
    for (i, (archive, entry)) in staged.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(Stage::Extract, &entry.name, i + 1, staged.len());
        }
        let start = Instant::now();
        let dest = extract_dest(&extract_root, archive, entry);

        match extract::extract_archive(archive, &dest).await {
            Ok(files) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_complete(Stage::Extract, &entry.name, files.len() as u64);
                }
                outcomes.push(FileOutcome::ok(
                    &entry.name,
                    Stage::Extract,
                    files.len() as u64,
                    start.elapsed().as_millis() as u64,
                ));
                stats.extracted += 1;

                if !config.keep_archives {
                    if let Err(e) = tokio::fs::remove_file(archive).await {
                        warn!("Could not remove staged archive {}: {e}", archive.display());
                    }
                }

                for file in files.into_iter().filter(|f| convert::is_convertible(f)) {
                    let pdf_path = pdf_dest(&extract_root, &pdf_root, &file);
                    documents.push((file, pdf_path));
                }
            }
            Err(e) => {
                warn!("{e}");
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_error(Stage::Extract, &entry.name, e.to_string());
                }
                outcomes.push(FileOutcome::failed(
                    Stage::Extract,
                    start.elapsed().as_millis() as u64,
                    e,
                ));
            }
        }
    }
    stats.documents = documents.len();

    // ── Stage 4: convert ─────────────────────────────────────────────────
    let convert_start = Instant::now();
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Convert, documents.len());
    }

    for (i, (doc, pdf_path)) in documents.iter().enumerate() {
        let name = doc
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| doc.display().to_string());
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(Stage::Convert, &name, i + 1, documents.len());
        }
        let start = Instant::now();
        match converter.convert_document(doc, pdf_path).await {
            Ok(bytes) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_complete(Stage::Convert, &name, bytes);
                }
                outcomes.push(FileOutcome::ok(
                    &name,
                    Stage::Convert,
                    bytes,
                    start.elapsed().as_millis() as u64,
                ));
                stats.converted += 1;
            }
            Err(e) => {
                warn!("{e}");
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_error(Stage::Convert, &name, e.to_string());
                }
                outcomes.push(FileOutcome::failed(
                    Stage::Convert,
                    start.elapsed().as_millis() as u64,
                    e,
                ));
            }
        }
    }
    stats.convert_duration_ms = convert_start.elapsed().as_millis() as u64;

    // ── Summary ──────────────────────────────────────────────────────────
    stats.failed = outcomes.iter().filter(|o| !o.is_success()).count();
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_fetch_complete(&stats);
    }

    info!(
        "Release {}: {}/{} archives staged, {} document(s), {} PDF(s), {} failure(s), {}ms total",
        config.release,
        stats.downloaded,
        stats.listed,
        stats.documents,
        stats.converted,
        stats.failed,
        stats.total_duration_ms
    );

    Ok(FetchReport {
        release: config.release.clone(),
        outcomes,
        stats,
    })
}

/// List the archives available for a release without downloading anything.
///
/// Does not require a conversion endpoint.
pub async fn list_release(config: &FetchConfig) -> Result<Vec<RemoteEntry>, FetchError> {
    let source = resolve_source(config);
    list::list_entries(&source, &config.release).await
}

/// Synchronous wrapper around [`fetch_release`].
///
/// Creates a temporary tokio runtime internally.
pub fn fetch_release_sync(config: &FetchConfig) -> Result<FetchReport, FetchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FetchError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(fetch_release(config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The configured source, else the production FTP source.
fn resolve_source(config: &FetchConfig) -> Arc<dyn SpecSource> {
    match &config.source {
        Some(source) => Arc::clone(source),
        None => Arc::new(FtpSource::from_config(config)),
    }
}

/// Extraction directory for one archive: the archive's own stem under its
/// mirrored subdirectory, so two archives never overwrite each other's
/// identically named members.
fn extract_dest(extract_root: &std::path::Path, archive: &std::path::Path, entry: &RemoteEntry) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.name.clone());
    if entry.rel_dir.is_empty() {
        extract_root.join(stem)
    } else {
        extract_root.join(&entry.rel_dir).join(stem)
    }
}

/// PDF destination for one extracted document: mirror the document's path
/// relative to the extraction root, with `.pdf` appended to its filename.
fn pdf_dest(
    extract_root: &std::path::Path,
    pdf_root: &std::path::Path,
    doc: &std::path::Path,
) -> PathBuf {
    let rel = doc.strip_prefix(extract_root).unwrap_or(doc);
    match rel.parent() {
        Some(parent) if parent != std::path::Path::new("") => {
            pdf_root.join(parent).join(convert::pdf_name(doc))
        }
        _ => pdf_root.join(convert::pdf_name(doc)),
    }
}
