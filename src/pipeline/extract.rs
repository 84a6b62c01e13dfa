//! Archive extraction: unzip a staged archive into the extraction tree.
//!
//! ## Why `spawn_blocking`?
//!
//! The `zip` crate is synchronous and decompression is CPU-bound. Running
//! it on the blocking thread pool keeps the async workers responsive, the
//! same treatment the other blocking dependency (the FTP client) gets.

use crate::error::FileError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Unzip `archive` into `dest_dir`, returning the extracted file paths.
///
/// Entry filenames are preserved; nested directories inside the archive are
/// recreated under `dest_dir`. Entries whose names escape the destination
/// (absolute paths, `..` components) are skipped with a warning rather than
/// written outside the tree.
///
/// # Errors
/// [`FileError::CorruptArchive`] if the container cannot be opened or an
/// entry cannot be read; [`FileError::LocalIo`] on disk failures.
pub async fn extract_archive(archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, FileError> {
    let archive = archive.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();
    let name = archive_name(&archive);

    tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest_dir))
        .await
        .map_err(|e| FileError::LocalIo {
            name,
            detail: format!("extraction task panicked: {e}"),
        })?
}

fn archive_name(archive: &Path) -> String {
    archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string())
}

fn extract_blocking(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, FileError> {
    let name = archive_name(archive_path);

    std::fs::create_dir_all(dest_dir).map_err(|e| FileError::LocalIo {
        name: name.clone(),
        detail: format!("creating '{}': {e}", dest_dir.display()),
    })?;

    let file = std::fs::File::open(archive_path).map_err(|e| FileError::LocalIo {
        name: name.clone(),
        detail: format!("opening archive: {e}"),
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| FileError::CorruptArchive {
        name: name.clone(),
        detail: e.to_string(),
    })?;

    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| FileError::CorruptArchive {
            name: name.clone(),
            detail: format!("reading entry {i}: {e}"),
        })?;

        let out_path = match entry.enclosed_name() {
            Some(path) => dest_dir.join(path),
            None => {
                warn!("Skipping entry with unsafe path in {}", name);
                continue;
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| FileError::LocalIo {
                name: name.clone(),
                detail: format!("creating '{}': {e}", out_path.display()),
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FileError::LocalIo {
                name: name.clone(),
                detail: format!("creating '{}': {e}", parent.display()),
            })?;
        }

        let mut out_file = std::fs::File::create(&out_path).map_err(|e| FileError::LocalIo {
            name: name.clone(),
            detail: format!("creating '{}': {e}", out_path.display()),
        })?;

        std::io::copy(&mut entry, &mut out_file).map_err(|e| FileError::CorruptArchive {
            name: name.clone(),
            detail: format!("decompressing '{}': {e}", out_path.display()),
        })?;

        debug!("Extracted {}", out_path.display());
        extracted.push(out_path);
    }

    info!("{}: {} file(s) extracted", name, extracted.len());
    Ok(extracted)
}
