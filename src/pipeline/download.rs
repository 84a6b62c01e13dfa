//! Archive staging: bring one remote entry onto local disk.
//!
//! The stage owns the local half of a transfer: it prepares the destination
//! directory, delegates the byte transfer to the source, and guarantees
//! that a failed transfer leaves no partial file behind — the extract stage
//! must never see a truncated zip and mistake it for a corrupt server
//! artifact.

use crate::error::FileError;
use crate::source::{RemoteEntry, SpecSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Download one entry into the staging tree rooted at `staging_root`.
///
/// The file lands at `<staging_root>/<rel_dir>/<name>`, overwriting any
/// previous download of the same entry. On failure the partial local file
/// (if any) is removed before the error is returned.
///
/// Returns the destination path and the byte count.
pub async fn download_entry(
    source: &Arc<dyn SpecSource>,
    entry: &RemoteEntry,
    staging_root: &Path,
) -> Result<(PathBuf, u64), FileError> {
    let dest = staging_root.join(entry.local_rel_path());

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FileError::LocalIo {
                name: entry.name.clone(),
                detail: format!("creating '{}': {e}", parent.display()),
            })?;
    }

    match source.fetch_entry(entry, &dest).await {
        Ok(bytes) => {
            debug!("Staged {} ({} bytes)", dest.display(), bytes);
            Ok((dest, bytes))
        }
        Err(e) => {
            // A truncated file must not survive to the extract stage.
            if tokio::fs::remove_file(&dest).await.is_ok() {
                warn!("Removed partial download {}", dest.display());
            }
            Err(e)
        }
    }
}
