//! Release listing: resolve the ordered archive listing for a release.
//!
//! The remote walk itself lives behind [`crate::source::SpecSource`]; this
//! stage owns what the rest of the pipeline relies on — only zip archives
//! come through, and the order is deterministic regardless of the server's
//! directory-listing order.

use crate::error::FetchError;
use crate::source::{RemoteEntry, SpecSource};
use std::sync::Arc;
use tracing::{debug, info};

/// List the specification archives available for `release`.
///
/// Non-archive files published next to the specs (readme files, status
/// lists) are dropped; the remaining entries are sorted by remote path so
/// repeated runs process files in the same order.
///
/// # Errors
/// Propagates the source's fatal errors ([`FetchError::ReleaseNotFound`],
/// [`FetchError::ConnectionFailed`]); a listing failure aborts the whole
/// run since no files are known to process.
pub async fn list_entries(
    source: &Arc<dyn SpecSource>,
    release: &str,
) -> Result<Vec<RemoteEntry>, FetchError> {
    let raw = source.list_release(release).await?;
    let total = raw.len();

    let mut entries: Vec<RemoteEntry> = raw.into_iter().filter(|e| is_archive(&e.name)).collect();
    entries.sort_by(|a, b| a.remote_path.cmp(&b.remote_path));

    if entries.len() < total {
        debug!(
            "Dropped {} non-archive file(s) from the listing",
            total - entries.len()
        );
    }
    info!(
        "Release {}: {} archive(s) available",
        release,
        entries.len()
    );

    Ok(entries)
}

/// Whether a remote filename is a specification archive.
pub fn is_archive(name: &str) -> bool {
    name.to_lowercase().ends_with(".zip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedSource(Vec<RemoteEntry>);

    #[async_trait]
    impl SpecSource for FixedSource {
        async fn list_release(&self, _release: &str) -> Result<Vec<RemoteEntry>, FetchError> {
            Ok(self.0.clone())
        }

        async fn fetch_entry(
            &self,
            entry: &RemoteEntry,
            _dest: &std::path::Path,
        ) -> Result<u64, crate::error::FileError> {
            Err(crate::error::FileError::TransferFailed {
                name: entry.name.clone(),
                detail: "not implemented".into(),
            })
        }
    }

    fn entry(name: &str, rel_dir: &str) -> RemoteEntry {
        let remote_path = if rel_dir.is_empty() {
            format!("/Rel-17/{name}")
        } else {
            format!("/Rel-17/{rel_dir}/{name}")
        };
        RemoteEntry {
            name: name.into(),
            rel_dir: rel_dir.into(),
            remote_path,
        }
    }

    #[test]
    fn archive_filter_is_case_insensitive() {
        assert!(is_archive("23003-i00.zip"));
        assert!(is_archive("23003-I00.ZIP"));
        assert!(!is_archive("readme.txt"));
        assert!(!is_archive("zipfile.doc"));
    }

    #[tokio::test]
    async fn listing_filters_and_sorts() {
        let source: Arc<dyn SpecSource> = Arc::new(FixedSource(vec![
            entry("b.zip", "24_series"),
            entry("readme.txt", ""),
            entry("a.zip", "23_series"),
        ]));

        let entries = list_entries(&source, "17").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.zip");
        assert_eq!(entries[1].name, "b.zip");
    }

    #[tokio::test]
    async fn empty_listing_is_not_an_error() {
        let source: Arc<dyn SpecSource> = Arc::new(FixedSource(vec![]));
        let entries = list_entries(&source, "17").await.unwrap();
        assert!(entries.is_empty());
    }
}
