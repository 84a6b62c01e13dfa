//! Remote specification sources: the listing/transfer seam of the pipeline.
//!
//! [`SpecSource`] abstracts the two remote operations the pipeline needs —
//! "list a release" and "fetch one entry" — behind an object-safe trait.
//! Production runs use [`FtpSource`] against the public 3GPP mirror; tests
//! inject a stub through [`crate::config::FetchConfig::source`] and drive
//! the whole pipeline without a network.
//!
//! ## Why `spawn_blocking`?
//!
//! The FTP client is a synchronous, blocking library. Every session runs
//! inside `tokio::task::spawn_blocking` so the async executor's worker
//! threads never stall on a slow control-channel round-trip. Each operation
//! acquires its own session and always closes it, whether the operation
//! succeeds or fails.

use crate::config::FetchConfig;
use crate::error::{FetchError, FileError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, info, warn};

/// One file discovered on the remote server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Bare filename, e.g. `23003-i00.zip`.
    pub name: String,

    /// Directory of the entry relative to the release root (empty for
    /// entries directly under the release root). Preserved through every
    /// later stage so the local tree mirrors the server tree.
    pub rel_dir: String,

    /// Full remote path used to retrieve the file.
    pub remote_path: String,
}

impl RemoteEntry {
    /// Where this entry lands relative to a local staging root.
    pub fn local_rel_path(&self) -> PathBuf {
        if self.rel_dir.is_empty() {
            PathBuf::from(&self.name)
        } else {
            Path::new(&self.rel_dir).join(&self.name)
        }
    }
}

/// A remote source of specification archives.
///
/// Implementations must be `Send + Sync`; the pipeline holds them behind an
/// `Arc<dyn SpecSource>`.
#[async_trait]
pub trait SpecSource: Send + Sync {
    /// List every archive file available for `release`, in server order.
    ///
    /// # Errors
    /// - [`FetchError::ReleaseNotFound`] if the release path is absent
    /// - [`FetchError::ConnectionFailed`] on network failure
    async fn list_release(&self, release: &str) -> Result<Vec<RemoteEntry>, FetchError>;

    /// Download one entry's bytes to `dest`, returning the byte count.
    ///
    /// Overwrites an existing file at `dest`. The connection is acquired
    /// for this transfer only and released on both the success and the
    /// failure path.
    async fn fetch_entry(&self, entry: &RemoteEntry, dest: &Path) -> Result<u64, FileError>;
}

/// [`SpecSource`] implementation speaking anonymous FTP.
#[derive(Debug, Clone)]
pub struct FtpSource {
    host: String,
    port: u16,
    remote_root: String,
    connect_timeout: Duration,
}

impl FtpSource {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        remote_root: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            remote_root: remote_root.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.ftp_host.clone(),
            config.ftp_port,
            config.remote_root.clone(),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    /// Remote directory holding the archives of one release,
    /// e.g. `/Specs/latest/Rel-17`.
    pub fn release_path(&self, release: &str) -> String {
        format!("{}/Rel-{}", self.remote_root.trim_end_matches('/'), release)
    }

    /// Open a session: resolve, connect with timeout, anonymous login,
    /// binary transfer type.
    fn open_session(&self) -> Result<FtpStream, FetchError> {
        let connect_err = |reason: String| FetchError::ConnectionFailed {
            host: self.host.clone(),
            reason,
        };

        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("hostname did not resolve".into()))?;

        let mut ftp = FtpStream::connect_timeout(addr, self.connect_timeout)
            .map_err(|e| connect_err(e.to_string()))?;
        ftp.login("anonymous", "")
            .map_err(|e| connect_err(format!("anonymous login rejected: {e}")))?;
        ftp.transfer_type(FileType::Binary)
            .map_err(|e| connect_err(e.to_string()))?;

        debug!("FTP session established with {}:{}", self.host, self.port);
        Ok(ftp)
    }

    /// Blocking recursive walk of the release directory.
    ///
    /// Directories are recognised with a CWD probe: `CWD <item>` succeeds
    /// for directories and fails with a permanent error for plain files.
    /// The mirror nests archives one level deep per series, but the walk
    /// handles arbitrary depth.
    fn walk_blocking(
        ftp: &mut FtpStream,
        release_path: &str,
        rel_dir: &str,
        entries: &mut Vec<RemoteEntry>,
    ) -> Result<(), FtpError> {
        let names = ftp.nlst(None)?;
        for name in names {
            if name == "." || name == ".." {
                continue;
            }
            match ftp.cwd(&name) {
                Ok(()) => {
                    let child = if rel_dir.is_empty() {
                        name.clone()
                    } else {
                        format!("{rel_dir}/{name}")
                    };
                    Self::walk_blocking(ftp, release_path, &child, entries)?;
                    ftp.cdup()?;
                }
                Err(FtpError::UnexpectedResponse(_)) => {
                    let remote_path = if rel_dir.is_empty() {
                        format!("{release_path}/{name}")
                    } else {
                        format!("{release_path}/{rel_dir}/{name}")
                    };
                    entries.push(RemoteEntry {
                        name,
                        rel_dir: rel_dir.to_string(),
                        remote_path,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn list_blocking(&self, release: &str) -> Result<Vec<RemoteEntry>, FetchError> {
        let release_path = self.release_path(release);
        let mut ftp = self.open_session()?;

        let result = (|| {
            match ftp.cwd(&release_path) {
                Ok(()) => {}
                // Permanent 5xx on CWD means the directory does not exist.
                Err(FtpError::UnexpectedResponse(_)) => {
                    return Err(FetchError::ReleaseNotFound {
                        release: release.to_string(),
                        path: release_path.clone(),
                    });
                }
                Err(e) => {
                    return Err(FetchError::ConnectionFailed {
                        host: self.host.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            let mut entries = Vec::new();
            Self::walk_blocking(&mut ftp, &release_path, "", &mut entries).map_err(|e| {
                FetchError::ConnectionFailed {
                    host: self.host.clone(),
                    reason: format!("listing '{release_path}' failed: {e}"),
                }
            })?;
            Ok(entries)
        })();

        // Close the session on both paths; a failed QUIT is not an error.
        if let Err(e) = ftp.quit() {
            warn!("FTP QUIT failed: {e}");
        }
        result
    }

    fn fetch_blocking(&self, entry: &RemoteEntry, dest: &Path) -> Result<u64, FileError> {
        let transfer_err = |detail: String| FileError::TransferFailed {
            name: entry.name.clone(),
            detail,
        };

        let mut ftp = self
            .open_session()
            .map_err(|e| transfer_err(e.to_string()))?;

        let result = (|| {
            let buffer = ftp
                .retr_as_buffer(&entry.remote_path)
                .map_err(|e| transfer_err(e.to_string()))?;
            let bytes = buffer.into_inner();

            std::fs::write(dest, &bytes).map_err(|e| FileError::LocalIo {
                name: entry.name.clone(),
                detail: format!("writing '{}': {e}", dest.display()),
            })?;

            debug!(
                "Retrieved {} ({} bytes) -> {}",
                entry.remote_path,
                bytes.len(),
                dest.display()
            );
            Ok(bytes.len() as u64)
        })();

        if let Err(e) = ftp.quit() {
            warn!("FTP QUIT failed: {e}");
        }
        result
    }
}

#[async_trait]
impl SpecSource for FtpSource {
    async fn list_release(&self, release: &str) -> Result<Vec<RemoteEntry>, FetchError> {
        let source = self.clone();
        let release = release.to_string();

        info!(
            "Listing release {} on {} ({})",
            release,
            source.host,
            source.release_path(&release)
        );

        tokio::task::spawn_blocking(move || source.list_blocking(&release))
            .await
            .map_err(|e| FetchError::Internal(format!("listing task panicked: {e}")))?
    }

    async fn fetch_entry(&self, entry: &RemoteEntry, dest: &Path) -> Result<u64, FileError> {
        let source = self.clone();
        let name = entry.name.clone();
        let entry = entry.clone();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || source.fetch_blocking(&entry, &dest))
            .await
            .map_err(|e| FileError::TransferFailed {
                name,
                detail: format!("transfer task panicked: {e}"),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_rel_path_flat_entry() {
        let entry = RemoteEntry {
            name: "23003-i00.zip".into(),
            rel_dir: String::new(),
            remote_path: "/Specs/latest/Rel-17/23003-i00.zip".into(),
        };
        assert_eq!(entry.local_rel_path(), PathBuf::from("23003-i00.zip"));
    }

    #[test]
    fn local_rel_path_nested_entry() {
        let entry = RemoteEntry {
            name: "23003-i00.zip".into(),
            rel_dir: "23_series".into(),
            remote_path: "/Specs/latest/Rel-17/23_series/23003-i00.zip".into(),
        };
        assert_eq!(
            entry.local_rel_path(),
            PathBuf::from("23_series/23003-i00.zip")
        );
    }

    #[test]
    fn release_path_joins_root_and_release() {
        let source = FtpSource::new("www.3gpp.org", 21, "/Specs/latest", Duration::from_secs(5));
        assert_eq!(source.release_path("17"), "/Specs/latest/Rel-17");
    }

    #[test]
    fn release_path_tolerates_trailing_slash() {
        let source = FtpSource::new("www.3gpp.org", 21, "/Specs/latest/", Duration::from_secs(5));
        assert_eq!(source.release_path("18"), "/Specs/latest/Rel-18");
    }

    #[test]
    fn remote_entry_serialises_round_trip() {
        let entry = RemoteEntry {
            name: "a.zip".into(),
            rel_dir: "s".into(),
            remote_path: "/r/s/a.zip".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: RemoteEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
