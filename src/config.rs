//! Configuration types for a fetch run.
//!
//! All pipeline behaviour is controlled through [`FetchConfig`], built via
//! its [`FetchConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a run's settings across the stages, serialise them for
//! logging, and diff two runs to understand why their outputs differ. The
//! working-directory locations in particular are process-wide values that
//! every stage reads from here rather than from module globals.

use crate::error::FetchError;
use crate::progress::FetchProgressCallback;
use crate::source::SpecSource;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one pipeline run.
///
/// Built via [`FetchConfig::builder()`].
///
/// # Example
/// ```rust
/// use tgpp_fetch::FetchConfig;
///
/// let config = FetchConfig::builder()
///     .release("17")
///     .endpoint("http://localhost:3000")
///     .keep_archives(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct FetchConfig {
    /// 3GPP release identifier, e.g. `"17"`. Required.
    pub release: String,

    /// Base URL of the Gotenberg conversion service,
    /// e.g. `http://localhost:3000`. Required for conversion runs;
    /// listing-only callers may leave it unset.
    pub endpoint: Option<String>,

    /// FTP host serving the specification mirror. Default: `www.3gpp.org`.
    pub ftp_host: String,

    /// FTP control port. Default: 21.
    pub ftp_port: u16,

    /// Remote directory holding the per-release folders
    /// (`<remote_root>/Rel-<release>`). Default: `/Specs/latest`.
    pub remote_root: String,

    /// Staging directory for downloaded archives. Default: `downloads`.
    pub downloads_dir: PathBuf,

    /// Directory for unzipped documents. Default: `extracted`.
    pub extracted_dir: PathBuf,

    /// Output directory for converted PDFs. Default: `pdfs`.
    pub pdfs_dir: PathBuf,

    /// FTP connect timeout in seconds. Default: 30.
    pub connect_timeout_secs: u64,

    /// Per-document conversion request timeout in seconds. Default: 60.
    ///
    /// Large specification documents can take the converter tens of seconds
    /// to render; 60 covers the slow tail while still bounding a hung
    /// service.
    pub convert_timeout_secs: u64,

    /// Extra conversion attempts after a failure. Default: 0.
    ///
    /// The baseline contract is a single attempt per document. Retries are
    /// an opt-in extension with exponential backoff
    /// (`retry_backoff_ms * 2^attempt`).
    pub max_retries: u32,

    /// Initial retry delay in milliseconds. Default: 500.
    pub retry_backoff_ms: u64,

    /// Keep staged archives after successful extraction. Default: false.
    pub keep_archives: bool,

    /// Pre-constructed remote source. Overrides the FTP source; used to
    /// inject stubs in tests.
    pub source: Option<Arc<dyn SpecSource>>,

    /// Progress callback driven by the orchestrator.
    pub progress_callback: Option<Arc<dyn FetchProgressCallback>>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            release: String::new(),
            endpoint: None,
            ftp_host: "www.3gpp.org".to_string(),
            ftp_port: 21,
            remote_root: "/Specs/latest".to_string(),
            downloads_dir: PathBuf::from("downloads"),
            extracted_dir: PathBuf::from("extracted"),
            pdfs_dir: PathBuf::from("pdfs"),
            connect_timeout_secs: 30,
            convert_timeout_secs: 60,
            max_retries: 0,
            retry_backoff_ms: 500,
            keep_archives: false,
            source: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("release", &self.release)
            .field("endpoint", &self.endpoint)
            .field("ftp_host", &self.ftp_host)
            .field("ftp_port", &self.ftp_port)
            .field("remote_root", &self.remote_root)
            .field("downloads_dir", &self.downloads_dir)
            .field("extracted_dir", &self.extracted_dir)
            .field("pdfs_dir", &self.pdfs_dir)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("convert_timeout_secs", &self.convert_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("keep_archives", &self.keep_archives)
            .field("source", &self.source.as_ref().map(|_| "<dyn SpecSource>"))
            .finish()
    }
}

impl FetchConfig {
    /// Create a new builder for `FetchConfig`.
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`FetchConfig`].
#[derive(Debug)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.config.release = release.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    pub fn ftp_host(mut self, host: impl Into<String>) -> Self {
        self.config.ftp_host = host.into();
        self
    }

    pub fn ftp_port(mut self, port: u16) -> Self {
        self.config.ftp_port = port;
        self
    }

    pub fn remote_root(mut self, root: impl Into<String>) -> Self {
        self.config.remote_root = root.into();
        self
    }

    pub fn downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.downloads_dir = dir.into();
        self
    }

    pub fn extracted_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.extracted_dir = dir.into();
        self
    }

    pub fn pdfs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfs_dir = dir.into();
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs.max(1);
        self
    }

    pub fn convert_timeout_secs(mut self, secs: u64) -> Self {
        self.config.convert_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn keep_archives(mut self, v: bool) -> Self {
        self.config.keep_archives = v;
        self
    }

    pub fn source(mut self, source: Arc<dyn SpecSource>) -> Self {
        self.config.source = Some(source);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn FetchProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FetchConfig, FetchError> {
        let c = &self.config;
        if c.release.trim().is_empty() {
            return Err(FetchError::InvalidConfig(
                "A release identifier is required (e.g. \"17\")".into(),
            ));
        }
        if c.ftp_host.trim().is_empty() {
            return Err(FetchError::InvalidConfig("FTP host must not be empty".into()));
        }
        if let Some(ref endpoint) = c.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(FetchError::InvalidConfig(format!(
                    "Endpoint must be an HTTP/HTTPS URL, got '{endpoint}'"
                )));
            }
        }
        Ok(self.config)
    }
}
