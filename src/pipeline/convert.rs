//! Document conversion: POST extracted documents to the hosted converter.
//!
//! The converter is a Gotenberg instance: its LibreOffice route accepts a
//! multipart form with the document under the `files` field and answers
//! with raw PDF bytes. This module is intentionally thin — one request per
//! document, the response body written straight to the output tree.
//!
//! ## Retry Strategy
//!
//! The baseline contract is a single attempt per document. When the caller
//! opts into retries, transient failures back off exponentially
//! (`retry_backoff_ms * 2^attempt`): with 500 ms base and 2 retries the
//! wait sequence is 500 ms → 1 s, bounding the added latency per document.

use crate::config::FetchConfig;
use crate::error::{FetchError, FileError};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Gotenberg's LibreOffice conversion route.
pub const CONVERT_ROUTE: &str = "/forms/libreoffice/convert";

/// HTTP client for the conversion service.
#[derive(Debug)]
pub struct ConverterClient {
    http: reqwest::Client,
    convert_url: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl ConverterClient {
    /// Build a client from the run configuration.
    ///
    /// # Errors
    /// [`FetchError::InvalidConfig`] if no endpoint is configured.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            FetchError::InvalidConfig(
                "A conversion endpoint is required (set --endpoint or FetchConfig::endpoint)"
                    .into(),
            )
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.convert_timeout_secs))
            .build()
            .map_err(|e| FetchError::Internal(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            convert_url: format!("{}{}", endpoint.trim_end_matches('/'), CONVERT_ROUTE),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    /// Convert one document and write the PDF to `pdf_path`.
    ///
    /// The PDF is written atomically (temp file + rename) so a crashed run
    /// never leaves a truncated PDF that looks like a finished artifact.
    /// Returns the PDF byte count.
    pub async fn convert_document(&self, doc: &Path, pdf_path: &Path) -> Result<u64, FileError> {
        let name = file_name(doc);

        let payload = tokio::fs::read(doc).await.map_err(|e| FileError::LocalIo {
            name: name.clone(),
            detail: format!("reading document: {e}"),
        })?;

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    name, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.post_document(&name, payload.clone()).await {
                Ok(pdf_bytes) => {
                    let written = write_pdf(&name, pdf_path, &pdf_bytes).await?;
                    debug!("{}: converted, {} PDF bytes", name, written);
                    return Ok(written);
                }
                Err(detail) => {
                    warn!("{}: attempt {} failed — {}", name, attempt + 1, detail);
                    last_err = Some(detail);
                }
            }
        }

        Err(FileError::ConversionFailed {
            name,
            attempts: self.max_retries + 1,
            detail: last_err.unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// One POST to the converter; returns the PDF bytes on 2xx.
    async fn post_document(&self, name: &str, payload: Vec<u8>) -> Result<Vec<u8>, String> {
        let part = reqwest::multipart::Part::bytes(payload)
            .file_name(name.to_string())
            .mime_str(content_type_for(name))
            .map_err(|e| e.to_string())?;
        let form = reqwest::multipart::Form::new().part("files", part);

        let response = self
            .http
            .post(&self.convert_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        if bytes.is_empty() {
            return Err("empty response body".to_string());
        }
        Ok(bytes.to_vec())
    }
}

/// Whether an extracted file should be submitted for conversion.
///
/// 3GPP archives carry the specification as `.doc`/`.docx`; anything else
/// in the archive (change histories, cover sheets) is left alone.
pub fn is_convertible(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_lowercase();
            ext == "doc" || ext == "docx"
        }
        None => false,
    }
}

/// Output filename for a converted document: the full document filename
/// with `.pdf` appended, so `23003-i00.doc` becomes `23003-i00.doc.pdf`
/// and the source format stays visible in the output tree.
pub fn pdf_name(doc: &Path) -> String {
    format!("{}.pdf", file_name(doc))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn content_type_for(name: &str) -> &'static str {
    if name.to_lowercase().ends_with(".docx") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else {
        "application/msword"
    }
}

async fn write_pdf(name: &str, pdf_path: &Path, bytes: &[u8]) -> Result<u64, FileError> {
    let io_err = |detail: String| FileError::LocalIo {
        name: name.to_string(),
        detail,
    };

    if let Some(parent) = pdf_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err(format!("creating '{}': {e}", parent.display())))?;
    }

    let tmp_path = pdf_path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| io_err(format!("writing '{}': {e}", tmp_path.display())))?;
    tokio::fs::rename(&tmp_path, pdf_path)
        .await
        .map_err(|e| io_err(format!("renaming to '{}': {e}", pdf_path.display())))?;

    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn convertible_extensions() {
        assert!(is_convertible(Path::new("23003-i00.doc")));
        assert!(is_convertible(Path::new("23003-i00.DOC")));
        assert!(is_convertible(Path::new("annex.docx")));
        assert!(!is_convertible(Path::new("history.xls")));
        assert!(!is_convertible(Path::new("README")));
    }

    #[test]
    fn pdf_name_appends_extension() {
        assert_eq!(pdf_name(Path::new("a/b/23003-i00.doc")), "23003-i00.doc.pdf");
    }

    #[test]
    fn content_type_distinguishes_docx() {
        assert_eq!(content_type_for("spec.doc"), "application/msword");
        assert_eq!(
            content_type_for("spec.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
    }

    #[test]
    fn client_requires_an_endpoint() {
        let config = FetchConfig::builder().release("17").build().unwrap();
        let err = ConverterClient::new(&config).unwrap_err();
        assert!(matches!(err, FetchError::InvalidConfig(_)));
    }

    #[test]
    fn convert_url_normalises_trailing_slash() {
        let config = FetchConfig::builder()
            .release("17")
            .endpoint("http://localhost:3000/")
            .build()
            .unwrap();
        let client = ConverterClient::new(&config).unwrap();
        assert_eq!(
            client.convert_url,
            "http://localhost:3000/forms/libreoffice/convert"
        );
    }

    #[tokio::test]
    async fn missing_document_is_local_io() {
        let config = FetchConfig::builder()
            .release("17")
            .endpoint("http://localhost:3000")
            .build()
            .unwrap();
        let client = ConverterClient::new(&config).unwrap();

        let err = client
            .convert_document(
                &PathBuf::from("/definitely/not/a/real/doc.doc"),
                &PathBuf::from("/tmp/out.pdf"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::LocalIo { .. }));
    }
}
