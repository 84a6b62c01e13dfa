//! End-to-end integration tests for the fetch pipeline.
//!
//! The remote source is stubbed through `FetchConfig::source`, and the
//! conversion service is a wiremock instance answering on Gotenberg's
//! LibreOffice route — no real network is touched, so these run in CI.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tgpp_fetch::{
    fetch_release, list_release, FetchConfig, FetchError, FileError, RemoteEntry, SpecSource,
    Stage,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Build an in-memory zip with the given (name, contents) entries.
fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn entry(name: &str) -> RemoteEntry {
    RemoteEntry {
        name: name.to_string(),
        rel_dir: String::new(),
        remote_path: format!("/Specs/latest/Rel-17/{name}"),
    }
}

/// Stub source: a fixed listing plus per-name payloads. Entries without a
/// payload fail their transfer, which lets tests exercise the
/// continue-on-failure path.
struct StubSource {
    entries: Vec<RemoteEntry>,
    payloads: HashMap<String, Vec<u8>>,
}

#[async_trait]
impl SpecSource for StubSource {
    async fn list_release(&self, _release: &str) -> Result<Vec<RemoteEntry>, FetchError> {
        Ok(self.entries.clone())
    }

    async fn fetch_entry(&self, entry: &RemoteEntry, dest: &Path) -> Result<u64, FileError> {
        let bytes = self
            .payloads
            .get(&entry.name)
            .ok_or_else(|| FileError::TransferFailed {
                name: entry.name.clone(),
                detail: "connection reset by peer".into(),
            })?;
        std::fs::write(dest, bytes).map_err(|e| FileError::LocalIo {
            name: entry.name.clone(),
            detail: e.to_string(),
        })?;
        Ok(bytes.len() as u64)
    }
}

fn config_in(
    workdir: &Path,
    endpoint: &str,
    source: Arc<dyn SpecSource>,
) -> FetchConfig {
    FetchConfig::builder()
        .release("17")
        .endpoint(endpoint)
        .downloads_dir(workdir.join("downloads"))
        .extracted_dir(workdir.join("extracted"))
        .pdfs_dir(workdir.join("pdfs"))
        .source(source)
        .build()
        .expect("valid config")
}

/// A converter that answers 200 with a fixed PDF body.
async fn mock_converter() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/forms/libreoffice/convert"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4\nfake pdf body\n".to_vec()),
        )
        .mount(&server)
        .await;
    server
}

// ── Scenario: one archive, two documents, two PDFs ───────────────────────────

#[tokio::test]
async fn two_entry_archive_yields_two_pdfs() {
    let workdir = tempfile::tempdir().unwrap();
    let server = mock_converter().await;

    let archive = build_zip(&[("ts_123.doc", b"doc one"), ("cover.doc", b"doc two")]);
    let source = Arc::new(StubSource {
        entries: vec![entry("spec1.zip")],
        payloads: HashMap::from([("spec1.zip".to_string(), archive)]),
    });

    let config = config_in(workdir.path(), &server.uri(), source);
    let report = fetch_release(&config).await.expect("run should succeed");

    assert_eq!(report.stats.listed, 1);
    assert_eq!(report.stats.downloaded, 1);
    assert_eq!(report.stats.extracted, 1);
    assert_eq!(report.stats.documents, 2, "both zip members are documents");
    assert_eq!(report.stats.converted, 2);
    assert_eq!(report.stats.failed, 0);

    // Extraction landed under <extracted>/<release>/<archive stem>/.
    let extracted = workdir.path().join("extracted/17/spec1");
    assert!(extracted.join("ts_123.doc").exists());
    assert!(extracted.join("cover.doc").exists());

    // PDFs mirror the extraction tree and are non-empty.
    for doc in ["ts_123.doc", "cover.doc"] {
        let pdf = workdir.path().join(format!("pdfs/17/spec1/{doc}.pdf"));
        assert!(pdf.exists(), "missing {}", pdf.display());
        assert!(std::fs::metadata(&pdf).unwrap().len() > 0);
    }

    // The staged archive is removed once extracted (keep_archives = false).
    assert!(!workdir.path().join("downloads/17/spec1.zip").exists());

    assert!(report.into_result().is_ok());
}

// ── Boundary: empty listing ──────────────────────────────────────────────────

#[tokio::test]
async fn empty_listing_is_a_clean_success() {
    let workdir = tempfile::tempdir().unwrap();
    let server = mock_converter().await;

    let source = Arc::new(StubSource {
        entries: vec![],
        payloads: HashMap::new(),
    });

    let config = config_in(workdir.path(), &server.uri(), source);
    let report = fetch_release(&config).await.expect("run should succeed");

    assert_eq!(report.stats.listed, 0);
    assert!(report.outcomes.is_empty());
    assert!(report.is_complete_success());

    // Working directories exist even when there was nothing to do.
    assert!(workdir.path().join("downloads/17").is_dir());
    assert!(workdir.path().join("pdfs/17").is_dir());
}

// ── Converter failures are collected, not fatal ──────────────────────────────

#[tokio::test]
async fn converter_errors_are_collected_not_fatal() {
    let workdir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/forms/libreoffice/convert"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let archive = build_zip(&[("ts_123.doc", b"doc one")]);
    let source = Arc::new(StubSource {
        entries: vec![entry("spec1.zip")],
        payloads: HashMap::from([("spec1.zip".to_string(), archive)]),
    });

    let config = config_in(workdir.path(), &server.uri(), source);
    let report = fetch_release(&config).await.expect("run itself should succeed");

    assert_eq!(report.stats.converted, 0);
    assert_eq!(report.stats.failed, 1);

    let failure = report.failures().next().expect("one failure");
    assert_eq!(failure.stage, Stage::Convert);
    assert!(matches!(
        failure.error,
        Some(FileError::ConversionFailed { .. })
    ));

    match report.into_result() {
        Err(FetchError::PartialFailure { failed, .. }) => assert_eq!(failed, 1),
        other => panic!("expected PartialFailure, got {other:?}"),
    }
}

// ── Non-document archive members are not converted ───────────────────────────

#[tokio::test]
async fn non_document_members_are_skipped() {
    let workdir = tempfile::tempdir().unwrap();
    let server = mock_converter().await;

    let archive = build_zip(&[("ts_123.doc", b"doc"), ("history.xls", b"not a doc")]);
    let source = Arc::new(StubSource {
        entries: vec![entry("spec1.zip")],
        payloads: HashMap::from([("spec1.zip".to_string(), archive)]),
    });

    let config = config_in(workdir.path(), &server.uri(), source);
    let report = fetch_release(&config).await.unwrap();

    assert_eq!(report.stats.documents, 1, "only the .doc counts");
    assert_eq!(report.stats.converted, 1);
    assert!(workdir
        .path()
        .join("pdfs/17/spec1/ts_123.doc.pdf")
        .exists());
    assert!(!workdir
        .path()
        .join("pdfs/17/spec1/history.xls.pdf")
        .exists());
}

// ── keep_archives retains the staged zip ─────────────────────────────────────

#[tokio::test]
async fn keep_archives_retains_staged_zip() {
    let workdir = tempfile::tempdir().unwrap();
    let server = mock_converter().await;

    let archive = build_zip(&[("ts_123.doc", b"doc")]);
    let source: Arc<dyn SpecSource> = Arc::new(StubSource {
        entries: vec![entry("spec1.zip")],
        payloads: HashMap::from([("spec1.zip".to_string(), archive)]),
    });

    let config = FetchConfig::builder()
        .release("17")
        .endpoint(server.uri())
        .downloads_dir(workdir.path().join("downloads"))
        .extracted_dir(workdir.path().join("extracted"))
        .pdfs_dir(workdir.path().join("pdfs"))
        .keep_archives(true)
        .source(source)
        .build()
        .unwrap();

    let report = fetch_release(&config).await.unwrap();
    assert_eq!(report.stats.converted, 1);
    assert!(workdir.path().join("downloads/17/spec1.zip").exists());
}

// ── A failed download does not block the other files ─────────────────────────

#[tokio::test]
async fn failed_download_does_not_block_others() {
    let workdir = tempfile::tempdir().unwrap();
    let server = mock_converter().await;

    let good = build_zip(&[("ts_123.doc", b"doc")]);
    let source = Arc::new(StubSource {
        // "missing.zip" has no payload, so its transfer fails.
        entries: vec![entry("missing.zip"), entry("spec1.zip")],
        payloads: HashMap::from([("spec1.zip".to_string(), good)]),
    });

    let config = config_in(workdir.path(), &server.uri(), source);
    let report = fetch_release(&config).await.unwrap();

    assert_eq!(report.stats.listed, 2);
    assert_eq!(report.stats.downloaded, 1);
    assert_eq!(report.stats.converted, 1, "the good archive still converts");
    assert_eq!(report.stats.failed, 1);

    let failure = report.failures().next().unwrap();
    assert_eq!(failure.stage, Stage::Download);
    assert_eq!(failure.name, "missing.zip");
}

// ── Corrupt archives surface at the extract stage ────────────────────────────

#[tokio::test]
async fn corrupt_archive_fails_extract_stage_only() {
    let workdir = tempfile::tempdir().unwrap();
    let server = mock_converter().await;

    let source = Arc::new(StubSource {
        entries: vec![entry("bad.zip")],
        payloads: HashMap::from([("bad.zip".to_string(), b"not a zip at all".to_vec())]),
    });

    let config = config_in(workdir.path(), &server.uri(), source);
    let report = fetch_release(&config).await.unwrap();

    assert_eq!(report.stats.downloaded, 1, "the transfer itself succeeded");
    assert_eq!(report.stats.extracted, 0);
    assert_eq!(report.stats.failed, 1);

    let failure = report.failures().next().unwrap();
    assert_eq!(failure.stage, Stage::Extract);
    assert!(matches!(
        failure.error,
        Some(FileError::CorruptArchive { .. })
    ));
}

// ── Retries: a transient converter error recovers with max_retries ───────────

#[tokio::test]
async fn transient_converter_error_recovers_with_retry() {
    let workdir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;

    // First request fails, every later one succeeds.
    Mock::given(method("POST"))
        .and(path("/forms/libreoffice/convert"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/forms/libreoffice/convert"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4\nfake pdf body\n".to_vec()),
        )
        .mount(&server)
        .await;

    let archive = build_zip(&[("ts_123.doc", b"doc")]);
    let source: Arc<dyn SpecSource> = Arc::new(StubSource {
        entries: vec![entry("spec1.zip")],
        payloads: HashMap::from([("spec1.zip".to_string(), archive)]),
    });

    let config = FetchConfig::builder()
        .release("17")
        .endpoint(server.uri())
        .downloads_dir(workdir.path().join("downloads"))
        .extracted_dir(workdir.path().join("extracted"))
        .pdfs_dir(workdir.path().join("pdfs"))
        .max_retries(1)
        .retry_backoff_ms(10)
        .source(source)
        .build()
        .unwrap();

    let report = fetch_release(&config).await.unwrap();
    assert_eq!(report.stats.converted, 1);
    assert_eq!(report.stats.failed, 0);
}

// ── Listing-only entry point ─────────────────────────────────────────────────

#[tokio::test]
async fn list_release_filters_and_orders_without_an_endpoint() {
    let source: Arc<dyn SpecSource> = Arc::new(StubSource {
        entries: vec![entry("b.zip"), entry("status.txt"), entry("a.zip")],
        payloads: HashMap::new(),
    });

    // No endpoint configured: listing must still work.
    let config = FetchConfig::builder()
        .release("17")
        .source(source)
        .build()
        .unwrap();

    let entries = list_release(&config).await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.zip", "b.zip"]);
}

// ── Idempotence: re-running stages on the same inputs is stable ──────────────

#[tokio::test]
async fn rerunning_the_pipeline_overwrites_cleanly() {
    let workdir = tempfile::tempdir().unwrap();
    let server = mock_converter().await;

    let archive = build_zip(&[("ts_123.doc", b"doc one")]);
    let source: Arc<dyn SpecSource> = Arc::new(StubSource {
        entries: vec![entry("spec1.zip")],
        payloads: HashMap::from([("spec1.zip".to_string(), archive)]),
    });

    let config = config_in(workdir.path(), &server.uri(), Arc::clone(&source));
    let pdf = workdir.path().join("pdfs/17/spec1/ts_123.doc.pdf");

    let first = fetch_release(&config).await.unwrap();
    let first_len = std::fs::metadata(&pdf).unwrap().len();
    assert!(first_len > 0);

    let second = fetch_release(&config).await.unwrap();
    let second_len = std::fs::metadata(&pdf).unwrap().len();

    assert_eq!(first.stats.converted, second.stats.converted);
    assert_eq!(first_len, second_len, "re-run must overwrite, not corrupt");
}
