//! CLI binary for tgpp-fetch.
//!
//! A thin shim over the library crate that maps CLI flags to `FetchConfig`
//! and prints the run report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tgpp_fetch::{
    fetch_release, list_release, FetchConfig, FetchProgressCallback, FetchReport, FetchStats,
    ProgressCallback, Stage,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar that is re-armed at the start of
/// every stage, plus per-file log lines above it.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn stage_prefix(stage: Stage) -> &'static str {
        match stage {
            Stage::Download => "Downloading",
            Stage::Extract => "Extracting",
            Stage::Convert => "Converting",
        }
    }
}

impl FetchProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(Self::stage_prefix(stage));
        self.bar.set_message("");
    }

    fn on_file_start(&self, _stage: Stage, name: &str, _index: usize, _total: usize) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, stage: Stage, name: &str, bytes: u64) {
        let detail = match stage {
            Stage::Extract => format!("{bytes:>5} files"),
            _ => format!("{bytes:>9} B"),
        };
        self.bar.println(format!(
            "  {} {:<10} {:<40}  {}",
            green("✓"),
            dim(&stage.to_string()),
            name,
            dim(&detail),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, stage: Stage, name: &str, error: String) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let first_line = error.lines().next().unwrap_or("");
        let msg = if first_line.len() > 80 {
            format!("{}\u{2026}", &first_line[..79])
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {:<10} {:<40}  {}",
            red("✗"),
            dim(&stage.to_string()),
            name,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_fetch_complete(&self, stats: &FetchStats) {
        self.bar.finish_and_clear();

        if stats.failed == 0 {
            eprintln!(
                "{} {} PDF(s) written from {} archive(s)",
                green("✔"),
                bold(&stats.converted.to_string()),
                stats.listed,
            );
        } else {
            eprintln!(
                "{} {} PDF(s) written, {} failure(s) across {} archive(s)",
                if stats.converted == 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&stats.converted.to_string()),
                red(&stats.failed.to_string()),
                stats.listed,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Fetch release 17 and convert everything through a local Gotenberg
  tgpp-fetch 17 --endpoint http://localhost:3000

  # See what release 18 contains without downloading anything
  tgpp-fetch 18 --list-only

  # Keep the staged zip archives around after extraction
  tgpp-fetch 17 -e http://localhost:3000 --keep-archives

  # Machine-readable run report
  tgpp-fetch 17 -e http://localhost:3000 --json > report.json

  # Slow converter: give each document more time plus one retry
  tgpp-fetch 17 -e http://gotenberg:3000 --convert-timeout 180 --max-retries 1

WORKING DIRECTORIES:
  downloads/<release>/   staged zip archives (removed unless --keep-archives)
  extracted/<release>/   unzipped documents
  pdfs/<release>/        converted output, mirroring the server tree

ENVIRONMENT VARIABLES:
  GOTENBERG_ENDPOINT     Conversion service base URL (same as --endpoint)
  TGPP_FTP_HOST          FTP mirror host (same as --ftp-host)
  TGPP_REMOTE_ROOT       Remote directory holding the Rel-<n> folders

EXIT STATUS:
  0  every file was fetched, extracted, and converted
  1  the run finished but at least one file failed, or a fatal error occurred

SETUP:
  1. Start Gotenberg:   docker run --rm -p 3000:3000 gotenberg/gotenberg:8
  2. Fetch a release:   tgpp-fetch 17 --endpoint http://localhost:3000
"#;

/// Fetch 3GPP specification archives and convert them to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "tgpp-fetch",
    version,
    about = "Fetch 3GPP specification archives over FTP and convert them to PDF",
    long_about = "Fetch the specification archives of a 3GPP release from the public FTP \
mirror, unzip them, and convert each document to PDF through a hosted Gotenberg instance. \
Per-file failures are reported at the end instead of aborting the run.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// 3GPP release identifier, e.g. 17.
    release: String,

    /// Base URL of the Gotenberg conversion service.
    #[arg(
        short,
        long,
        env = "GOTENBERG_ENDPOINT",
        required_unless_present = "list_only"
    )]
    endpoint: Option<String>,

    /// FTP mirror host.
    #[arg(long, env = "TGPP_FTP_HOST", default_value = "www.3gpp.org")]
    ftp_host: String,

    /// FTP control port.
    #[arg(long, env = "TGPP_FTP_PORT", default_value_t = 21)]
    ftp_port: u16,

    /// Remote directory holding the per-release folders.
    #[arg(long, env = "TGPP_REMOTE_ROOT", default_value = "/Specs/latest")]
    remote_root: String,

    /// Staging directory for downloaded archives.
    #[arg(long, env = "TGPP_DOWNLOADS_DIR", default_value = "downloads")]
    downloads_dir: PathBuf,

    /// Directory for unzipped documents.
    #[arg(long, env = "TGPP_EXTRACTED_DIR", default_value = "extracted")]
    extracted_dir: PathBuf,

    /// Output directory for converted PDFs.
    #[arg(long, env = "TGPP_PDFS_DIR", default_value = "pdfs")]
    pdfs_dir: PathBuf,

    /// FTP connect timeout in seconds.
    #[arg(long, env = "TGPP_CONNECT_TIMEOUT", default_value_t = 30)]
    connect_timeout: u64,

    /// Per-document conversion timeout in seconds.
    #[arg(long, env = "TGPP_CONVERT_TIMEOUT", default_value_t = 60)]
    convert_timeout: u64,

    /// Extra conversion attempts after a failure (0 = single attempt).
    #[arg(long, env = "TGPP_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Keep staged zip archives after successful extraction.
    #[arg(long, env = "TGPP_KEEP_ARCHIVES")]
    keep_archives: bool,

    /// List the release's archives and exit without downloading.
    #[arg(long)]
    list_only: bool,

    /// Output the run report as JSON instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "TGPP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TGPP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TGPP_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn FetchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).context("Invalid configuration")?;

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_only {
        let entries = list_release(&config)
            .await
            .context("Failed to list the release")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).context("Failed to serialise listing")?
            );
        } else {
            for entry in &entries {
                println!("{}", entry.remote_path);
            }
            if !cli.quiet {
                eprintln!(
                    "{} archive(s) available for release {}",
                    entries.len(),
                    cli.release
                );
            }
        }
        return Ok(());
    }

    // ── Run the pipeline ─────────────────────────────────────────────────
    let report = fetch_release(&config).await.context("Fetch failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet && !show_progress {
        // The progress callback already printed the summary otherwise.
        print_summary(&report);
    }

    // Nonzero exit when any file failed, so scripts can tell a clean run
    // from a partial one.
    if !report.is_complete_success() {
        if !cli.quiet && !cli.json {
            for failure in report.failures() {
                eprintln!(
                    "  {} [{}] {}",
                    red("✗"),
                    failure.stage,
                    failure
                        .error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_default()
                );
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Map CLI args to `FetchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<FetchConfig> {
    let mut builder = FetchConfig::builder()
        .release(&cli.release)
        .ftp_host(&cli.ftp_host)
        .ftp_port(cli.ftp_port)
        .remote_root(&cli.remote_root)
        .downloads_dir(&cli.downloads_dir)
        .extracted_dir(&cli.extracted_dir)
        .pdfs_dir(&cli.pdfs_dir)
        .connect_timeout_secs(cli.connect_timeout)
        .convert_timeout_secs(cli.convert_timeout)
        .max_retries(cli.max_retries)
        .keep_archives(cli.keep_archives);

    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    Ok(builder.build()?)
}

/// Plain-text summary for runs without the progress callback.
fn print_summary(report: &FetchReport) {
    let s = &report.stats;
    eprintln!(
        "Release {}: {}/{} archives staged, {} extracted, {}/{} documents converted in {}ms",
        report.release, s.downloaded, s.listed, s.extracted, s.converted, s.documents,
        s.total_duration_ms
    );
    if s.failed > 0 {
        eprintln!("  {} file(s) failed", s.failed);
    }
}
