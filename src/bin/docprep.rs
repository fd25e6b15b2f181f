//! CLI binary for docprep.
//!
//! A thin shim over the library crate that maps CLI flags to `FlowConfig`,
//! builds the store client from the environment, and prints the flow report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docprep::{
    extract_layout_to_images, extract_pdfs_to_images, FlowConfig, FlowReport, ObjectStore,
    ProgressHandle, S3ObjectStore, StoreConfig, TransferDirection, TransferProgress,
    EXTRACT_LAYOUT_TO_IMAGES, EXTRACT_PDFS_TO_IMAGES,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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

/// Terminal progress callback: one live bar per transfer batch, reused across
/// the batches a flow runs (download, then one upload per category). Objects
/// complete out-of-order, so the bar tracks counts, not keys.
struct CliTransferProgress {
    bar: ProgressBar,
}

impl CliTransferProgress {
    fn new() -> Arc<Self> {
        // Hidden until the first batch announces its total.
        Arc::new(Self {
            bar: ProgressBar::hidden(),
        })
    }
}

impl TransferProgress for CliTransferProgress {
    fn on_batch_start(&self, direction: TransferDirection, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} objects  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message(String::new());
        self.bar.set_prefix(match direction {
            TransferDirection::Download => "Downloading",
            TransferDirection::Upload => "Uploading",
        });
        self.bar.reset_eta();
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_object_complete(&self, _direction: TransferDirection, key: &str) {
        self.bar.set_message(key.to_string());
        self.bar.inc(1);
    }

    fn on_object_error(&self, _direction: TransferDirection, key: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), key, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, direction: TransferDirection, succeeded: usize, failed: usize) {
        self.bar.finish_and_clear();

        let verb = match direction {
            TransferDirection::Download => "downloaded",
            TransferDirection::Upload => "uploaded",
        };
        if failed == 0 {
            eprintln!(
                "{} {} object(s) {}",
                green("✔"),
                bold(&succeeded.to_string()),
                verb
            );
        } else {
            eprintln!(
                "{} {}/{} object(s) {}  ({} failed)",
                cyan("⚠"),
                bold(&succeeded.to_string()),
                succeeded + failed,
                verb,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rasterise every PDF in the source bucket (config from CONFIG_PATH)
  docprep extract-pdfs

  # Explicit config file, machine-readable report on stdout
  docprep extract-pdfs --config flows.json --json

  # Crop annotated regions into the category buckets
  docprep extract-layout --config flows.json

  # One-off run against different buckets at 150 DPI
  docprep extract-pdfs --source incoming --target page-images --dpi 150

  # First 3 pages of each document only, 10 parallel transfers
  docprep extract-pdfs --max-pages 3 --concurrency 10

CONFIG FILE:
  A JSON document keyed by flow name. The section for the requested flow is
  applied over the built-in defaults, then CLI flags override both:

    {
      "flow": {
        "extract_pdfs_to_images": {
          "source_folder": "raw",
          "target_folder": "utils",
          "dpi": 300
        },
        "extract_layout_to_images": {
          "source_folder": "utils",
          "target_tableformer_folder": "tables",
          "filtered_tableformer_labels": ["table"]
        }
      }
    }

ENVIRONMENT VARIABLES:
  CONFIG_PATH          Path to the JSON config file (same as --config)
  MINIO_HOST           Object-store host; port 9000 is assumed
  APP_HOST             Fallback host when MINIO_HOST is unset
  MINIO_ROOT_USER      Access key (default: minioadmin)
  MINIO_ROOT_PASSWORD  Secret key (default: minioadmin)
  DOCPREP_*            Most flags also read a DOCPREP_-prefixed variable
"#;

/// Prepare document-understanding training data from object storage.
#[derive(Parser, Debug)]
#[command(
    name = "docprep",
    version,
    about = "Turn stored PDFs and annotation exports into labeled training images",
    long_about = "Pulls documents out of S3-compatible object storage, rasterises PDFs into \
per-page JPEGs, cuts labeled regions out of annotated page images, and files every output \
into the bucket its downstream model reads from.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the JSON config file.
    #[arg(long, global = true, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Source bucket, overriding the config file.
    #[arg(long, global = true, env = "DOCPREP_SOURCE")]
    source: Option<String>,

    /// Target bucket for page images, overriding the config file.
    #[arg(long, global = true, env = "DOCPREP_TARGET")]
    target: Option<String>,

    /// Rendering DPI (pages are scaled by dpi/72).
    #[arg(long, global = true, env = "DOCPREP_DPI",
          value_parser = clap::value_parser!(u32).range(1..))]
    dpi: Option<u32>,

    /// Render at most this many pages per document.
    #[arg(long, global = true, env = "DOCPREP_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Number of concurrent transfers.
    #[arg(short, long, global = true, env = "DOCPREP_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Print the flow report as pretty JSON on stdout.
    #[arg(long, global = true, env = "DOCPREP_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "DOCPREP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCPREP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCPREP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rasterise every PDF in the source bucket into per-page JPEGs.
    ExtractPdfs,
    /// Crop annotated regions out of page images and route them by label.
    ExtractLayout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "docprep=debug"
    } else if cli.quiet || show_progress {
        "docprep=error"
    } else {
        "docprep=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build flow config ────────────────────────────────────────────────
    let flow_name = match cli.command {
        Command::ExtractPdfs => EXTRACT_PDFS_TO_IMAGES,
        Command::ExtractLayout => EXTRACT_LAYOUT_TO_IMAGES,
    };

    let progress: Option<ProgressHandle> = if show_progress {
        Some(CliTransferProgress::new() as Arc<dyn TransferProgress>)
    } else {
        None
    };

    let config = build_flow_config(&cli, flow_name, progress)?;

    // ── Build the store client and run ───────────────────────────────────
    // The client is constructed exactly once here and handed to the flow.
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(StoreConfig::from_env()));

    let report = match cli.command {
        Command::ExtractPdfs => extract_pdfs_to_images(&store, &config).await,
        Command::ExtractLayout => extract_layout_to_images(&store, &config).await,
    }
    .with_context(|| format!("Flow '{flow_name}' failed"))?;

    // ── Print the report ─────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_report(&report);
    }

    // Partial failures are recorded on the report, not an error exit.
    Ok(())
}

/// Map CLI args over the config file (when given) to a `FlowConfig`.
fn build_flow_config(
    cli: &Cli,
    flow: &str,
    progress: Option<ProgressHandle>,
) -> Result<FlowConfig> {
    let mut config = match cli.config {
        Some(ref path) => FlowConfig::from_file(path, flow)
            .with_context(|| format!("Failed to load configuration for flow '{flow}'"))?,
        None => FlowConfig::default(),
    };

    if let Some(ref source) = cli.source {
        config.source_folder = source.clone();
    }
    if let Some(ref target) = cli.target {
        config.target_folder = target.clone();
    }
    if let Some(dpi) = cli.dpi {
        config.dpi = dpi;
    }
    if let Some(max_pages) = cli.max_pages {
        config.max_pages = Some(max_pages);
    }
    if let Some(concurrency) = cli.concurrency {
        if concurrency == 0 {
            anyhow::bail!("--concurrency must be at least 1");
        }
        config.concurrency = concurrency;
    }
    config.progress = progress;

    Ok(config)
}

/// Human-readable report summary on stderr.
fn print_report(report: &FlowReport) {
    eprintln!(
        "{}  {}: {} object(s) in, {} file(s) out, {}ms total",
        if report.is_clean() {
            green("✔")
        } else {
            cyan("⚠")
        },
        bold(&report.flow),
        report.objects_downloaded,
        report.objects_uploaded,
        report.total_duration_ms,
    );
    if report.skipped > 0 {
        eprintln!("   {} input(s) skipped", report.skipped);
    }
    for failure in &report.failed_downloads {
        eprintln!(
            "  {} download {}  {}",
            red("✗"),
            failure.key,
            dim(&failure.reason)
        );
    }
    for failure in &report.failed_uploads {
        eprintln!(
            "  {} upload {}  {}",
            red("✗"),
            failure.key,
            dim(&failure.reason)
        );
    }
}
