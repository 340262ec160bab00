//! CLI binary for ebd-toolchain.
//!
//! A thin shim over the library crate that maps CLI flags to `Settings` and
//! `RunConfig`, shows per-EBD progress and prints the error summary.

use anyhow::{Context, Result};
use clap::Parser;
use ebd_toolchain::{
    scrape_and_graph, EbdDescriptor, ExportType, ProcessingProgressCallback, ProgressCallback,
    RunConfig, Settings, Severity, StageFailure,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback ────────────────────────────────────────────────────

/// Prints one line per EBD, one coloured line per classified failure, and,
/// unless disabled, keeps an [indicatif] bar over the EBD count at the bottom
/// of the terminal.
struct CliProgressCallback {
    bar: Option<ProgressBar>,
}

impl CliProgressCallback {
    fn new(show_bar: bool) -> Arc<Self> {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} EBDs  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
            bar.set_style(style);
            bar.set_prefix("Scraping");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Arc::new(Self { bar })
    }

    fn println(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl ProcessingProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_ebds: usize) {
        if let Some(bar) = &self.bar {
            bar.set_length(total_ebds as u64);
        }
        self.println(bold(&format!("Found {total_ebds} EBDs")));
    }

    fn on_ebd_start(&self, index: usize, _total: usize, ebd: &EbdDescriptor) {
        if let Some(bar) = &self.bar {
            bar.set_position(index.saturating_sub(1) as u64);
            bar.set_message(ebd.key.clone());
        }
        self.println(format!("{} ({})", ebd.key, ebd.title));
    }

    fn on_artifact_written(&self, _ebd_key: &str, export_type: ExportType, path: &Path) {
        self.println(format!(
            "  {} {:<4}  {}",
            green("✓"),
            export_type,
            dim(&path.display().to_string())
        ));
    }

    fn on_stage_failure(&self, ebd_key: &str, failure: &StageFailure) {
        let line = format!("  Error while processing {ebd_key}: {failure}");
        match failure.severity() {
            Severity::Critical => self.println(red(&line)),
            Severity::Advisory => self.println(yellow(&line)),
        }
    }

    fn on_run_complete(&self, processed: usize, failures: usize) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
        if failures == 0 {
            eprintln!("{} {} EBDs processed", green("✔"), bold(&processed.to_string()));
        } else {
            eprintln!(
                "{} {} EBDs processed  ({} failures)",
                yellow("⚠"),
                bold(&processed.to_string()),
                red(&failures.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Check which EBDs convert, write nothing
  scrape-and-graph -i ebd.docx

  # Everything, into a versioned directory
  scrape-and-graph -i ebd.docx -o machine-readable/FV2504 -t json -t dot -t svg -t puml

  # JSON only, no progress bar (CI logs)
  scrape-and-graph -i ebd.docx -t json --no-progress

ENVIRONMENT VARIABLES:
  KROKI_HOST   Host of the Kroki rendering service (required)
  KROKI_PORT   Port of the Kroki rendering service (required)
  RUST_LOG     Override the log filter (e.g. ebd_toolchain=debug)

  Both Kroki values may also come from a .env file or ebd_toolchain.toml:
    kroki_host = "localhost"
    kroki_port = 8125
"#;

/// Scrape EBDs from a .docx and export them as JSON, DOT, SVG and PlantUML.
#[derive(Parser, Debug)]
#[command(
    name = "scrape-and-graph",
    version,
    about = "Scrape EBDs from a .docx and export them as JSON, DOT, SVG and PlantUML",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path of the .docx file containing the EBDs.
    #[arg(short, long = "input_path", visible_alias = "input-path")]
    input: PathBuf,

    /// Directory the artifacts are written to (created if missing, reused if present).
    #[arg(short, long = "output_path", visible_alias = "output-path", default_value = "output")]
    output: PathBuf,

    /// Artifact type to export; repeat for several.
    #[arg(short = 't', long = "export_types", visible_alias = "export-types",
          value_enum, ignore_case = true)]
    export_types: Vec<ExportArg>,

    /// Config file with kroki_host / kroki_port (default: ./ebd_toolchain.toml).
    #[arg(long, env = "EBD_TOOLCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Timeout for a single Kroki request in seconds.
    #[arg(long, env = "EBD_TOOLCHAIN_RENDER_TIMEOUT", default_value_t = 30)]
    render_timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "EBD_TOOLCHAIN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EBD_TOOLCHAIN_VERBOSE")]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ExportArg {
    Json,
    Dot,
    Svg,
    Puml,
}

impl From<ExportArg> for ExportType {
    fn from(v: ExportArg) -> Self {
        match v {
            ExportArg::Json => ExportType::Json,
            ExportArg::Dot => ExportType::Dot,
            ExportArg::Svg => ExportType::Svg,
            ExportArg::Puml => ExportType::Puml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Settings ─────────────────────────────────────────────────────────
    // Loaded before anything else: without a rendering service there is no
    // point in scraping.
    let settings = match &cli.config {
        Some(path) => {
            dotenvy::dotenv().ok();
            Settings::load_from(path)
        }
        None => Settings::load(),
    }
    .context("Kroki settings are missing or invalid (set KROKI_HOST and KROKI_PORT)")?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: ProgressCallback = CliProgressCallback::new(!cli.no_progress);
    let config = RunConfig::builder()
        .output_dir(&cli.output)
        .export_types(cli.export_types.iter().copied().map(ExportType::from))
        .render_timeout_secs(cli.render_timeout)
        .progress_callback(progress_cb)
        .build()
        .context("Invalid arguments")?;
    if config.export_types.is_empty() {
        eprintln!(
            "{}",
            dim("No export types given; the EBDs are checked but nothing is written.")
        );
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let report = scrape_and_graph(&cli.input, &settings, &config)
        .await
        .with_context(|| format!("Failed to process '{}'", cli.input.display()))?;

    let summary = report
        .ledger
        .to_pretty_json(4)
        .context("Failed to format the error summary")?;
    println!("{summary}");
    println!("🏁Finished");
    Ok(())
}
