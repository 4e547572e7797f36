//! CLI binary for mermaid-export.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExportConfig` and prints the run report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mermaid_export::{
    export_all, export_document, human_size, DiagramError, DiagramResult, DiagramSpec,
    DiagramStatus, ExportConfig, ExportProgressCallback, ExportReport, ExportStats,
    FormatResult, FormatSelection, Manifest, OutputFormat, ProgressCallback,
};
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
fn blue(s: &str) -> String {
    format!("\x1b[34m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// How many warnings the text summary shows before eliding the rest.
const MAX_WARNINGS_SHOWN: usize = 5;

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the item table, with a ✓/✗ line
/// per format printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Checking renderer…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} diagrams  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Exporting");
    }

    fn on_diagram_start(&self, index: usize, total: usize, name: &str) {
        self.bar.set_message(name.to_string());
        self.bar
            .println(blue(&format!("[{index}/{total}] {}", bold(name))));
    }

    fn on_diagram_skipped(&self, _name: &str, error: &DiagramError) {
        self.bar.println(format!("  {} {}", red("✗"), red(&error.to_string())));
        self.bar.inc(1);
    }

    fn on_format_complete(&self, _name: &str, result: &FormatResult) {
        self.bar.println(format!(
            "  {} {}: {}  {}",
            green("✓"),
            result.format,
            result.path.display(),
            dim(&format!("{:.1}s", result.duration_ms as f64 / 1000.0)),
        ));
    }

    fn on_format_error(&self, _name: &str, result: &FormatResult) {
        let msg = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();
        self.bar.println(format!(
            "  {} {} failed: {}",
            yellow("⚠"),
            result.format,
            yellow(&msg)
        ));
    }

    fn on_diagram_complete(&self, result: &DiagramResult) {
        if result.status != DiagramStatus::Complete {
            self.bar
                .println(format!("  {}", status_badge(result.status)));
        }
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _stats: &ExportStats) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Export everything listed in ./diagrams.json
  mmdx

  # Export two documents, the second with an explicit PNG size
  mmdx 01_system_architecture 02_data_flow:2400x3000

  # Use a manifest and write into docs/exports
  mmdx --manifest docs/diagrams.json --source-dir docs --output-dir docs/exports

  # One-off export of an arbitrary document
  mmdx --file README.md --name readme_overview

  # SVG only, raw source (no repair rules)
  mmdx --format svg --no-repair

  # Run mermaid-cli through npx
  mmdx --renderer npx --renderer-arg=-p --renderer-arg=@mermaid-js/mermaid-cli --renderer-arg=mmdc

  # Machine-readable report
  mmdx --json > report.json

MANIFEST FORMAT (diagrams.json):
  {
    "diagrams": [
      { "name": "01_system_architecture", "width": 2400, "height": 1800 },
      { "name": "02_data_flow" }
    ]
  }

REPAIR RULES (disable with --no-repair):
  1. "|" → "/"              pipes delimit edge labels
  2. "{x}" → "[x]"          single-letter placeholders open decision nodes
  3. "━" → "-", "•" → "*"   glyphs the parser rejects
  4. ID[a (b)] → ID[a [b]]  parentheses inside square labels

EXIT STATUS:
  0  at least one diagram exported (or nothing to do)
  1  every diagram failed, or a fatal error occurred

SETUP:
  npm install -g @mermaid-js/mermaid-cli
"#;

/// Extract Mermaid diagrams from Markdown and export them to SVG and PNG.
#[derive(Parser, Debug)]
#[command(
    name = "mmdx",
    version,
    about = "Extract Mermaid diagrams from Markdown and export them to SVG/PNG",
    long_about = "Extract the first ```mermaid block of each <name>.md document, repair \
constructs mermaid-cli is known to reject, and render it to <output>/svg/<name>.svg and \
<output>/png/<name>.png with mmdc.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Diagrams to export: NAME or NAME:WIDTHxHEIGHT (reads NAME.md).
    items: Vec<String>,

    /// JSON manifest listing the diagrams. Default: <source-dir>/diagrams.json.
    #[arg(short, long, env = "MMDX_MANIFEST", conflicts_with_all = ["items", "file"])]
    manifest: Option<PathBuf>,

    /// Export a single Markdown document instead of the item table.
    #[arg(long, conflicts_with = "items")]
    file: Option<PathBuf>,

    /// Output name for --file. Default: the document's file stem.
    #[arg(long, requires = "file")]
    name: Option<String>,

    /// PNG size for --file, as WIDTHxHEIGHT.
    #[arg(long, requires = "file")]
    size: Option<String>,

    /// Directory holding the <name>.md documents.
    #[arg(short, long, env = "MMDX_SOURCE_DIR", default_value = ".")]
    source_dir: PathBuf,

    /// Root of the export tree (svg/ and png/ are created below it).
    #[arg(short, long, env = "MMDX_OUTPUT_DIR", default_value = "exports")]
    output_dir: PathBuf,

    /// Formats to produce.
    #[arg(short, long, env = "MMDX_FORMAT", value_enum, default_value = "both")]
    format: FormatArg,

    /// mermaid-cli theme.
    #[arg(short, long, env = "MMDX_THEME", default_value = "neutral")]
    theme: String,

    /// PNG device scale factor (1–10).
    #[arg(long, env = "MMDX_SCALE", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..=10))]
    scale: u32,

    /// Per-format renderer timeout in seconds.
    #[arg(long, env = "MMDX_TIMEOUT", default_value_t = 45,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Renderer executable.
    #[arg(long, env = "MMDX_RENDERER", default_value = "mmdc")]
    renderer: String,

    /// Extra argument placed before the generated ones (repeatable).
    #[arg(long = "renderer-arg", allow_hyphen_values = true)]
    renderer_args: Vec<String>,

    /// Render the extracted source as-is, without the repair rules.
    #[arg(long, env = "MMDX_NO_REPAIR")]
    no_repair: bool,

    /// Do not run `renderer --version` before exporting.
    #[arg(long, env = "MMDX_SKIP_RENDERER_CHECK")]
    skip_renderer_check: bool,

    /// Print the report as JSON instead of the text summary.
    #[arg(long, env = "MMDX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MMDX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MMDX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MMDX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Both,
    Svg,
    Png,
}

impl From<FormatArg> for FormatSelection {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Both => FormatSelection::Both,
            FormatArg::Svg => FormatSelection::SvgOnly,
            FormatArg::Png => FormatSelection::PngOnly,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library logs stay at ERROR while the progress bar is showing; the
    // per-format lines above the bar carry the same information.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || cli.json {
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

    let progress = show_progress.then(CliProgressCallback::new);

    let outcome = run(&cli, progress.clone()).await;

    finish_progress(progress.as_deref());
    std::process::exit(outcome?);
}

/// Fatal errors and `--file` mode never reach `on_run_complete`.
fn finish_progress(progress: Option<&CliProgressCallback>) {
    if let Some(p) = progress {
        if !p.bar.is_finished() {
            p.bar.finish_and_clear();
        }
    }
}

/// Execute the selected mode, returning the process exit code.
async fn run(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<i32> {
    let progress_cb: Option<ProgressCallback> =
        progress.map(|p| p as Arc<dyn ExportProgressCallback>);

    // ── Single-document mode ─────────────────────────────────────────────
    if let Some(ref document) = cli.file {
        let spec = file_spec(cli, document)?;
        let config = build_config(cli, Vec::new(), progress_cb)?;
        let result = export_document(document, &spec, &config)
            .await
            .context("Export failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialise result")?
            );
        } else if !cli.quiet {
            print_item_table(std::slice::from_ref(&result));
        }
        return Ok(if result.status == DiagramStatus::Failed { 1 } else { 0 });
    }

    // ── Table mode ───────────────────────────────────────────────────────
    let diagrams = resolve_items(cli)?;
    let config = build_config(cli, diagrams, progress_cb)?;

    let report = export_all(&config).await.context("Export failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report, &config);
    }

    Ok(report.exit_code())
}

/// Map CLI args to `ExportConfig`.
fn build_config(
    cli: &Cli,
    diagrams: Vec<DiagramSpec>,
    progress: Option<ProgressCallback>,
) -> Result<ExportConfig> {
    let mut builder = ExportConfig::builder()
        .renderer(cli.renderer.clone())
        .renderer_args(cli.renderer_args.iter().cloned())
        .theme(cli.theme.clone())
        .source_dir(cli.source_dir.clone())
        .output_dir(cli.output_dir.clone())
        .formats(cli.format.clone().into())
        .raster_scale(cli.scale)
        .render_timeout_secs(cli.timeout)
        .repair(!cli.no_repair)
        .check_renderer(!cli.skip_renderer_check)
        .diagrams(diagrams);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Positional items win; otherwise the manifest (explicit or default).
fn resolve_items(cli: &Cli) -> Result<Vec<DiagramSpec>> {
    if !cli.items.is_empty() {
        return cli
            .items
            .iter()
            .map(|s| DiagramSpec::parse(s).with_context(|| format!("Invalid item '{s}'")))
            .collect();
    }

    let path = cli
        .manifest
        .clone()
        .unwrap_or_else(|| cli.source_dir.join("diagrams.json"));
    let manifest = Manifest::load(&path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))?;
    if manifest.diagrams.is_empty() {
        anyhow::bail!("Manifest {} lists no diagrams", path.display());
    }
    Ok(manifest.diagrams)
}

/// Name and size for `--file` mode.
fn file_spec(cli: &Cli, document: &Path) -> Result<DiagramSpec> {
    let name = match cli.name {
        Some(ref n) => n.clone(),
        None => document
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .with_context(|| format!("Cannot derive a name from {}", document.display()))?,
    };
    let item = match cli.size {
        Some(ref size) => format!("{name}:{size}"),
        None => name,
    };
    DiagramSpec::parse(&item).with_context(|| format!("Invalid name or size '{item}'"))
}

// ── Report printing ──────────────────────────────────────────────────────────

fn status_badge(status: DiagramStatus) -> String {
    match status {
        DiagramStatus::Complete => green(&format!("✓ {}", status.label())),
        DiagramStatus::Partial => yellow(&format!("⚠ {}", status.label())),
        DiagramStatus::Failed => red(&format!("✗ {}", status.label())),
    }
}

fn format_cell(result: &DiagramResult, format: OutputFormat) -> String {
    match result.format(format) {
        Some(f) if f.success => green("✓"),
        Some(_) => red("✗"),
        None if result.error.is_some() => red("✗"),
        None => dim("–"),
    }
}

/// Padding is applied before colouring so escape codes don't skew columns.
fn print_item_table(diagrams: &[DiagramResult]) {
    let width = diagrams
        .iter()
        .map(|d| d.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("DIAGRAM".len());

    eprintln!(
        "  {}  {}  {}  {}",
        bold(&format!("{:<width$}", "DIAGRAM")),
        bold("SVG"),
        bold("PNG"),
        bold("STATUS")
    );
    for d in diagrams {
        eprintln!(
            "  {:<width$}   {}    {}   {}",
            d.name,
            format_cell(d, OutputFormat::Svg),
            format_cell(d, OutputFormat::Png),
            status_badge(d.status),
        );
    }
}

fn print_summary(report: &ExportReport, config: &ExportConfig) {
    let stats = &report.stats;

    eprintln!();
    eprintln!("{}", blue(&"=".repeat(60)));
    eprintln!("{}", blue("EXPORT SUMMARY"));
    eprintln!("{}", blue(&"=".repeat(60)));
    eprintln!();

    print_item_table(&report.diagrams);

    eprintln!();
    eprintln!(
        "Results: {}, {}, {}",
        green(&format!("{} complete", stats.complete)),
        yellow(&format!("{} partial", stats.partial)),
        red(&format!("{} failed", stats.failed)),
    );

    let warnings = report.warnings();
    if !warnings.is_empty() {
        eprintln!("\n{}", yellow("Warnings:"));
        for w in warnings.iter().take(MAX_WARNINGS_SHOWN) {
            eprintln!("  • {w}");
        }
        if warnings.len() > MAX_WARNINGS_SHOWN {
            eprintln!(
                "  {}",
                dim(&format!("… and {} more", warnings.len() - MAX_WARNINGS_SHOWN))
            );
        }
    }

    eprintln!("\n{}", blue("Output Files:"));
    eprintln!(
        "  SVG: {} files, {}  →  {}",
        stats.svg_files,
        human_size(stats.svg_bytes),
        config.format_dir(OutputFormat::Svg).display()
    );
    eprintln!(
        "  PNG: {} files, {}  →  {}",
        stats.png_files,
        human_size(stats.png_bytes),
        config.format_dir(OutputFormat::Png).display()
    );
    eprintln!(
        "  Total: {}  {}",
        human_size(stats.svg_bytes + stats.png_bytes),
        dim(&format!("({}ms)", stats.total_duration_ms))
    );
    if let Some(ref v) = stats.renderer_version {
        eprintln!("  Renderer: {} {}", config.renderer, dim(v));
    }

    eprintln!();
    if report.exit_code() == 0 {
        eprintln!("{} Export process complete", green("✔"));
    } else {
        eprintln!("{} No diagram could be exported", red("✘"));
    }
}
