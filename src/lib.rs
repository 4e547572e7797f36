//! # mermaid-export
//!
//! Pull Mermaid diagrams out of Markdown documents and export them to SVG
//! and PNG with [mermaid-cli](https://github.com/mermaid-js/mermaid-cli).
//!
//! ## Why this crate?
//!
//! Architecture docs tend to keep their diagrams inline as ```mermaid
//! blocks, but papers, slide decks and PDFs need image files. mermaid-cli
//! does the rendering; this crate does the glue around it: find the block,
//! patch the constructs mermaid-cli is known to reject, run the renderer
//! for both formats with a timeout, and report what worked.
//!
//! ## Pipeline Overview
//!
//! ```text
//! <name>.md
//!  │
//!  ├─ 1. Source   locate the document, extract the first ```mermaid block
//!  ├─ 2. Repair   fixed regex rules (pipes, {x} placeholders, glyphs, parens)
//!  ├─ 3. Render   mmdc → svg/<name>.svg  (transparent)
//!  │              mmdc → png/<name>.png  (white, 2x, optional W×H)
//!  └─ 4. Report   complete / partial / failed per item, file counts, sizes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mermaid_export::{export_all, ExportConfig, Manifest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manifest = Manifest::load("docs/diagrams/diagrams.json")?;
//!     let config = ExportConfig::builder()
//!         .source_dir("docs/diagrams")
//!         .output_dir("docs/diagrams/exports")
//!         .diagrams(manifest.diagrams)
//!         .build()?;
//!     let report = export_all(&config).await?;
//!     eprintln!("{} complete, {} failed", report.stats.complete, report.stats.failed);
//!     std::process::exit(report.exit_code());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mmdx` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! mermaid-export = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DiagramSpec, ExportConfig, ExportConfigBuilder, FormatSelection, Manifest, OutputFormat};
pub use error::{DiagramError, ExportError, FormatError};
pub use export::{export_all, export_all_sync, export_document};
pub use output::{
    human_size, DiagramResult, DiagramSource, DiagramStatus, ExportReport, ExportStats, FormatResult,
};
pub use pipeline::repair::{repair_diagram, RepairReport};
pub use pipeline::source::extract_diagram;
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
