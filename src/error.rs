//! Error types for the mermaid-export library.
//!
//! Three error types mirror the three scopes a failure can have:
//!
//! * [`ExportError`] (**Fatal**): the run cannot start or cannot continue
//!   (bad configuration, unreadable manifest, renderer not installed, output
//!   directory not writable). Returned as `Err(ExportError)` from the
//!   top-level `export*` functions.
//!
//! * [`DiagramError`] (**Item-local**): one document is missing or has no
//!   Mermaid block. The item is skipped and recorded as failed inside
//!   [`crate::output::DiagramResult`]; the run moves on to the next item.
//!
//! * [`FormatError`] (**Format-local**): one renderer invocation failed
//!   (timeout, crash, non-zero exit). Stored inside
//!   [`crate::output::FormatResult`]; the other format of the same item is
//!   still attempted.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the mermaid-export library.
#[derive(Debug, Error)]
pub enum ExportError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The manifest file does not exist.
    #[error("Manifest not found: '{path}'\nPass diagram names on the command line or create the file.")]
    ManifestNotFound { path: PathBuf },

    /// The manifest exists but could not be read or parsed.
    #[error("Invalid manifest '{path}': {detail}")]
    InvalidManifest { path: PathBuf, detail: String },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// `renderer --version` could not be run or exited non-zero.
    #[error(
        "Renderer '{renderer}' is not available: {detail}\n\
Install it with: npm install -g @mermaid-js/mermaid-cli\n\
or point --renderer at an existing mmdc executable."
    )]
    RendererUnavailable { renderer: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create an output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create the per-run temporary workspace.
    #[error("Failed to create temporary workspace in '{path}': {source}")]
    WorkspaceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// An item-local error: the document could not yield any diagram source.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DiagramError {
    /// `<name>.md` does not exist in the source directory.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// The document exists but could not be read.
    #[error("Cannot read source file {path}: {detail}")]
    SourceUnreadable { path: PathBuf, detail: String },

    /// The document has no non-empty ```mermaid block.
    #[error("No Mermaid block found in {path}")]
    NoDiagramBlock { path: PathBuf },
}

/// A format-local error: one renderer invocation did not produce its file.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum FormatError {
    /// The renderer did not finish within the configured bound.
    #[error("Timeout ({secs}s exceeded)")]
    Timeout { secs: u64 },

    /// The renderer could not be started or waited on.
    #[error("Renderer failed to run: {detail}")]
    Launch { detail: String },

    /// The renderer exited with a non-zero status.
    #[error("{diagnostic}")]
    ExitStatus {
        code: Option<i32>,
        diagnostic: String,
    },

    /// The renderer exited 0 but the expected file is absent.
    #[error("Renderer reported success but {path} was not created")]
    MissingOutput { path: PathBuf },

    /// The temporary `.mmd` input could not be written.
    #[error("Failed to write renderer input: {detail}")]
    TempWrite { detail: String },
}

/// Cut `text` to at most `max_chars` characters, appending `…` when cut.
///
/// Works on `char` boundaries so multi-byte glyphs in renderer output never
/// cause a slicing panic.
pub fn truncate_diagnostic(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('\u{2026}');
    out
}
