//! Source resolution and extraction: `<name>.md` → Mermaid text.
//!
//! Extraction is a single best-effort pattern match, not a Markdown parse:
//! the first fence tagged `mermaid` wins and everything up to the next
//! closing fence is returned verbatim. Invalid diagram syntax is passed
//! through untouched; the renderer is the judge of that.

use crate::config::DiagramSpec;
use crate::error::DiagramError;
use crate::output::DiagramSource;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

static RE_MERMAID_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```mermaid\r?\n(.*?)```").unwrap());

/// Return the text of the first ```mermaid block, or `None`.
///
/// The inner text keeps its internal whitespace and the newline that
/// precedes the closing fence. A block with no content is treated as absent.
pub fn extract_diagram(markdown: &str) -> Option<String> {
    RE_MERMAID_BLOCK
        .captures(markdown)
        .map(|caps| caps[1].to_string())
        .filter(|code| !code.is_empty())
}

/// Locate `<source_dir>/<name>.md`, checking it exists and is readable.
pub fn resolve_source(source_dir: &Path, name: &str) -> Result<PathBuf, DiagramError> {
    resolve_document(&source_dir.join(format!("{name}.md")))
}

/// Check that an explicit document path exists and is readable.
pub fn resolve_document(path: &Path) -> Result<PathBuf, DiagramError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(DiagramError::SourceNotFound { path });
    }

    if let Err(e) = std::fs::File::open(&path) {
        return Err(open_error(path, &e));
    }

    debug!("Resolved source document: {}", path.display());
    Ok(path)
}

/// Map a failed open of an existing regular file.
fn open_error(path: PathBuf, e: &std::io::Error) -> DiagramError {
    let detail = match e.kind() {
        std::io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => e.to_string(),
    };
    DiagramError::SourceUnreadable { path, detail }
}

/// Read a document as UTF-8.
pub async fn read_source(path: &Path) -> Result<String, DiagramError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DiagramError::SourceUnreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
}

/// Resolve, read and extract the diagram for one table row.
pub async fn load_diagram(
    spec: &DiagramSpec,
    source_dir: &Path,
) -> Result<DiagramSource, DiagramError> {
    let path = resolve_source(source_dir, &spec.name)?;
    load_document(&path, spec).await
}

/// Read and extract from an explicit document path.
pub async fn load_document(path: &Path, spec: &DiagramSpec) -> Result<DiagramSource, DiagramError> {
    let markdown = read_source(path).await?;
    let content = extract_diagram(&markdown).ok_or_else(|| DiagramError::NoDiagramBlock {
        path: path.to_path_buf(),
    })?;
    debug!("{}: extracted {} chars of Mermaid", spec.name, content.len());

    Ok(DiagramSource {
        name: spec.name.clone(),
        document: path.to_path_buf(),
        content,
        width: spec.width,
        height: spec.height,
    })
}
