//! Result records produced by an export run.
//!
//! Every record is `Serialize` so the CLI's `--json` mode can emit the
//! whole [`ExportReport`] unchanged.

use crate::config::OutputFormat;
use crate::error::{DiagramError, FormatError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A diagram extracted from its document, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramSource {
    /// Item name; drives every path derived for this diagram.
    pub name: String,
    /// Document the source came from.
    pub document: PathBuf,
    /// Mermaid text between the fences. Never empty.
    pub content: String,
    /// PNG width hint.
    pub width: Option<u32>,
    /// PNG height hint.
    pub height: Option<u32>,
}

/// Outcome of one renderer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatResult {
    pub format: OutputFormat,
    /// Where the file was (or would have been) written.
    pub path: PathBuf,
    /// Exit 0 and the file exists.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FormatError>,
    pub duration_ms: u64,
}

impl FormatResult {
    pub fn succeeded(format: OutputFormat, path: PathBuf, duration_ms: u64) -> Self {
        Self {
            format,
            path,
            success: true,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(format: OutputFormat, path: PathBuf, error: FormatError, duration_ms: u64) -> Self {
        Self {
            format,
            path,
            success: false,
            error: Some(error),
            duration_ms,
        }
    }
}

/// Per-item classification over the formats selected for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramStatus {
    /// Every selected format was written.
    Complete,
    /// At least one, but not every, selected format was written.
    Partial,
    /// Nothing was written, or the item was skipped.
    Failed,
}

impl DiagramStatus {
    /// Classify from the per-format outcomes of one item.
    pub fn classify(formats: &[FormatResult]) -> Self {
        let ok = formats.iter().filter(|f| f.success).count();
        if ok == 0 {
            DiagramStatus::Failed
        } else if ok == formats.len() {
            DiagramStatus::Complete
        } else {
            DiagramStatus::Partial
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DiagramStatus::Complete => "COMPLETE",
            DiagramStatus::Partial => "PARTIAL",
            DiagramStatus::Failed => "FAILED",
        }
    }
}

/// Everything that happened to one item of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramResult {
    pub name: String,
    pub status: DiagramStatus,
    /// One entry per attempted format, in render order. Empty when skipped.
    pub formats: Vec<FormatResult>,
    /// Why the item was skipped before rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DiagramError>,
    /// The repair rules changed the source.
    pub repaired: bool,
    pub duration_ms: u64,
}

impl DiagramResult {
    /// An item that never reached the renderer.
    pub fn skipped(name: impl Into<String>, error: DiagramError, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: DiagramStatus::Failed,
            formats: Vec::new(),
            error: Some(error),
            repaired: false,
            duration_ms,
        }
    }

    /// Result for one format, if it was attempted.
    pub fn format(&self, format: OutputFormat) -> Option<&FormatResult> {
        self.formats.iter().find(|f| f.format == format)
    }
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStats {
    /// Items in the table.
    pub total: usize,
    pub complete: usize,
    pub partial: usize,
    pub failed: usize,
    /// `*.svg` files present in the SVG directory after the run.
    pub svg_files: usize,
    /// `*.png` files present in the PNG directory after the run.
    pub png_files: usize,
    /// Combined size of those SVG files.
    pub svg_bytes: u64,
    /// Combined size of those PNG files.
    pub png_bytes: u64,
    pub total_duration_ms: u64,
    /// First line of `renderer --version`, when probed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer_version: Option<String>,
}

/// The full outcome of [`crate::export::export_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    pub diagrams: Vec<DiagramResult>,
    pub stats: ExportStats,
}

impl ExportReport {
    /// `1` only when something failed and nothing at all succeeded.
    ///
    /// Partial success is a normal outcome, and an empty table is not a
    /// failure.
    pub fn exit_code(&self) -> i32 {
        let any_success = self.stats.complete + self.stats.partial > 0;
        if self.stats.failed > 0 && !any_success {
            1
        } else {
            0
        }
    }

    /// Human-readable one-liners for every skipped item and failed format.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for d in &self.diagrams {
            if let Some(ref e) = d.error {
                out.push(format!("{}: {}", d.name, e));
            }
            for f in &d.formats {
                if let Some(ref e) = f.error {
                    out.push(format!("{} {}: {}", d.name, f.format, e));
                }
            }
        }
        out
    }

    /// Items with the given status, in table order.
    pub fn names_with(&self, status: DiagramStatus) -> Vec<&str> {
        self.diagrams
            .iter()
            .filter(|d| d.status == status)
            .map(|d| d.name.as_str())
            .collect()
    }
}

/// Format a byte count the way `du -h` would (`1.5K`, `2.3M`).
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["K", "M", "G", "T"];
    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(format: OutputFormat) -> FormatResult {
        FormatResult::succeeded(format, PathBuf::from("x"), 1)
    }

    fn bad(format: OutputFormat) -> FormatResult {
        FormatResult::failed(
            format,
            PathBuf::from("x"),
            FormatError::ExitStatus {
                code: Some(1),
                diagnostic: "Parse error".into(),
            },
            1,
        )
    }

    fn report(complete: usize, partial: usize, failed: usize) -> ExportReport {
        ExportReport {
            diagrams: Vec::new(),
            stats: ExportStats {
                total: complete + partial + failed,
                complete,
                partial,
                failed,
                ..Default::default()
            },
        }
    }

    #[test]
    fn classify_both_ok_is_complete() {
        let f = [ok(OutputFormat::Svg), ok(OutputFormat::Png)];
        assert_eq!(DiagramStatus::classify(&f), DiagramStatus::Complete);
    }

    #[test]
    fn classify_one_ok_is_partial_either_way() {
        let svg_only = [ok(OutputFormat::Svg), bad(OutputFormat::Png)];
        let png_only = [bad(OutputFormat::Svg), ok(OutputFormat::Png)];
        assert_eq!(DiagramStatus::classify(&svg_only), DiagramStatus::Partial);
        assert_eq!(DiagramStatus::classify(&png_only), DiagramStatus::Partial);
    }

    #[test]
    fn classify_nothing_ok_is_failed() {
        let f = [bad(OutputFormat::Svg), bad(OutputFormat::Png)];
        assert_eq!(DiagramStatus::classify(&f), DiagramStatus::Failed);
        assert_eq!(DiagramStatus::classify(&[]), DiagramStatus::Failed);
    }

    #[test]
    fn classify_single_selected_format() {
        assert_eq!(
            DiagramStatus::classify(&[ok(OutputFormat::Png)]),
            DiagramStatus::Complete
        );
    }

    #[test]
    fn exit_code_only_fails_when_nothing_succeeded() {
        assert_eq!(report(0, 0, 3).exit_code(), 1);
        assert_eq!(report(1, 0, 2).exit_code(), 0);
        assert_eq!(report(0, 1, 2).exit_code(), 0);
        assert_eq!(report(0, 0, 0).exit_code(), 0);
    }

    #[test]
    fn warnings_cover_skips_and_format_failures() {
        let r = ExportReport {
            diagrams: vec![
                DiagramResult::skipped(
                    "a",
                    DiagramError::SourceNotFound {
                        path: PathBuf::from("a.md"),
                    },
                    0,
                ),
                DiagramResult {
                    name: "b".into(),
                    status: DiagramStatus::Partial,
                    formats: vec![ok(OutputFormat::Svg), bad(OutputFormat::Png)],
                    error: None,
                    repaired: true,
                    duration_ms: 5,
                },
            ],
            stats: ExportStats::default(),
        };
        let w = r.warnings();
        assert_eq!(w.len(), 2);
        assert!(w[0].starts_with("a: Source file not found"));
        assert_eq!(w[1], "b PNG: Parse error");
        assert_eq!(r.names_with(DiagramStatus::Partial), vec!["b"]);
    }

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(512), "512B");
        assert_eq!(human_size(1536), "1.5K");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0M");
    }

    #[test]
    fn report_serialises() {
        let json = serde_json::to_string(&report(1, 0, 0)).unwrap();
        assert!(json.contains("\"complete\":1"));
    }
}
