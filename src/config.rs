//! Configuration types for diagram export.
//!
//! All export behaviour is controlled through [`ExportConfig`], built via its
//! [`ExportConfigBuilder`]. The list of diagrams to process lives in the same
//! struct as a plain table of [`DiagramSpec`] rows, normally loaded from a
//! JSON [`Manifest`] so that adding a diagram never means touching code.

use crate::error::ExportError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Configuration for an export run.
///
/// Built via [`ExportConfig::builder()`] or using [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use mermaid_export::{DiagramSpec, ExportConfig};
///
/// let config = ExportConfig::builder()
///     .source_dir("docs/diagrams")
///     .output_dir("docs/diagrams/exports")
///     .diagram(DiagramSpec::with_size("01_system_architecture", 2400, 1800))
///     .build()
///     .unwrap();
/// assert_eq!(config.diagrams.len(), 1);
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Renderer executable. Default: `mmdc` (from `@mermaid-js/mermaid-cli`).
    pub renderer: String,

    /// Arguments inserted before the generated ones, e.g.
    /// `["-p", "@mermaid-js/mermaid-cli", "mmdc"]` when `renderer` is `npx`.
    pub renderer_args: Vec<String>,

    /// Visual theme passed as `-t`. Default: `neutral`.
    pub theme: String,

    /// Directory holding `<name>.md` documents. Default: `.`.
    pub source_dir: PathBuf,

    /// Root of the export tree; formats go to `svg/` and `png/` below it.
    /// Default: `exports`.
    pub output_dir: PathBuf,

    /// Which formats to produce. Default: both.
    pub formats: FormatSelection,

    /// Background for SVG output. Default: `transparent`.
    pub vector_background: String,

    /// Background for PNG output. Default: `white`.
    pub raster_background: String,

    /// Device scale factor for PNG output (`-s`). Range: 1–10. Default: 2.
    pub raster_scale: u32,

    /// Per-invocation renderer timeout in seconds. Default: 45.
    ///
    /// Applied once per format, not per item: a diagram that hangs on SVG
    /// still gets its own full window for PNG.
    pub render_timeout_secs: u64,

    /// Upper bound on the length of reported diagnostics. Default: 200.
    pub diagnostic_max_chars: usize,

    /// Apply the syntax repair rules before rendering. Default: true.
    pub repair: bool,

    /// Probe `renderer --version` before processing any item. Default: true.
    pub check_renderer: bool,

    /// The diagrams to export, processed in order.
    pub diagrams: Vec<DiagramSpec>,

    /// Optional per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            renderer: "mmdc".to_string(),
            renderer_args: Vec::new(),
            theme: "neutral".to_string(),
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("exports"),
            formats: FormatSelection::default(),
            vector_background: "transparent".to_string(),
            raster_background: "white".to_string(),
            raster_scale: 2,
            render_timeout_secs: 45,
            diagnostic_max_chars: 200,
            repair: true,
            check_renderer: true,
            diagrams: Vec::new(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("renderer", &self.renderer)
            .field("renderer_args", &self.renderer_args)
            .field("theme", &self.theme)
            .field("source_dir", &self.source_dir)
            .field("output_dir", &self.output_dir)
            .field("formats", &self.formats)
            .field("raster_scale", &self.raster_scale)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("repair", &self.repair)
            .field("check_renderer", &self.check_renderer)
            .field("diagrams", &self.diagrams)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory that receives files of the given format.
    pub fn format_dir(&self, format: OutputFormat) -> PathBuf {
        self.output_dir.join(format.extension())
    }

    /// Final path of `<name>.<ext>` for the given format.
    pub fn output_path(&self, name: &str, format: OutputFormat) -> PathBuf {
        self.format_dir(format)
            .join(format!("{}.{}", name, format.extension()))
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn renderer(mut self, program: impl Into<String>) -> Self {
        self.config.renderer = program.into();
        self
    }

    pub fn renderer_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.renderer_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.config.theme = theme.into();
        self
    }

    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.source_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn formats(mut self, formats: FormatSelection) -> Self {
        self.config.formats = formats;
        self
    }

    pub fn vector_background(mut self, bg: impl Into<String>) -> Self {
        self.config.vector_background = bg.into();
        self
    }

    pub fn raster_background(mut self, bg: impl Into<String>) -> Self {
        self.config.raster_background = bg.into();
        self
    }

    pub fn raster_scale(mut self, scale: u32) -> Self {
        self.config.raster_scale = scale.clamp(1, 10);
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn diagnostic_max_chars(mut self, n: usize) -> Self {
        self.config.diagnostic_max_chars = n;
        self
    }

    pub fn repair(mut self, v: bool) -> Self {
        self.config.repair = v;
        self
    }

    pub fn check_renderer(mut self, v: bool) -> Self {
        self.config.check_renderer = v;
        self
    }

    pub fn diagram(mut self, spec: DiagramSpec) -> Self {
        self.config.diagrams.push(spec);
        self
    }

    pub fn diagrams(mut self, specs: impl IntoIterator<Item = DiagramSpec>) -> Self {
        self.config.diagrams.extend(specs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExportConfig, ExportError> {
        let c = &self.config;
        if c.renderer.trim().is_empty() {
            return Err(ExportError::InvalidConfig(
                "Renderer program must not be empty".into(),
            ));
        }
        if c.render_timeout_secs == 0 {
            return Err(ExportError::InvalidConfig(
                "Render timeout must be ≥ 1 second".into(),
            ));
        }
        if c.diagnostic_max_chars < 16 {
            return Err(ExportError::InvalidConfig(format!(
                "Diagnostic length must be ≥ 16, got {}",
                c.diagnostic_max_chars
            )));
        }

        let mut seen = HashSet::new();
        for spec in &c.diagrams {
            spec.validate()?;
            if !seen.insert(spec.name.as_str()) {
                return Err(ExportError::InvalidConfig(format!(
                    "Diagram '{}' is listed more than once",
                    spec.name
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The two image kinds the renderer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Scalable vector output, transparent background.
    Svg,
    /// Fixed-resolution raster output, white background, scaled.
    Png,
}

impl OutputFormat {
    /// File extension, also used as the output sub-directory name.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
        }
    }

    /// Upper-case label for reports.
    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Svg => "SVG",
            OutputFormat::Png => "PNG",
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, OutputFormat::Svg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which formats a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatSelection {
    /// SVG then PNG (default).
    #[default]
    Both,
    /// SVG only.
    SvgOnly,
    /// PNG only.
    PngOnly,
}

impl FormatSelection {
    /// Formats in the order they are rendered: vector first.
    pub fn formats(self) -> &'static [OutputFormat] {
        match self {
            FormatSelection::Both => &[OutputFormat::Svg, OutputFormat::Png],
            FormatSelection::SvgOnly => &[OutputFormat::Svg],
            FormatSelection::PngOnly => &[OutputFormat::Png],
        }
    }
}

// ── Item table ───────────────────────────────────────────────────────────

/// One row of the item table: a document name and optional PNG dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramSpec {
    /// Base name; the document is `<name>.md` and outputs are `<name>.<ext>`.
    pub name: String,
    /// PNG width in pixels (`-w`). Ignored for SVG.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// PNG height in pixels (`-H`). Ignored for SVG.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl DiagramSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            width: None,
            height: None,
        }
    }

    pub fn with_size(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width: Some(width),
            height: Some(height),
        }
    }

    /// Parse a command-line item: `name` or `name:WIDTHxHEIGHT`.
    pub fn parse(s: &str) -> Result<Self, ExportError> {
        let s = s.trim();
        let spec = match s.rsplit_once(':') {
            None => DiagramSpec::new(s),
            Some((name, dims)) => {
                let (w, h) = dims
                    .to_ascii_lowercase()
                    .split_once('x')
                    .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
                    .ok_or_else(|| {
                        ExportError::InvalidConfig(format!(
                            "Invalid size '{}' for '{}': expected WIDTHxHEIGHT",
                            dims, name
                        ))
                    })?;
                let parse_dim = |v: &str| {
                    v.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                        ExportError::InvalidConfig(format!(
                            "Invalid dimension '{}' for '{}'",
                            v, name
                        ))
                    })
                };
                DiagramSpec::with_size(name, parse_dim(&w)?, parse_dim(&h)?)
            }
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Names double as file stems, so they must stay inside their directory.
    fn validate(&self) -> Result<(), ExportError> {
        if self.name.trim().is_empty() {
            return Err(ExportError::InvalidConfig(
                "Diagram name must not be empty".into(),
            ));
        }
        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(ExportError::InvalidConfig(format!(
                "Diagram name '{}' must be a plain file stem",
                self.name
            )));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(ExportError::InvalidConfig(format!(
                "Diagram '{}' has a zero dimension",
                self.name
            )));
        }
        Ok(())
    }
}

/// On-disk form of the item table.
///
/// ```json
/// { "diagrams": [ { "name": "01_system_architecture", "width": 2400, "height": 1800 } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub diagrams: Vec<DiagramSpec>,
}

impl Manifest {
    /// Read and parse a JSON manifest.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExportError::ManifestNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(ExportError::InvalidManifest {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                })
            }
        };
        Self::from_json(&text).map_err(|e| ExportError::InvalidManifest {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_mermaid_cli_usage() {
        let c = ExportConfig::default();
        assert_eq!(c.renderer, "mmdc");
        assert_eq!(c.theme, "neutral");
        assert_eq!(c.raster_scale, 2);
        assert_eq!(c.render_timeout_secs, 45);
        assert!(c.repair);
        assert_eq!(c.formats.formats(), &[OutputFormat::Svg, OutputFormat::Png]);
    }

    #[test]
    fn format_selection_renders_vector_first() {
        assert_eq!(FormatSelection::SvgOnly.formats(), &[OutputFormat::Svg]);
        assert_eq!(FormatSelection::PngOnly.formats(), &[OutputFormat::Png]);
        let both = FormatSelection::Both.formats();
        assert!(both[0].is_vector());
        assert!(!both[1].is_vector());
    }

    #[test]
    fn output_paths_are_per_format() {
        let c = ExportConfig::builder().output_dir("out").build().unwrap();
        assert_eq!(
            c.output_path("02_data_flow", OutputFormat::Png),
            PathBuf::from("out/png/02_data_flow.png")
        );
        assert_eq!(c.format_dir(OutputFormat::Svg), PathBuf::from("out/svg"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = ExportConfig::builder()
            .render_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfig(_)));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = ExportConfig::builder()
            .diagram(DiagramSpec::new("a"))
            .diagram(DiagramSpec::with_size("a", 10, 10))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than once"), "got: {err}");
    }

    #[test]
    fn path_like_names_rejected() {
        assert!(ExportConfig::builder()
            .diagram(DiagramSpec::new("../etc/passwd"))
            .build()
            .is_err());
    }

    #[test]
    fn raster_scale_is_clamped() {
        let c = ExportConfig::builder().raster_scale(40).build().unwrap();
        assert_eq!(c.raster_scale, 10);
    }

    #[test]
    fn parse_plain_name() {
        assert_eq!(
            DiagramSpec::parse("05_scalability").unwrap(),
            DiagramSpec::new("05_scalability")
        );
    }

    #[test]
    fn parse_name_with_size() {
        assert_eq!(
            DiagramSpec::parse("03_database_schema:3000x2400").unwrap(),
            DiagramSpec::with_size("03_database_schema", 3000, 2400)
        );
    }

    #[test]
    fn parse_rejects_bad_size() {
        assert!(DiagramSpec::parse("a:3000").is_err());
        assert!(DiagramSpec::parse("a:0x10").is_err());
        assert!(DiagramSpec::parse("a:wide x tall").is_err());
        assert!(DiagramSpec::parse("").is_err());
    }

    #[test]
    fn manifest_from_json() {
        let m = Manifest::from_json(
            r#"{"diagrams":[{"name":"a","width":2400,"height":1800},{"name":"b"}]}"#,
        )
        .unwrap();
        assert_eq!(m.diagrams.len(), 2);
        assert_eq!(m.diagrams[0], DiagramSpec::with_size("a", 2400, 1800));
        assert_eq!(m.diagrams[1].width, None);
    }

    #[test]
    fn manifest_missing_file() {
        let err = Manifest::load("/definitely/not/here/diagrams.json").unwrap_err();
        assert!(matches!(err, ExportError::ManifestNotFound { .. }));
    }

    #[test]
    fn manifest_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagrams.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(err, ExportError::InvalidManifest { .. }));
    }

    #[test]
    fn format_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&OutputFormat::Png).unwrap(), "\"png\"");
    }
}
