//! Export driver: walk the item table and run every stage for each item.
//!
//! Items are processed strictly one after another. A missing document or
//! a document without a Mermaid block skips only that item; a failed
//! format never stops the other format of the same item. The only errors
//! returned as `Err` are the ones that make the whole run pointless
//! (renderer missing, output directory not writable).

use crate::config::{DiagramSpec, ExportConfig, OutputFormat};
use crate::error::{DiagramError, ExportError};
use crate::output::{DiagramResult, DiagramSource, DiagramStatus, ExportReport, ExportStats};
use crate::pipeline::{render, repair, source};
use std::path::Path;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Export every diagram in `config.diagrams`.
///
/// # Returns
/// `Ok(ExportReport)` whenever the run itself could proceed, even if every
/// item failed; use [`ExportReport::exit_code`] to turn it into a status.
///
/// # Errors
/// - the renderer probe fails (when `check_renderer` is set)
/// - the output directory or the temporary workspace cannot be created
pub async fn export_all(config: &ExportConfig) -> Result<ExportReport, ExportError> {
    let total_start = Instant::now();
    let total = config.diagrams.len();
    info!("Starting export of {} diagrams", total);

    // ── Step 1: Renderer probe ───────────────────────────────────────────
    let renderer_version = if config.check_renderer {
        Some(render::probe_renderer(config).await?)
    } else {
        None
    };

    // ── Step 2: Output tree and scratch space ────────────────────────────
    let workspace = prepare_workspace(config).await?;
    debug!("Temporary workspace: {}", workspace.path().display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    // ── Step 3: Items, in order ──────────────────────────────────────────
    let mut diagrams = Vec::with_capacity(total);
    for (i, spec) in config.diagrams.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_diagram_start(i + 1, total, &spec.name);
        }
        info!("[{}/{}] {}", i + 1, total, spec.name);

        let loaded = source::load_diagram(spec, &config.source_dir).await;
        diagrams.push(process_loaded(spec, loaded, workspace.path(), config).await);
    }

    // ── Step 4: Cleanup ──────────────────────────────────────────────────
    let workspace_path = workspace.path().to_path_buf();
    if let Err(e) = workspace.close() {
        warn!(
            "Failed to remove temporary workspace {}: {}",
            workspace_path.display(),
            e
        );
    }

    // ── Step 5: Tally ────────────────────────────────────────────────────
    let stats = tally(&diagrams, config, renderer_version, total_start).await;
    info!(
        "Export complete: {} complete, {} partial, {} failed in {}ms",
        stats.complete, stats.partial, stats.failed, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(&stats);
    }

    Ok(ExportReport { diagrams, stats })
}

/// Export a single document that is not part of the item table.
///
/// Outputs are still named after `spec.name` and land in the configured
/// output tree; `config.diagrams` is ignored.
pub async fn export_document(
    document: impl AsRef<Path>,
    spec: &DiagramSpec,
    config: &ExportConfig,
) -> Result<DiagramResult, ExportError> {
    if config.check_renderer {
        render::probe_renderer(config).await?;
    }
    let workspace = prepare_workspace(config).await?;

    let document = document.as_ref();
    let loaded = match source::resolve_document(document) {
        Ok(path) => source::load_document(&path, spec).await,
        Err(e) => Err(e),
    };
    let result = process_loaded(spec, loaded, workspace.path(), config).await;

    if let Err(e) = workspace.close() {
        warn!("Failed to remove temporary workspace: {}", e);
    }
    Ok(result)
}

/// Synchronous wrapper around [`export_all`].
///
/// Creates a temporary tokio runtime internally.
pub fn export_all_sync(config: &ExportConfig) -> Result<ExportReport, ExportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExportError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(export_all(config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Create `<output_dir>` and a fresh temporary directory inside it.
///
/// The workspace lives next to the outputs so renderer input and output sit
/// on the same filesystem; it is removed when the returned `TempDir` drops.
async fn prepare_workspace(config: &ExportConfig) -> Result<TempDir, ExportError> {
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| ExportError::OutputDirFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

    tempfile::Builder::new()
        .prefix(".mmdx-tmp-")
        .tempdir_in(&config.output_dir)
        .map_err(|e| ExportError::WorkspaceFailed {
            path: config.output_dir.clone(),
            source: e,
        })
}

/// Repair and render one item whose source has (maybe) been loaded.
async fn process_loaded(
    spec: &DiagramSpec,
    loaded: Result<DiagramSource, DiagramError>,
    workspace: &Path,
    config: &ExportConfig,
) -> DiagramResult {
    let start = Instant::now();

    let diagram = match loaded {
        Ok(d) => d,
        Err(e) => {
            warn!("{}: skipped: {}", spec.name, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_diagram_skipped(&spec.name, &e);
            }
            return DiagramResult::skipped(&spec.name, e, start.elapsed().as_millis() as u64);
        }
    };

    let (content, repaired) = if config.repair {
        let (fixed, report) = repair::repair_diagram_with_report(&diagram.content);
        if report.changed() {
            debug!("{}: {} substitutions", diagram.name, report.total());
        }
        (fixed, report.changed())
    } else {
        (diagram.content.clone(), false)
    };

    let mut formats = Vec::with_capacity(2);
    for &format in config.formats.formats() {
        let result = render::export_diagram(
            &content,
            &diagram.name,
            format,
            diagram.width,
            diagram.height,
            workspace,
            config,
        )
        .await;

        if let Some(ref cb) = config.progress_callback {
            if result.success {
                cb.on_format_complete(&diagram.name, &result);
            } else {
                cb.on_format_error(&diagram.name, &result);
            }
        }
        formats.push(result);
    }

    let result = DiagramResult {
        name: diagram.name,
        status: DiagramStatus::classify(&formats),
        formats,
        error: None,
        repaired,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_diagram_complete(&result);
    }
    result
}

/// Count outcomes and measure what is on disk after the run.
async fn tally(
    diagrams: &[DiagramResult],
    config: &ExportConfig,
    renderer_version: Option<String>,
    total_start: Instant,
) -> ExportStats {
    let count = |status: DiagramStatus| diagrams.iter().filter(|d| d.status == status).count();
    let (svg_files, svg_bytes) = measure_dir(&config.format_dir(OutputFormat::Svg), "svg").await;
    let (png_files, png_bytes) = measure_dir(&config.format_dir(OutputFormat::Png), "png").await;

    ExportStats {
        total: diagrams.len(),
        complete: count(DiagramStatus::Complete),
        partial: count(DiagramStatus::Partial),
        failed: count(DiagramStatus::Failed),
        svg_files,
        png_files,
        svg_bytes,
        png_bytes,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        renderer_version,
    }
}

/// Number and combined size of `*.<ext>` files directly inside `dir`.
///
/// A missing directory counts as empty.
async fn measure_dir(dir: &Path, ext: &str) -> (usize, u64) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(_) => return (0, 0),
    };

    let mut files = 0;
    let mut bytes = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        if let Ok(meta) = entry.metadata().await {
            if meta.is_file() {
                files += 1;
                bytes += meta.len();
            }
        }
    }
    (files, bytes)
}
