//! Rendering: hand Mermaid text to mermaid-cli and check what came back.
//!
//! Each call writes the source to the run's temporary workspace, launches
//! the renderer once for one format and waits under a hard timeout. The
//! child is spawned with `kill_on_drop`, so when the timeout fires and the
//! wait future is dropped the process is killed rather than left running.
//!
//! Success is judged on two things only: exit status 0 **and** the output
//! file existing afterwards. mermaid-cli occasionally exits 0 after a
//! Puppeteer failure without writing anything; that case is reported as
//! [`FormatError::MissingOutput`].

use crate::config::{ExportConfig, OutputFormat};
use crate::error::{truncate_diagnostic, ExportError, FormatError};
use crate::output::FormatResult;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Lines carrying one of these are the useful part of mermaid-cli's output.
const DIAGNOSTIC_MARKERS: [&str; 2] = ["Error:", "Parse error"];

/// Build the renderer argument list for one format.
///
/// ```text
/// <renderer_args…> -i <input> -o <output> -t <theme>
///   svg: -b <vector_background>
///   png: -b <raster_background> -s <scale> [-w <width>] [-H <height>]
/// ```
pub fn build_args(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    width: Option<u32>,
    height: Option<u32>,
    config: &ExportConfig,
) -> Vec<String> {
    let mut args = config.renderer_args.clone();
    args.extend([
        "-i".to_string(),
        input.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
        "-t".to_string(),
        config.theme.clone(),
    ]);

    if format.is_vector() {
        args.extend(["-b".to_string(), config.vector_background.clone()]);
        return args;
    }

    args.extend([
        "-b".to_string(),
        config.raster_background.clone(),
        "-s".to_string(),
        config.raster_scale.to_string(),
    ]);
    if let Some(w) = width {
        args.extend(["-w".to_string(), w.to_string()]);
    }
    if let Some(h) = height {
        args.extend(["-H".to_string(), h.to_string()]);
    }
    args
}

/// Pick the most useful line out of a failed run's output.
///
/// Uses stderr, falling back to stdout when stderr is blank. Prefers the
/// first line carrying a known error marker, otherwise the first non-blank
/// line. Always returns a non-empty string of at most `max_chars` chars.
pub fn diagnostic_from_output(stderr: &str, stdout: &str, max_chars: usize) -> String {
    let text = if stderr.trim().is_empty() { stdout } else { stderr };

    let line = text
        .lines()
        .find(|l| DIAGNOSTIC_MARKERS.iter().any(|m| l.contains(m)))
        .or_else(|| text.lines().find(|l| !l.trim().is_empty()))
        .unwrap_or("Unknown error");

    truncate_diagnostic(line, max_chars)
}

/// Render one diagram in one format.
///
/// Never returns an error: every failure mode is captured in the returned
/// [`FormatResult`] so the caller can go on to the next format.
pub async fn export_diagram(
    source: &str,
    name: &str,
    format: OutputFormat,
    width: Option<u32>,
    height: Option<u32>,
    workspace: &Path,
    config: &ExportConfig,
) -> FormatResult {
    let start = Instant::now();
    let output = config.output_path(name, format);
    let elapsed = |start: Instant| start.elapsed().as_millis() as u64;
    let max = config.diagnostic_max_chars;

    // ── Stage input and output locations ─────────────────────────────────
    let input = workspace.join(format!("{}.{}.mmd", name, format.extension()));
    if let Err(e) = tokio::fs::write(&input, source).await {
        return FormatResult::failed(
            format,
            output,
            FormatError::TempWrite {
                detail: truncate_diagnostic(&e.to_string(), max),
            },
            elapsed(start),
        );
    }
    if let Err(e) = tokio::fs::create_dir_all(config.format_dir(format)).await {
        return FormatResult::failed(
            format,
            output,
            FormatError::Launch {
                detail: truncate_diagnostic(&format!("cannot create output directory: {e}"), max),
            },
            elapsed(start),
        );
    }

    // The existence check below must only see a file this invocation wrote.
    match tokio::fs::remove_file(&output).await {
        Ok(()) => debug!("{} {}: removed stale {}", name, format, output.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return FormatResult::failed(
                format,
                output.clone(),
                FormatError::Launch {
                    detail: truncate_diagnostic(&format!("cannot replace existing output: {e}"), max),
                },
                elapsed(start),
            );
        }
    }

    // ── Run the renderer ─────────────────────────────────────────────────
    let args = build_args(&input, &output, format, width, height, config);
    debug!("{} {}: {} {}", name, format, config.renderer, args.join(" "));

    let child = Command::new(&config.renderer)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(c) => c,
        Err(e) => {
            warn!("{} {}: failed to launch {}: {}", name, format, config.renderer, e);
            return FormatResult::failed(
                format,
                output,
                FormatError::Launch {
                    detail: truncate_diagnostic(&e.to_string(), max),
                },
                elapsed(start),
            );
        }
    };

    let timeout = Duration::from_secs(config.render_timeout_secs);
    let waited = tokio::time::timeout(timeout, child.wait_with_output()).await;

    // ── Classify ─────────────────────────────────────────────────────────
    let error = match waited {
        Err(_) => {
            warn!(
                "{} {}: renderer timed out after {}s",
                name, format, config.render_timeout_secs
            );
            FormatError::Timeout {
                secs: config.render_timeout_secs,
            }
        }
        Ok(Err(e)) => FormatError::Launch {
            detail: truncate_diagnostic(&e.to_string(), max),
        },
        Ok(Ok(out)) if out.status.success() => {
            if tokio::fs::try_exists(&output).await.unwrap_or(false) {
                let ms = elapsed(start);
                info!("{} {}: wrote {} in {}ms", name, format, output.display(), ms);
                return FormatResult::succeeded(format, output, ms);
            }
            FormatError::MissingOutput {
                path: output.clone(),
            }
        }
        Ok(Ok(out)) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let stdout = String::from_utf8_lossy(&out.stdout);
            FormatError::ExitStatus {
                code: out.status.code(),
                diagnostic: diagnostic_from_output(&stderr, &stdout, max),
            }
        }
    };

    warn!("{} {}: {}", name, format, error);
    FormatResult::failed(format, output, error, elapsed(start))
}

/// Check that the renderer can be launched, returning its version line.
pub async fn probe_renderer(config: &ExportConfig) -> Result<String, ExportError> {
    let unavailable = |detail: String| ExportError::RendererUnavailable {
        renderer: config.renderer.clone(),
        detail,
    };

    let child = Command::new(&config.renderer)
        .args(&config.renderer_args)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| unavailable(e.to_string()))?;

    let timeout = Duration::from_secs(config.render_timeout_secs);
    let out = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| unavailable(format!("--version timed out after {}s", timeout.as_secs())))?
        .map_err(|e| unavailable(e.to_string()))?;

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        let stdout = String::from_utf8_lossy(&out.stdout);
        return Err(unavailable(diagnostic_from_output(
            &stderr,
            &stdout,
            config.diagnostic_max_chars,
        )));
    }

    let version = String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown")
        .to_string();
    info!("Using renderer {} {}", config.renderer, version);
    Ok(version)
}
