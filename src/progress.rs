//! Progress-callback trait for per-diagram export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::ExportConfigBuilder::progress_callback`] to receive
//! events as the driver walks the item table.
//!
//! # Example
//!
//! ```rust
//! use mermaid_export::{ExportConfig, ExportProgressCallback, FormatResult};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl ExportProgressCallback for CountingCallback {
//!     fn on_format_complete(&self, name: &str, result: &FormatResult) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name}: {}", result.path.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = ExportConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExportProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::DiagramError;
use crate::output::{DiagramResult, ExportStats, FormatResult};
use std::sync::Arc;

/// Called by the export driver as it processes each diagram.
///
/// Items are processed strictly one after another, so events for one item
/// never interleave with another's. The trait is still `Send + Sync` so a
/// config holding it can be moved into a runtime or another thread. All
/// methods default to no-ops.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once before the first item.
    fn on_run_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before an item's document is read.
    ///
    /// # Arguments
    /// * `index`: 1-based position in the item table
    /// * `total`: number of items
    /// * `name`: item name
    fn on_diagram_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an item is skipped because no diagram source was found.
    fn on_diagram_skipped(&self, name: &str, error: &DiagramError) {
        let _ = (name, error);
    }

    /// Called after a format rendered successfully.
    fn on_format_complete(&self, name: &str, result: &FormatResult) {
        let _ = (name, result);
    }

    /// Called after a format failed; `result.error` is always `Some`.
    fn on_format_error(&self, name: &str, result: &FormatResult) {
        let _ = (name, result);
    }

    /// Called once an item has been classified (not for skipped items).
    fn on_diagram_complete(&self, result: &DiagramResult) {
        let _ = result;
    }

    /// Called once after cleanup, with the final tallies.
    fn on_run_complete(&self, stats: &ExportStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExportConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::error::FormatError;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        skipped: AtomicUsize,
        written: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ExportProgressCallback for TrackingCallback {
        fn on_diagram_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_diagram_skipped(&self, _name: &str, _error: &DiagramError) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_format_complete(&self, _name: &str, _result: &FormatResult) {
            self.written.fetch_add(1, Ordering::SeqCst);
        }

        fn on_format_error(&self, _name: &str, _result: &FormatResult) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_diagram_start(1, 2, "a");
        cb.on_diagram_skipped(
            "a",
            &DiagramError::SourceNotFound {
                path: PathBuf::from("a.md"),
            },
        );
        cb.on_run_complete(&ExportStats::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        let ok = FormatResult::succeeded(OutputFormat::Svg, PathBuf::from("svg/b.svg"), 12);
        let failed = FormatResult::failed(
            OutputFormat::Png,
            PathBuf::from("png/b.png"),
            FormatError::Timeout { secs: 45 },
            45_000,
        );

        tracker.on_diagram_start(1, 2, "a");
        tracker.on_diagram_skipped(
            "a",
            &DiagramError::NoDiagramBlock {
                path: PathBuf::from("a.md"),
            },
        );
        tracker.on_diagram_start(2, 2, "b");
        tracker.on_format_complete("b", &ok);
        tracker.on_format_error("b", &failed);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.written.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ExportProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_diagram_start(1, 10, "x");
    }
}
