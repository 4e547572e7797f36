//! Pipeline stages for Markdown-to-image export.
//!
//! Each submodule implements exactly one transformation step and can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ repair ──▶ render (svg) ──▶ render (png)
//! (<name>.md)  (regex)    (mmdc)           (mmdc)
//! ```
//!
//! 1. [`source`]: locate `<name>.md` and pull out the first Mermaid block
//! 2. [`repair`]: fixed regex rules for constructs mermaid-cli chokes on
//! 3. [`render`]: one renderer subprocess per format, bounded by a timeout;
//!    the only stage that leaves the process

pub mod render;
pub mod repair;
pub mod source;
