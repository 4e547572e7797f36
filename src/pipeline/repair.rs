//! Syntax repair: rewrite Mermaid constructs that trip up mermaid-cli.
//!
//! The renderer's parser rejects a handful of things that are common in
//! hand-written architecture diagrams: pipes inside labels (they delimit
//! edge text), `{x}` placeholders (they open a decision node), a few
//! typographic glyphs, and parentheses inside `[...]` labels (they open a
//! rounded node). Each is replaced with a harmless equivalent.
//!
//! This is pattern substitution, not a grammar-aware transform. It cannot
//! tell a label pipe from an edge-label pipe, so inputs that relied on
//! `-->|text|` edge labels come out as `-->/text/`. That trade is accepted.
//!
//! ## Rule Order
//!
//! Rules run in a fixed order because later rules see earlier output:
//! pipes first, then brace placeholders (so `{z}` becomes `[z]` before the
//! label rule looks for brackets), then glyphs, then parentheses in labels.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Substitution counts per rule for one repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub pipes: usize,
    pub brace_placeholders: usize,
    pub glyphs: usize,
    pub label_parens: usize,
}

impl RepairReport {
    pub fn total(&self) -> usize {
        self.pipes + self.brace_placeholders + self.glyphs + self.label_parens
    }

    pub fn changed(&self) -> bool {
        self.total() > 0
    }
}

/// Apply every repair rule to `source`.
///
/// Rules (applied in order):
/// 1. Replace pipes with `/` (` | ` becomes ` / `)
/// 2. Rewrite single-letter `{x}` placeholders to `[x]`
/// 3. Replace `━` with `-` and `•` with `*`
/// 4. Turn `(`/`)` inside `ID[...]` labels into `[`/`]`
pub fn repair_diagram(source: &str) -> String {
    repair_diagram_with_report(source).0
}

/// Like [`repair_diagram`], also reporting what changed.
pub fn repair_diagram_with_report(source: &str) -> (String, RepairReport) {
    let mut report = RepairReport::default();
    let s = replace_pipes(source, &mut report);
    let s = replace_brace_placeholders(&s, &mut report);
    let s = replace_glyphs(&s, &mut report);
    let s = replace_label_parens(&s, &mut report);

    debug!(
        pipes = report.pipes,
        brace_placeholders = report.brace_placeholders,
        glyphs = report.glyphs,
        label_parens = report.label_parens,
        "Repaired Mermaid source"
    );
    (s, report)
}

// ── Rule 1: Pipes ────────────────────────────────────────────────────────────

fn replace_pipes(input: &str, report: &mut RepairReport) -> String {
    report.pipes += input.matches('|').count();
    input.replace(" | ", " / ").replace('|', "/")
}

// ── Rule 2: Single-letter brace placeholders ─────────────────────────────────
//
// Tile URLs such as `/{z}/{x}/{y}.png` read as rhombus nodes to the parser.

static RE_BRACE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z])\}").unwrap());

fn replace_brace_placeholders(input: &str, report: &mut RepairReport) -> String {
    report.brace_placeholders += RE_BRACE_PLACEHOLDER.find_iter(input).count();
    RE_BRACE_PLACEHOLDER.replace_all(input, "[$1]").into_owned()
}

// ── Rule 3: Typographic glyphs ───────────────────────────────────────────────

const GLYPHS: [(char, &str); 2] = [('\u{2501}', "-"), ('\u{2022}', "*")];

fn replace_glyphs(input: &str, report: &mut RepairReport) -> String {
    let mut out = input.to_string();
    for (glyph, ascii) in GLYPHS {
        let n = out.matches(glyph).count();
        if n > 0 {
            report.glyphs += n;
            out = out.replace(glyph, ascii);
        }
    }
    out
}

// ── Rule 4: Parentheses inside node labels ──────────────────────────────────
//
// Matches `ID[label]` where the label holds at least one `(...)` run and no
// closing bracket. Nested brackets produced by rule 2 end the match early,
// so such labels are left alone.

static RE_LABEL_WITH_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\[([^\]]*\([^\]]*\)[^\]]*)\]").unwrap());

fn replace_label_parens(input: &str, report: &mut RepairReport) -> String {
    RE_LABEL_WITH_PARENS
        .replace_all(input, |caps: &regex::Captures<'_>| {
            report.label_parens += 1;
            let label = caps[2].replace('(', "[").replace(')', "]");
            format!("{}[{}]", &caps[1], label)
        })
        .into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rule: fn(&str, &mut RepairReport) -> String, input: &str) -> String {
        rule(input, &mut RepairReport::default())
    }

    #[test]
    fn test_spaced_pipe_becomes_slash() {
        assert_eq!(
            run(replace_pipes, "A[Redis | Postgres]"),
            "A[Redis / Postgres]"
        );
    }

    #[test]
    fn test_bare_pipe_becomes_slash() {
        assert_eq!(run(replace_pipes, "A -->|yes| B"), "A -->/yes/ B");
    }

    #[test]
    fn test_brace_placeholder() {
        assert_eq!(
            run(replace_brace_placeholders, "T[tiles/{z}/{x}/{y}.png]"),
            "T[tiles/[z]/[x]/[y].png]"
        );
    }

    #[test]
    fn test_multi_letter_braces_untouched() {
        assert_eq!(
            run(replace_brace_placeholders, "D{Valid?} --> E{id}"),
            "D{Valid?} --> E{id}"
        );
    }

    #[test]
    fn test_glyphs() {
        assert_eq!(
            run(replace_glyphs, "A[━━ Layer ━━<br/>• cache]"),
            "A[-- Layer --<br/>* cache]"
        );
    }

    #[test]
    fn test_label_parens_become_brackets() {
        assert_eq!(
            run(replace_label_parens, "API[Gateway (Kong)] --> DB[(Postgres)]"),
            "API[Gateway [Kong]] --> DB[[Postgres]]"
        );
    }

    #[test]
    fn test_label_without_parens_untouched() {
        assert_eq!(
            run(replace_label_parens, "A[Plain label] --> B(Rounded)"),
            "A[Plain label] --> B(Rounded)"
        );
    }

    #[test]
    fn test_label_parens_across_br() {
        assert_eq!(
            run(replace_label_parens, "W[Worker<br/>(Celery)<br/>x4]"),
            "W[Worker<br/>[Celery]<br/>x4]"
        );
    }

    #[test]
    fn test_full_repair_report() {
        let src = "graph TD\n  A[Client | Browser] --> B[API (REST)]\n  B --> C[tiles/{z}]\n  C --> D[• done]\n";
        let (out, report) = repair_diagram_with_report(src);
        assert_eq!(
            out,
            "graph TD\n  A[Client / Browser] --> B[API [REST]]\n  B --> C[tiles/[z]]\n  C --> D[* done]\n"
        );
        assert_eq!(
            report,
            RepairReport {
                pipes: 1,
                brace_placeholders: 1,
                glyphs: 1,
                label_parens: 1,
            }
        );
        assert!(report.changed());
    }

    #[test]
    fn test_clean_source_unchanged() {
        let src = "sequenceDiagram\n  Alice->>Bob: Hello\n";
        let (out, report) = repair_diagram_with_report(src);
        assert_eq!(out, src);
        assert!(!report.changed());
    }

    #[test]
    fn test_pipe_and_glyph_rules_idempotent() {
        let src = "A[a | b|c] --> B[━ • ━]";
        let once = run(replace_glyphs, &run(replace_pipes, src));
        let twice = run(replace_glyphs, &run(replace_pipes, &once));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_full_repair_second_pass_is_stable_here() {
        let once = repair_diagram("A[x (y)] --> B[p | q]");
        assert_eq!(repair_diagram(&once), once);
    }
}
