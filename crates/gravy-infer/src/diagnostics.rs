//! Ariadne rendering of references the engine could not resolve.
//!
//! Every node delivered with `Unknown` confidence and a usable span becomes
//! one warning. Nodes without a span (synthetic or generated code) are
//! still inferred but never rendered.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::lookup::Confidence;
use crate::requestor::InferredNode;

const UNRESOLVED_CODE: &str = "W0001";

/// Rendering switches.
#[derive(Clone, Debug)]
pub struct DiagnosticOptions {
    pub color: bool,
}

impl DiagnosticOptions {
    /// Plain output, for snapshots and non-terminal sinks.
    pub fn colorless() -> Self {
        DiagnosticOptions { color: false }
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions { color: true }
    }
}

// ── Selection ──────────────────────────────────────────────────────────

/// Whether `node` is an unresolved reference that can be pointed at.
pub fn is_reportable(node: &InferredNode) -> bool {
    node.kind == "expr" && node.span.is_some() && node.confidence == Confidence::Unknown.to_string()
}

/// The reportable nodes among `nodes`, in delivery order.
pub fn unresolved(nodes: &[InferredNode]) -> Vec<&InferredNode> {
    nodes.iter().filter(|n| is_reportable(n)).collect()
}

// ── Rendering ──────────────────────────────────────────────────────────

/// Clamp a span into the source, keeping it at least one byte wide.
fn clamp(range: Range<usize>, source_len: usize) -> Range<usize> {
    let start = range.start.min(source_len);
    let end = range.end.min(source_len).max(start);
    if start == end {
        start..end.saturating_add(1).min(source_len)
    } else {
        start..end
    }
}

/// Render one unresolved node, or `None` if it has no usable span.
pub fn render_unresolved(
    node: &InferredNode,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> Option<String> {
    let span = node.span.filter(|s| s.is_valid())?;
    let range = clamp(span.start as usize..span.end as usize, source.len());
    let config = Config::default().with_color(options.color);

    let report = Report::build(ReportKind::Warning, range.clone())
        .with_code(UNRESOLVED_CODE)
        .with_message(format!("cannot infer the type of `{}`", node.label))
        .with_config(config)
        .with_label(
            Label::new(range)
                .with_message(format!("treated as {}", node.ty))
                .with_color(Color::Yellow),
        )
        .with_note(format!("in {} ({})", node.enclosing, filename))
        .finish();

    let mut buf = Vec::new();
    if let Err(err) = report.write(Source::from(source), &mut buf) {
        tracing::warn!(%err, "failed to render diagnostic");
        return None;
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}

/// Render every reportable node in `nodes`.
pub fn render_all(nodes: &[InferredNode], source: &str, filename: &str, options: &DiagnosticOptions) -> Vec<String> {
    unresolved(nodes)
        .into_iter()
        .filter_map(|n| render_unresolved(n, source, filename, options))
        .collect()
}
