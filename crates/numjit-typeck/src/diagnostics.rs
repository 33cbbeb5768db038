//! Ariadne-based rendering of type errors.
//!
//! Two output forms are supported: a colorless human-readable report with
//! an error code, a labeled source span and an optional help line, and a
//! one-object-per-error JSON shape for tools.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use numjit_common::LineIndex;

use crate::error::TypeError;

// ── Error Codes ────────────────────────────────────────────────────────

/// Assign a unique error code to each TypeError variant.
pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Unsupported { .. } => "E0001",
        TypeError::Promotion { .. } => "E0002",
        TypeError::UnpackArity { .. } => "E0003",
        TypeError::UnpackType { .. } => "E0004",
        TypeError::BuiltinArity { .. } => "E0005",
        TypeError::UnsupportedBuiltin { .. } => "E0006",
        TypeError::ArityMismatch { .. } => "E0007",
        TypeError::InvalidAttribute { .. } => "E0008",
        TypeError::ReadOnlyAttribute { .. } => "E0009",
        TypeError::InvalidIndex { .. } => "E0010",
        TypeError::TooManyIndices { .. } => "E0011",
        TypeError::NotIterable { .. } => "E0012",
        TypeError::UnboundLocal { .. } => "E0013",
        TypeError::Internal { .. } => "E0999",
    }
}

/// Short label placed under the offending span.
fn primary_label(err: &TypeError) -> String {
    match err {
        TypeError::Unsupported { .. } => "not supported in compiled code".to_string(),
        TypeError::Promotion { left, right, .. } => format!("`{}` meets `{}` here", left, right),
        TypeError::UnpackArity { found, .. } => format!("this value has {} elements", found),
        TypeError::UnpackType { ty, .. } => format!("this has type `{}`", ty),
        TypeError::BuiltinArity { found, .. } => format!("called with {} arguments", found),
        TypeError::UnsupportedBuiltin { name, .. } => format!("`{}` cannot be compiled", name),
        TypeError::ArityMismatch { found, .. } => format!("called with {} arguments", found),
        TypeError::InvalidAttribute { attr, .. } => format!("no attribute `{}`", attr),
        TypeError::ReadOnlyAttribute { .. } => "assigned here".to_string(),
        TypeError::InvalidIndex { ty, .. } => format!("this has type `{}`", ty),
        TypeError::TooManyIndices { found, .. } => format!("{} axes indexed", found),
        TypeError::NotIterable { ty, .. } => format!("this has type `{}`", ty),
        TypeError::UnboundLocal { .. } => "read before any assignment".to_string(),
        TypeError::Internal { .. } => "while compiling this".to_string(),
    }
}

// ── Fix Suggestions ────────────────────────────────────────────────────

fn help(err: &TypeError) -> Option<String> {
    match err {
        TypeError::UnpackArity {
            found, expected, ..
        } if found > expected => Some(format!("add {} more target(s)", found - expected)),
        TypeError::UnpackArity {
            found, expected, ..
        } => Some(format!("remove {} target(s)", expected - found)),
        TypeError::ReadOnlyAttribute { .. } => {
            Some("array metadata and complex components are read-only".to_string())
        }
        TypeError::UnboundLocal { name, .. } => {
            Some(format!("assign `{}` before this point on every path", name))
        }
        TypeError::Internal { .. } => Some("this is a compiler bug".to_string()),
        _ => None,
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

/// Clamp a span into the source and make it at least one byte wide
/// where the source allows.
fn clamp(range: Range<usize>, source_len: usize) -> Range<usize> {
    let s = range.start.min(source_len);
    let e = range.end.min(source_len).max(s);
    if s == e {
        s..e.saturating_add(1).min(source_len)
    } else {
        s..e
    }
}

/// Render a type error into a colorless diagnostic string.
pub fn render_diagnostic(error: &TypeError, source: &str, filename: &str) -> String {
    let config = Config::default().with_color(false);
    let span = clamp(error.span().to_range(), source.len());
    let msg = error.to_string();

    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(error_code(error))
        .with_message(&msg)
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(primary_label(error))
                .with_color(Color::Red),
        );
    if let Some(fix) = help(error) {
        builder.set_help(fix);
    }
    builder.set_note(format!("in {}", filename));

    let mut buf = Vec::new();
    if builder.finish().write(Source::from(source), &mut buf).is_err() {
        return format!("error[{}]: {}\n", error_code(error), msg);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Describe a type error as a JSON object:
/// `{code, severity, message, file, line, column, spans, fix}`.
pub fn diagnostic_json(error: &TypeError, source: &str, filename: &str) -> serde_json::Value {
    let span = error.span();
    let (line, column) = LineIndex::new(source).line_col(span.start.min(source.len() as u32));
    serde_json::json!({
        "code": error_code(error),
        "severity": "error",
        "message": error.to_string(),
        "file": filename,
        "line": line,
        "column": column,
        "spans": [{
            "start": span.start,
            "end": span.end,
            "label": primary_label(error),
        }],
        "fix": help(error),
    })
}
