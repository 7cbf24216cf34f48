//! Terminal rendering for testsmith reports.
//!
//! `anstream` strips the `anstyle` escapes when stdout is not a terminal, so
//! piped summaries stay plain text. JSON always goes through [`plain`].

mod styles;

use std::fmt::Display;
use std::io::Write;

pub(crate) use styles::clap_styles;

use styles::{BAR, ERROR, HEADER, LABEL, MUTED, SUCCESS, WARNING};
use testsmith_core::policy::Priority;
use testsmith_core::HttpMethod;

/// Width of a full tally bar, in cells.
const BAR_WIDTH: usize = 24;

pub(crate) fn success(msg: impl Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{SUCCESS}✓ {msg}{SUCCESS:#}").ok();
}

/// Errors go to stderr so `--json` output stays parseable.
pub(crate) fn error(msg: impl Display) {
    let mut out = anstream::stderr().lock();
    writeln!(out, "{ERROR}✗ {msg}{ERROR:#}").ok();
}

pub(crate) fn warning(msg: impl Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{WARNING}! {msg}{WARNING:#}").ok();
}

pub(crate) fn header(msg: impl Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{HEADER}{msg}{HEADER:#}").ok();
}

pub(crate) fn label(name: impl Display, value: impl Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "  {LABEL}{name}:{LABEL:#} {value}").ok();
}

pub(crate) fn blank() {
    writeln!(anstream::stdout().lock()).ok();
}

/// Unstyled text: JSON documents and other machine-readable output.
pub(crate) fn plain(msg: impl Display) {
    let mut out = anstream::stdout().lock();
    writeln!(out, "{msg}").ok();
}

/// One catalog row: method, path, component, operation id.
pub(crate) fn operation(method: HttpMethod, path: &str, component: &str, operation_id: &str) {
    let style = styles::method(method);
    let mut out = anstream::stdout().lock();
    writeln!(
        out,
        "  {style}{:<7}{style:#} {path}  {MUTED}[{component}] {operation_id}{MUTED:#}",
        method.as_str()
    )
    .ok();
}

/// A named count with a bar proportional to `total`.
pub(crate) fn tally(name: impl Display, count: usize, total: usize) {
    let mut out = anstream::stdout().lock();
    writeln!(
        out,
        "  {:<16} {:>5}  {BAR}{}{BAR:#}",
        name.to_string(),
        count,
        bar(count, total)
    )
    .ok();
}

/// A per-priority count, colored by urgency.
pub(crate) fn priority_tally(priority: Priority, count: usize, total: usize) {
    let style = styles::priority(priority);
    let mut out = anstream::stdout().lock();
    writeln!(
        out,
        "  {style}{:<16}{style:#} {:>5}  {BAR}{}{BAR:#}",
        priority.as_str(),
        count,
        bar(count, total)
    )
    .ok();
}

/// An operation left out of generation and why.
pub(crate) fn skipped(method: HttpMethod, path: &str, reason: impl Display) {
    let mut out = anstream::stdout().lock();
    writeln!(
        out,
        "  {WARNING}-{WARNING:#} {} {path}: {MUTED}{reason}{MUTED:#}",
        method.as_str()
    )
    .ok();
}

/// A policy profile with its per-endpoint size; the active one is marked.
pub(crate) fn profile(name: &str, current: bool, tests_per_endpoint: usize, description: &str) {
    let marker = if current { "*" } else { " " };
    let mut out = anstream::stdout().lock();
    writeln!(
        out,
        "  {SUCCESS}{marker}{SUCCESS:#} {LABEL}{name:<14}{LABEL:#} {tests_per_endpoint:>3} tests/endpoint  {MUTED}{description}{MUTED:#}"
    )
    .ok();
}

fn bar(count: usize, total: usize) -> String {
    if total == 0 || count == 0 {
        return String::new();
    }
    let cells = (count * BAR_WIDTH).div_ceil(total).min(BAR_WIDTH);
    "█".repeat(cells)
}
