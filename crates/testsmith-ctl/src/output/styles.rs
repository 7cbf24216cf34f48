//! Palette for report output and clap help.

use anstyle::{AnsiColor, Color, Effects, Style};
use testsmith_core::policy::Priority;
use testsmith_core::HttpMethod;

const fn fg(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

pub(crate) const SUCCESS: Style = fg(AnsiColor::Green);
pub(crate) const ERROR: Style = fg(AnsiColor::Red);
/// Skipped operations, failed plan checks, missing API keys.
pub(crate) const WARNING: Style = fg(AnsiColor::Yellow);
pub(crate) const HEADER: Style = Style::new().effects(Effects::BOLD);
pub(crate) const LABEL: Style = Style::new().effects(Effects::BOLD);
/// Components, operation ids, profile descriptions.
pub(crate) const MUTED: Style = Style::new().effects(Effects::DIMMED);
/// Tally bars.
pub(crate) const BAR: Style = fg(AnsiColor::Cyan);

/// Critical stands out, low fades.
pub(crate) const fn priority(priority: Priority) -> Style {
    match priority {
        Priority::Critical => fg(AnsiColor::Red).effects(Effects::BOLD),
        Priority::High => fg(AnsiColor::Yellow),
        Priority::Medium => Style::new(),
        Priority::Low => MUTED,
    }
}

/// Read-only methods in green, mutating ones in yellow, DELETE in red.
pub(crate) const fn method(method: HttpMethod) -> Style {
    match method {
        HttpMethod::Get | HttpMethod::Head | HttpMethod::Options => fg(AnsiColor::Green),
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => fg(AnsiColor::Yellow),
        HttpMethod::Delete => fg(AnsiColor::Red),
    }
}

pub(crate) fn clap_styles() -> clap::builder::Styles {
    let heading = SUCCESS.effects(Effects::BOLD);
    clap::builder::Styles::styled()
        .header(heading)
        .usage(heading)
        .literal(BAR)
        .placeholder(BAR)
        .error(ERROR.effects(Effects::BOLD))
        .valid(SUCCESS)
        .invalid(WARNING)
}
