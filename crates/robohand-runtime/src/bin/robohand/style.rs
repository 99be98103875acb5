//! Terminal colouring for operator output.
//!
//! Colour is used only when the target stream is a terminal and `NO_COLOR`
//! is unset. Errors are checked against stderr, everything else stdout.

use std::fmt::Display;
use std::io::IsTerminal;

use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Good,
    Caution,
    Failure,
    Detail,
}

fn colour_enabled(tone: Tone) -> bool {
    if std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty()) {
        return false;
    }
    match tone {
        Tone::Failure => std::io::stderr().is_terminal(),
        Tone::Good | Tone::Caution | Tone::Detail => std::io::stdout().is_terminal(),
    }
}

fn paint(tone: Tone, text: &str, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }
    match tone {
        Tone::Good => text.green().to_string(),
        Tone::Caution => text.yellow().to_string(),
        Tone::Failure => text.red().bold().to_string(),
        Tone::Detail => text.cyan().to_string(),
    }
}

fn styled(tone: Tone, text: impl AsRef<str>) -> String {
    paint(tone, text.as_ref(), colour_enabled(tone))
}

pub fn success(text: impl AsRef<str>) -> String {
    styled(Tone::Good, text)
}

pub fn warning(text: impl AsRef<str>) -> String {
    styled(Tone::Caution, text)
}

/// Styled for stderr.
pub fn error(text: impl AsRef<str>) -> String {
    styled(Tone::Failure, text)
}

pub fn accent(text: impl AsRef<str>) -> String {
    styled(Tone::Detail, text)
}

/// `[index] text` line of a preset listing.
pub fn preset_line(index: usize, text: &str) -> String {
    format!("{} {text}", accent(format!("[{index}]")))
}

/// Indicator line for a moved control.
pub fn drive_value(drive: impl Display, value: i32) -> String {
    accent(format!("{drive}: {value}"))
}
