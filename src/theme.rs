use std::io::IsTerminal;

use anstyle::{AnsiColor, Color, RgbColor, Style};

pub const ACCENT: Style = Style::new().fg_color(Some(Color::Rgb(RgbColor(207, 106, 76))));
pub const SUCCESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
pub const FAILURE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));
pub const WARNING: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
pub const ENVIRONMENT: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta)));
pub const COMMAND: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue)));
pub const HIGHLIGHT: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
pub const HEADING: Style = Style::new().bold();
pub const DIM: Style = Style::new().dimmed();

/// Decides whether styles are rendered; escape codes are only emitted for terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    color: bool,
}

impl Palette {
    /// Palette for text written to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            color: std::io::stdout().is_terminal(),
        }
    }

    /// Palette for text written to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            color: std::io::stderr().is_terminal(),
        }
    }

    /// Palette that never emits escape codes.
    #[must_use]
    pub const fn plain() -> Self {
        Self { color: false }
    }

    #[must_use]
    pub fn paint(&self, style: Style, text: &str) -> String {
        if self.color {
            format!("{style}{text}{style:#}")
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_palette_leaves_text_alone() {
        assert_eq!(Palette::plain().paint(FAILURE, "Aborting."), "Aborting.");
    }

    #[test]
    fn test_color_palette_wraps_text() {
        let painted = Palette { color: true }.paint(SUCCESS, "local");
        assert!(painted.starts_with("\x1b["));
        assert!(painted.contains("local"));
        assert!(painted.ends_with("\x1b[0m"));
    }
}
