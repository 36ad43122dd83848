//! Colour and width helpers for command output.

use owo_colors::{OwoColorize, Style};

/// Whether the terminal is too narrow for tabular layouts (under 60 columns).
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(width, _)| width.0 < 60)
}

/// Semantic styles for command output.
///
/// Each method renders the text with the matching style when stdout is a
/// colour-capable terminal, and verbatim otherwise.
pub trait Colorize: AsRef<str> {
    /// Completed operations.
    fn success(&self) -> String {
        paint(self.as_ref(), Style::new().green())
    }

    /// Problems that need attention.
    fn warning(&self) -> String {
        paint(self.as_ref(), Style::new().yellow())
    }

    /// Advisory notes.
    fn info(&self) -> String {
        paint(self.as_ref(), Style::new().cyan())
    }

    /// Secondary detail.
    fn dim(&self) -> String {
        paint(self.as_ref(), Style::new().dimmed())
    }
}

impl<T: AsRef<str> + ?Sized> Colorize for T {}

fn paint(text: &str, style: Style) -> String {
    if supports_color::on(supports_color::Stream::Stdout).is_some() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}
