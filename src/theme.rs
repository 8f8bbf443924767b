//! Terminal colours for user-facing error and status text.
//!
//! Colours can be disabled globally via the `--no-color` flag or the
//! `NO_COLOR` environment variable, in which case every style below returns
//! the text unchanged. Tracing output follows the same switch.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global color enable flag (respects NO_COLOR and --no-color).
static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Disable all colors globally. Call early in `main`.
pub fn disable_colors() {
    COLORS_ENABLED.store(false, Ordering::Relaxed);
    owo_colors::set_override(false);
}

/// Check if colors are currently enabled.
pub fn colors_enabled() -> bool {
    COLORS_ENABLED.load(Ordering::Relaxed)
}

/// Semantic styles on top of owo_colors.
pub trait Themed: owo_colors::OwoColorize + std::fmt::Display {
    /// Error headers (red + bold).
    fn error_style(&self) -> String {
        if colors_enabled() {
            format!(
                "{}",
                owo_colors::OwoColorize::bold(&owo_colors::OwoColorize::red(self))
            )
        } else {
            self.to_string()
        }
    }

    /// Secondary error lines (yellow).
    fn warning(&self) -> String {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::yellow(self))
        } else {
            self.to_string()
        }
    }
}

impl<T: std::fmt::Display> Themed for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_colors_leave_text_plain() {
        disable_colors();
        assert!(!colors_enabled());
        assert_eq!("error".error_style(), "error");
        assert_eq!("caused by".warning(), "caused by");
    }
}
