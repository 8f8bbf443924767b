//! Response messages the worker writes back into the channel.
//!
//! Responses are plain newline-terminated text so the controller can forward
//! them to the user verbatim.

use super::compute::format_value;

/// Substring announcing that the worker is shutting both processes down.
pub const TERMINATING_MARKER: &str = "Processes terminating";

/// Response from worker to controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Quotient computed and logged.
    Result(f64),
    /// The request held fewer than two numbers.
    TooFewNumbers,
    /// A zero divisor was found; the session is ending.
    DivisionByZero,
}

impl Response {
    /// Render as channel text (with newline).
    pub fn to_text(&self) -> String {
        match self {
            Self::Result(value) => format!("result: {} (written to file)\n", format_value(*value)),
            Self::TooFewNumbers => "error: need at least 2 numbers\n".to_string(),
            Self::DivisionByZero => {
                format!("error: division by zero. {}\n", TERMINATING_MARKER)
            }
        }
    }
}

/// Whether a response announces worker-initiated shutdown.
pub fn is_terminating(text: &str) -> bool {
    text.contains(TERMINATING_MARKER)
}
