//! User input handling for the controller prompt.

use crate::channel::PAYLOAD_CAPACITY;
use std::ffi::OsStr;
use std::io::{self, BufRead, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// One line read from the user, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    /// End of input.
    Eof,
    /// Only whitespace.
    Blank,
    /// Contains a byte outside digits, signs and whitespace.
    Invalid,
    /// Longer than one frame can carry.
    TooLong(usize),
    /// Forwardable to the worker as-is.
    Request(Vec<u8>),
}

/// Whitespace a request may contain. Narrower than `is_ascii_whitespace`,
/// which also admits form feed.
fn is_blank(b: &u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Bytes allowed in a request line.
fn is_allowed(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'+' | b'-') || is_blank(&b)
}

/// Classify raw line bytes (including any trailing newline).
///
/// Any invalid byte rejects the whole line; the controller ends the session
/// on it instead of re-prompting.
pub fn classify(line: &[u8]) -> InputLine {
    if line.is_empty() {
        return InputLine::Eof;
    }
    if line.iter().all(is_blank) {
        return InputLine::Blank;
    }
    if !line.iter().copied().all(is_allowed) {
        return InputLine::Invalid;
    }
    if line.len() > PAYLOAD_CAPACITY {
        return InputLine::TooLong(line.len());
    }
    InputLine::Request(line.to_vec())
}

/// Read one raw line, newline included. An empty vector means end of input.
pub fn read_line<R: BufRead>(input: &mut R) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    input.read_until(b'\n', &mut line)?;
    Ok(line)
}

/// Ask for the result log path on `output` and read it from `input`.
pub fn prompt_output_path<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<PathBuf> {
    write!(output, "Enter output file name: ")?;
    output.flush()?;

    let mut line = read_line(input)?;
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
    if line.iter().all(is_blank) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "failed to read output file name",
        ));
    }
    Ok(PathBuf::from(OsStr::from_bytes(&line)))
}
