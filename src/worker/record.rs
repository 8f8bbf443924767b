//! Append-only result log written by the worker.

use super::compute::format_value;
use crate::error::{DivError, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// First line of every result log.
pub const HEADER: &str = "==Results of division==\n";

/// Suffix recorded after an expression that hit a zero divisor.
pub const DIVISION_BY_ZERO_SUFFIX: &str = " = error: division by zero\n";

/// The worker's output file.
///
/// Truncated once on open, then only appended to. Records are written
/// unbuffered so they survive the worker exiting right after.
pub struct ResultLog {
    path: PathBuf,
    file: File,
}

impl ResultLog {
    /// Create or truncate `path` (mode 0600) and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|source| DivError::ResultLog {
                path: path.display().to_string(),
                source,
            })?;
        let mut log = Self {
            path: path.to_path_buf(),
            file,
        };
        log.append(HEADER)?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a completed computation.
    pub fn record_quotient(&mut self, expression: &str, value: f64) -> Result<()> {
        self.append(&format!("{} = {}\n", expression, format_value(value)))
    }

    /// Record a computation aborted by a zero divisor, and flush to disk.
    pub fn record_division_by_zero(&mut self, expression: &str) -> Result<()> {
        self.append(&format!("{}{}", expression, DIVISION_BY_ZERO_SUFFIX))?;
        self.file.sync_data().map_err(|source| self.error(source))
    }

    fn append(&mut self, text: &str) -> Result<()> {
        self.file
            .write_all(text.as_bytes())
            .map_err(|source| self.error(source))
    }

    fn error(&self, source: std::io::Error) -> DivError {
        DivError::ResultLog {
            path: self.path.display().to_string(),
            source,
        }
    }
}
