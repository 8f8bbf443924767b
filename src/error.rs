//! Error types for divchain.

use nix::errno::Errno;
use thiserror::Error;

/// Main error type for divchain.
#[derive(Error, Debug)]
pub enum DivError {
    #[error("Failed to create shared memory '{name}': {source}")]
    ShmCreate { name: String, source: Errno },

    #[error("Failed to open shared memory '{name}': {source}")]
    ShmOpen { name: String, source: Errno },

    #[error("Failed to resize shared memory to {size} bytes: {source}")]
    ShmResize { size: usize, source: Errno },

    #[error("Failed to remove shared memory '{name}': {source}")]
    ShmUnlink { name: String, source: Errno },

    #[error("Failed to map shared memory: {0}")]
    ShmMap(Errno),

    #[error("Failed to create semaphore '{name}': {source}")]
    SemCreate { name: String, source: Errno },

    #[error("Failed to open semaphore '{name}': {source}")]
    SemOpen { name: String, source: Errno },

    #[error("Semaphore {op} failed: {source}")]
    Semaphore { op: &'static str, source: Errno },

    #[error("Invalid resource name '{0}': names must start with '/' and contain no NUL bytes")]
    InvalidName(String),

    #[error("Frame of {len} bytes exceeds channel capacity of {capacity} bytes")]
    FrameTooLarge { len: usize, capacity: usize },

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Result log error for '{path}': {source}")]
    ResultLog {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for divchain operations.
pub type Result<T> = std::result::Result<T, DivError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_shm_create_error_message() {
        let err = DivError::ShmCreate {
            name: "/div_shm_42".to_string(),
            source: Errno::EEXIST,
        };
        let msg = err.to_string();
        assert!(msg.contains("/div_shm_42"));
        assert!(msg.contains("create shared memory"));
    }

    #[test]
    fn test_semaphore_error_names_operation() {
        let err = DivError::Semaphore {
            op: "wait",
            source: Errno::EINVAL,
        };
        assert!(err.to_string().contains("wait"));
    }

    #[test]
    fn test_frame_too_large_message() {
        let err = DivError::FrameTooLarge {
            len: 5000,
            capacity: 4092,
        };
        let msg = err.to_string();
        assert!(msg.contains("5000"));
        assert!(msg.contains("4092"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: DivError = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_log_error_includes_path() {
        let err = DivError::ResultLog {
            path: "/tmp/out.txt".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out.txt"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_err() -> Result<()> {
            Err(DivError::Worker("gone".into()))
        }
        assert!(returns_err().is_err());
    }
}
