//! Worker subprocess spawning.
//!
//! The worker is this same binary re-executed with the hidden `worker`
//! subcommand, so no second executable has to be located.

use super::proc::Proc;
use crate::channel::ChannelNames;
use crate::error::{DivError, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Global flags forwarded to the worker so both processes log alike.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbosity {
    pub verbose: u8,
    pub quiet: bool,
    pub no_color: bool,
}

impl Verbosity {
    fn args(self) -> Vec<String> {
        let mut args = Vec::new();
        if self.quiet {
            args.push("--quiet".to_string());
        } else if self.verbose > 0 {
            args.push(format!("-{}", "v".repeat(self.verbose as usize)));
        }
        if self.no_color {
            args.push("--no-color".to_string());
        }
        args
    }
}

/// Everything the worker needs on its command line.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub output: PathBuf,
    pub names: ChannelNames,
    pub poll_interval: Duration,
    pub verbosity: Verbosity,
}

impl SpawnConfig {
    /// Arguments after the executable path. The output path is passed
    /// through byte for byte.
    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self
            .verbosity
            .args()
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push("worker".into());
        args.push(self.output.as_os_str().to_owned());
        args.push(self.names.shm.as_str().into());
        args.push(self.names.sem.as_str().into());
        args.push("--poll-interval-ms".into());
        args.push(self.poll_interval.as_millis().to_string().into());
        args
    }
}

/// Spawn the worker subprocess.
///
/// The worker inherits stdout/stderr so its diagnostics reach the user, but
/// not stdin, which belongs to the controller's prompt.
pub fn spawn_worker(config: &SpawnConfig) -> Result<Proc> {
    let exe_path = std::env::current_exe()
        .map_err(|e| DivError::Worker(format!("Failed to get current executable: {}", e)))?;

    let child = Command::new(&exe_path)
        .args(config.args())
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| DivError::Worker(format!("Failed to spawn worker: {}", e)))?;

    let proc = Proc::from_child(child);
    tracing::info!(pid = proc.pid().as_raw(), exe = %exe_path.display(), "Worker spawned");
    Ok(proc)
}
