//! Process handle for the worker subprocess.
//!
//! The worker talks to us only through the shared channel, so the handle
//! just tracks the pid and its exit status.

use super::signals::{TerminationReason, analyze_wait_status};
use crate::error::{DivError, Result};
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::time::Duration;

/// Liveness and reaping of the peer process, as the session sees it.
pub trait WorkerProcess {
    /// Non-blocking check whether the worker has exited.
    fn has_exited(&mut self) -> bool;

    /// Block until the worker has exited and report why.
    fn wait(&mut self) -> Result<TerminationReason>;
}

/// Handle to the worker subprocess.
pub struct Proc {
    /// Process ID
    pid: Pid,
    /// Exit reason once the process has been reaped
    reaped: Option<TerminationReason>,
}

impl Proc {
    /// Create from a spawned `std::process::Child`.
    pub fn from_child(child: std::process::Child) -> Self {
        Self {
            pid: Pid::from_raw(child.id() as i32),
            reaped: None,
        }
    }

    /// Get the process ID.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Try to reap the process (non-blocking).
    ///
    /// Returns `None` while it is still running.
    pub fn try_wait(&mut self) -> Result<Option<TerminationReason>> {
        if let Some(reason) = self.reaped {
            return Ok(Some(reason));
        }
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => Ok(None),
            Ok(status) => Ok(Some(self.record(status))),
            Err(e) => Err(DivError::Worker(format!("waitpid failed: {}", e))),
        }
    }

    /// Send SIGTERM to the process.
    pub fn terminate(&self) -> Result<()> {
        if self.reaped.is_some() {
            return Ok(());
        }
        signal::kill(self.pid, Signal::SIGTERM)
            .map_err(|e| DivError::Worker(format!("Failed to send SIGTERM: {}", e)))
    }

    fn record(&mut self, status: WaitStatus) -> TerminationReason {
        let reason = analyze_wait_status(status);
        tracing::debug!(pid = self.pid.as_raw(), %reason, "Worker reaped");
        self.reaped = Some(reason);
        reason
    }
}

impl WorkerProcess for Proc {
    fn has_exited(&mut self) -> bool {
        match self.try_wait() {
            Ok(Some(_)) => true,
            Ok(None) => false,
            // Not our child any more (or never was): nothing left to wait for.
            Err(_) => true,
        }
    }

    fn wait(&mut self) -> Result<TerminationReason> {
        if let Some(reason) = self.reaped {
            return Ok(reason);
        }
        loop {
            match waitpid(self.pid, None) {
                Ok(status) => return Ok(self.record(status)),
                Err(nix::errno::Errno::EINTR) => continue, // Retry on interrupt
                Err(e) => return Err(DivError::Worker(format!("waitpid failed: {}", e))),
            }
        }
    }
}

impl Drop for Proc {
    fn drop(&mut self) {
        if self.reaped.is_none() {
            // Try graceful termination
            let _ = self.terminate();
            std::thread::sleep(Duration::from_millis(10));

            // Check if it exited
            if let Ok(Some(_)) = self.try_wait() {
                return;
            }

            // Force kill
            let _ = signal::kill(self.pid, Signal::SIGKILL);
            let _ = waitpid(self.pid, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn test_proc_reports_exit_code() {
        let child = Command::new("sh")
            .args(["-c", "exit 3"])
            .stdin(Stdio::null())
            .spawn()
            .expect("Failed to spawn sh");

        let mut proc = Proc::from_child(child);
        assert_eq!(proc.wait().unwrap(), TerminationReason::Exited(3));
        assert!(proc.has_exited());
        // Cached after reaping.
        assert_eq!(proc.wait().unwrap(), TerminationReason::Exited(3));
    }

    #[test]
    fn test_proc_terminate() {
        let child = Command::new("sleep")
            .arg("60")
            .stdin(Stdio::null())
            .spawn()
            .expect("Failed to spawn sleep");

        let mut proc = Proc::from_child(child);
        assert!(!proc.has_exited());

        proc.terminate().expect("Failed to terminate");
        assert_eq!(
            proc.wait().unwrap(),
            TerminationReason::Signaled(Signal::SIGTERM)
        );
    }
}
