//! Controller side: owns the shared channel, runs the worker subprocess and
//! relays user input to it.
//!
//! # Lifecycle
//!
//! 1. Resolve the result log path (flag, env, or prompt).
//! 2. Create the channel under pid-qualified names.
//! 3. Spawn the worker, let it settle, then run the interactive [`Session`].
//! 4. Always: write the terminate sentinel, reap the worker, destroy the
//!    channel. This runs even when the session itself failed.

mod input;
mod proc;
mod session;
mod signals;
mod spawn;

pub use spawn::Verbosity;

use crate::channel::{ChannelNames, SharedChannel};
use crate::paths::expand_tilde;
use anyhow::{Context, Result};
use proc::WorkerProcess;
use session::{Session, SessionEnd};
use signals::TerminationReason;
use spawn::{SpawnConfig, spawn_worker};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for one controller run.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Result log path; prompted for when absent.
    pub output: Option<PathBuf>,
    pub poll_interval: Duration,
    /// Delay after spawning before the first prompt.
    pub settle: Duration,
    pub verbosity: Verbosity,
}

/// How a controller run ended, and how the worker went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub end: SessionEnd,
    pub worker: TerminationReason,
}

impl SessionOutcome {
    /// Process exit code for the controller.
    pub fn exit_code(&self) -> i32 {
        if self.end != SessionEnd::WorkerShutdown && self.worker.is_success() {
            0
        } else {
            1
        }
    }
}

/// Run the controller against the process's own stdin/stdout.
pub fn run_controller(config: &ControllerConfig) -> Result<SessionOutcome> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();

    let output = match &config.output {
        Some(path) => path.clone(),
        None => input::prompt_output_path(&mut input, &mut stdout)
            .context("Failed to read output file name")?,
    };
    let output = expand_tilde(output);

    let names = ChannelNames::for_pid(std::process::id());
    let mut channel = SharedChannel::create(&names)
        .context("Failed to create shared channel")?
        .with_poll_interval(config.poll_interval);

    let spawn_config = SpawnConfig {
        output,
        names,
        poll_interval: config.poll_interval,
        verbosity: config.verbosity,
    };
    let mut worker = match spawn_worker(&spawn_config) {
        Ok(worker) => worker,
        Err(e) => {
            if let Err(cleanup) = channel.destroy() {
                tracing::warn!(error = %cleanup, "Failed to remove shared channel");
            }
            return Err(e).context("Failed to start worker");
        }
    };

    writeln!(stdout, "Worker process started with PID: {}", worker.pid())?;
    writeln!(stdout, "Enter numbers separated by spaces (e.g. 100 2 5)")?;
    std::thread::sleep(config.settle);

    let end = Session::new(&mut channel, &mut worker, &mut input, &mut stdout).run();
    let reason = shutdown(channel, &mut worker);

    let end = end.context("Session failed")?;
    let status = reason?;
    writeln!(stdout, "Controller finished")?;

    tracing::info!(?end, worker = %status, "Controller done");
    Ok(SessionOutcome {
        end,
        worker: status,
    })
}

/// Stop the worker, reap it and remove the channel.
///
/// Cleanup continues past individual failures; the first error wins.
fn shutdown<P: WorkerProcess>(
    mut channel: SharedChannel,
    worker: &mut P,
) -> Result<TerminationReason> {
    let signalled = channel.signal_terminate();
    if let Err(e) = &signalled {
        tracing::error!(error = %e, "Failed to signal worker termination");
    }

    let reason = worker.wait();
    match &reason {
        Ok(reason) if !reason.is_success() => {
            tracing::warn!(%reason, "Worker did not exit cleanly");
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "Failed to wait for worker"),
    }

    let destroyed = channel.destroy();
    if let Err(e) = &destroyed {
        tracing::error!(error = %e, "Failed to remove shared channel");
    }

    signalled.context("Failed to signal worker termination")?;
    let reason = reason.context("Failed to wait for worker")?;
    destroyed.context("Failed to remove shared channel")?;
    Ok(reason)
}
